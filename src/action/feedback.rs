//! 反馈转发：只记录日志，不改变任何生命周期状态

use crate::msgs::GotoWaypointFeedback;
use crate::transport::GoalId;

#[derive(Debug, Default)]
pub struct FeedbackSink {
    /// 按到达顺序记录的反馈文本
    messages: Vec<String>,
}

impl FeedbackSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// 可在任意时刻调用任意次，包括 GoalHandle 尚不存在或已结束时
    pub fn on_feedback(&mut self, goal_id: GoalId, feedback: &GotoWaypointFeedback) {
        match feedback.distance_remaining {
            Some(d) => tracing::info!(
                %goal_id,
                "Got feedback from server: {} ({:.1} m remaining)",
                feedback.feedback_message,
                d
            ),
            None => tracing::info!(%goal_id, "Got feedback from server: {}", feedback.feedback_message),
        }
        self.messages.push(feedback.feedback_message.clone());
    }

    pub fn relayed(&self) -> usize {
        self.messages.len()
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn into_messages(self) -> Vec<String> {
        self.messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relays_without_goal_handle() {
        let mut sink = FeedbackSink::new();
        let goal_id = GoalId::new();
        for i in 0..3 {
            sink.on_feedback(
                goal_id,
                &GotoWaypointFeedback {
                    feedback_message: format!("step {}", i),
                    distance_remaining: if i == 0 { None } else { Some(10.0) },
                },
            );
        }
        assert_eq!(sink.relayed(), 3);
        assert_eq!(sink.messages(), ["step 0", "step 1", "step 2"]);
    }
}
