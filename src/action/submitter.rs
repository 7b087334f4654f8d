//! 目标提交：发送目标、注册反馈通道、解析接受回复
//!
//! 事件通道在发送之前创建并交给传输层，因此接受回复到达之前的反馈也不会丢失。

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};

use crate::core::{GoalHandle, TransportError};
use crate::msgs::GotoWaypointGoal;
use crate::transport::{ActionTransport, EventReceiver, GoalResponse};

/// 接受回复的 future
pub type AcceptancePromise = JoinHandle<Result<GoalResponse, TransportError>>;

/// 接受回复的处理结论
#[derive(Debug)]
pub enum Acceptance {
    Accepted(GoalHandle),
    Rejected,
    Failed(TransportError),
}

pub struct GoalSubmitter {
    transport: Arc<dyn ActionTransport>,
}

impl GoalSubmitter {
    pub fn new(transport: Arc<dyn ActionTransport>) -> Self {
        Self { transport }
    }

    /// 非阻塞发送；返回接受回复的 future 与反馈/状态事件接收端
    pub fn submit(&self, goal: GotoWaypointGoal) -> (AcceptancePromise, EventReceiver) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        tracing::info!("Sending goal: {}", goal.to_log_string());

        let transport = Arc::clone(&self.transport);
        let promise = tokio::spawn(async move { transport.send_goal(goal, events_tx).await });
        (promise, events_rx)
    }

    /// 解析接受回复：接受时创建 GoalHandle（Pending）
    pub fn on_goal_response(
        response: Result<Result<GoalResponse, TransportError>, JoinError>,
    ) -> Acceptance {
        match response {
            Ok(Ok(resp)) if resp.accepted => {
                tracing::info!(goal_id = %resp.goal_id, "Goal accepted");
                Acceptance::Accepted(GoalHandle::accepted(resp.goal_id, resp.stamp))
            }
            Ok(Ok(resp)) => {
                tracing::info!(goal_id = %resp.goal_id, "Goal rejected");
                Acceptance::Rejected
            }
            Ok(Err(e)) => {
                tracing::error!("Sending goal failed: {}", e);
                Acceptance::Failed(e)
            }
            Err(e) => {
                tracing::error!("Send task failed: {}", e);
                Acceptance::Failed(TransportError::Other(e.to_string()))
            }
        }
    }
}
