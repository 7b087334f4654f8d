//! 周期性随机取消
//!
//! 调度器持有一个周期计时器。每次触发先抽签：抽到高位本轮不取消；抽到低位且存在活跃目标时发出取消请求，
//! 并立即解除计时器，无论取消最终是否生效都不会再次触发。没有目标可取消时计时器保持启用。

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};

use crate::action::DecisionSource;
use crate::config::CancelSection;
use crate::core::{GoalHandle, Session, SessionEnd, TransportError};
use crate::transport::{ActionTransport, CancelResponse, GoalId};

/// 取消请求回复的 future
pub type CancelPromise = JoinHandle<Result<CancelResponse, TransportError>>;

/// 抽签规则：在 0..=roll_max 上抽取，>= keep_threshold 时本轮不取消
#[derive(Debug, Clone, Copy)]
pub struct CancelPolicy {
    pub roll_max: u32,
    pub keep_threshold: u32,
}

impl From<&CancelSection> for CancelPolicy {
    fn from(cfg: &CancelSection) -> Self {
        Self {
            roll_max: cfg.roll_max,
            keep_threshold: cfg.keep_threshold,
        }
    }
}

/// 单次触发的结论
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickDecision {
    /// 抽到高位，保持启用
    Keep,
    /// 决定取消但没有活跃目标，保持启用
    NothingToCancel,
    /// 对该目标发出取消，计时器已解除
    Cancel(GoalId),
}

pub struct CancellationScheduler {
    period: Duration,
    policy: CancelPolicy,
    decisions: Box<dyn DecisionSource>,
    timer: Option<Interval>,
    armings: usize,
    ticks: usize,
    attempted: bool,
}

impl CancellationScheduler {
    pub fn new(period: Duration, policy: CancelPolicy, decisions: Box<dyn DecisionSource>) -> Self {
        Self {
            period,
            policy,
            decisions,
            timer: None,
            armings: 0,
            ticks: 0,
            attempted: false,
        }
    }

    /// 启动计时器；已启用或已尝试过取消时不做任何事，返回 false
    pub fn arm(&mut self) -> bool {
        if self.timer.is_some() || self.attempted {
            return false;
        }
        let start = tokio::time::Instant::now() + self.period;
        let mut timer = tokio::time::interval_at(start, self.period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.timer = Some(timer);
        self.armings += 1;
        tracing::debug!(period_ms = self.period.as_millis() as u64, "Cancellation timer armed");
        true
    }

    pub fn disarm(&mut self) {
        if self.timer.take().is_some() {
            tracing::debug!("Cancellation timer disarmed");
        }
    }

    pub fn is_armed(&self) -> bool {
        self.timer.is_some()
    }

    /// 等待下一次触发；未启用时永远挂起
    pub async fn tick(&mut self) {
        match self.timer.as_mut() {
            Some(timer) => {
                timer.tick().await;
            }
            None => std::future::pending::<()>().await,
        }
    }

    /// 处理一次触发
    pub fn on_tick(&mut self, handle: Option<&GoalHandle>) -> TickDecision {
        self.ticks += 1;
        let roll = self.decisions.draw(self.policy.roll_max);
        if roll >= self.policy.keep_threshold {
            tracing::info!(roll, "Rolled high, not cancelling");
            return TickDecision::Keep;
        }

        let goal_id = match handle {
            Some(h) if h.is_live() => h.goal_id(),
            Some(h) => {
                tracing::info!(roll, goal_id = %h.goal_id(), "Goal already finished, nothing to cancel");
                return TickDecision::NothingToCancel;
            }
            None => {
                tracing::info!(roll, "No goal handle, nothing to cancel");
                return TickDecision::NothingToCancel;
            }
        };

        tracing::info!(roll, %goal_id, "Rolled low, cancelling goal");
        self.attempted = true;
        self.disarm();
        TickDecision::Cancel(goal_id)
    }

    /// 非阻塞发出取消请求
    pub fn request_cancel(transport: Arc<dyn ActionTransport>, goal_id: GoalId) -> CancelPromise {
        tokio::spawn(async move { transport.cancel_goal(goal_id).await })
    }

    pub fn armings(&self) -> usize {
        self.armings
    }

    pub fn ticks(&self) -> usize {
        self.ticks
    }

    pub fn attempted(&self) -> bool {
        self.attempted
    }
}

/// 取消回复处理：记录是否生效并结束会话；会话已结束时什么都不做
pub fn on_cancel_response(
    session: &Session,
    response: Result<CancelResponse, TransportError>,
) -> bool {
    if session.is_ended() {
        tracing::debug!("Session already ended, ignoring cancel response");
        return false;
    }

    let honored = match response {
        Ok(resp) if resp.honored() => {
            tracing::info!(goals = resp.goals_canceling.len(), "Goal cancelled");
            true
        }
        Ok(_) => {
            tracing::warn!("Cancel failed: request was not honored");
            false
        }
        Err(e) => {
            tracing::warn!("Cancel failed: {}", e);
            false
        }
    };

    session.end(SessionEnd::CancelCompleted { honored });
    honored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ScriptedDecisions;
    use chrono::Utc;

    fn scheduler(decisions: ScriptedDecisions) -> CancellationScheduler {
        CancellationScheduler::new(
            Duration::from_millis(10),
            CancelPolicy {
                roll_max: 10,
                keep_threshold: 5,
            },
            Box::new(decisions),
        )
    }

    #[tokio::test]
    async fn test_arm_is_idempotent() {
        let mut s = scheduler(ScriptedDecisions::never_cancel());
        assert!(s.arm());
        assert!(!s.arm());
        assert_eq!(s.armings(), 1);
        assert!(s.is_armed());
    }

    #[tokio::test]
    async fn test_high_roll_keeps_armed() {
        let mut s = scheduler(ScriptedDecisions::new([5, 10], 10));
        s.arm();
        let h = GoalHandle::accepted(GoalId::new(), Utc::now());
        assert_eq!(s.on_tick(Some(&h)), TickDecision::Keep);
        assert_eq!(s.on_tick(Some(&h)), TickDecision::Keep);
        assert!(s.is_armed());
        assert_eq!(s.ticks(), 2);
    }

    #[tokio::test]
    async fn test_no_handle_keeps_armed() {
        let mut s = scheduler(ScriptedDecisions::always_cancel());
        s.arm();
        assert_eq!(s.on_tick(None), TickDecision::NothingToCancel);
        assert!(s.is_armed());
        assert!(!s.attempted());
    }

    #[tokio::test]
    async fn test_finished_goal_is_not_cancelled() {
        let mut s = scheduler(ScriptedDecisions::always_cancel());
        s.arm();
        let mut h = GoalHandle::accepted(GoalId::new(), Utc::now());
        h.transition(crate::core::GoalStatus::Succeeded).unwrap();
        assert_eq!(s.on_tick(Some(&h)), TickDecision::NothingToCancel);
        assert!(s.is_armed());
        assert!(!s.attempted());
    }

    #[tokio::test]
    async fn test_cancel_disarms_and_cannot_rearm() {
        let mut s = scheduler(ScriptedDecisions::new([4], 0));
        s.arm();
        let h = GoalHandle::accepted(GoalId::new(), Utc::now());
        assert_eq!(s.on_tick(Some(&h)), TickDecision::Cancel(h.goal_id()));
        assert!(!s.is_armed());
        assert!(!s.arm());
        assert_eq!(s.armings(), 1);
    }

    #[tokio::test]
    async fn test_tick_fires_after_period() {
        let mut s = scheduler(ScriptedDecisions::never_cancel());
        s.arm();
        let start = tokio::time::Instant::now();
        s.tick().await;
        assert!(start.elapsed() >= Duration::from_millis(10));
    }

    #[test]
    fn test_cancel_response_ends_session() {
        let session = Session::new();
        let id = GoalId::new();
        assert!(on_cancel_response(
            &session,
            Ok(CancelResponse {
                goals_canceling: vec![id]
            })
        ));
        assert_eq!(
            session.end_reason(),
            Some(SessionEnd::CancelCompleted { honored: true })
        );
    }

    #[test]
    fn test_unhonored_and_failed_cancel_end_session() {
        let session = Session::new();
        assert!(!on_cancel_response(&session, Ok(CancelResponse::default())));
        assert_eq!(
            session.end_reason(),
            Some(SessionEnd::CancelCompleted { honored: false })
        );

        let session = Session::new();
        assert!(!on_cancel_response(&session, Err(TransportError::Closed)));
        assert_eq!(
            session.end_reason(),
            Some(SessionEnd::CancelCompleted { honored: false })
        );
    }

    #[test]
    fn test_cancel_response_after_end_is_noop() {
        let session = Session::new();
        session.end(SessionEnd::Resolved {
            status: crate::core::GoalStatus::Succeeded,
        });
        on_cancel_response(
            &session,
            Ok(CancelResponse {
                goals_canceling: vec![GoalId::new()],
            }),
        );
        assert!(matches!(session.end_reason(), Some(SessionEnd::Resolved { .. })));
    }
}
