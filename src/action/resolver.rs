//! 结果解析：每个目标只解析一次终态，并结束会话
//!
//! 会话已经结束（例如取消回复先到）时，迟到的结果不做任何处理。

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::core::{GoalHandle, GoalStatus, Session, SessionEnd, TransportError};
use crate::msgs::GotoWaypointResult;
use crate::transport::{ActionTransport, GoalId, GoalResult};

/// 终态结果的 future
pub type ResultPromise = JoinHandle<Result<GoalResult, TransportError>>;

pub struct ResultResolver {
    transport: Arc<dyn ActionTransport>,
}

impl ResultResolver {
    pub fn new(transport: Arc<dyn ActionTransport>) -> Self {
        Self { transport }
    }

    /// 非阻塞订阅目标终态
    pub fn wait(&self, goal_id: GoalId) -> ResultPromise {
        let transport = Arc::clone(&self.transport);
        tokio::spawn(async move { transport.get_result(goal_id).await })
    }

    /// 处理终态：更新句柄、记录日志、结束会话；返回被采纳的结果载荷
    pub fn resolve(
        session: &Session,
        handle: &mut GoalHandle,
        outcome: Result<GoalResult, TransportError>,
    ) -> Option<GotoWaypointResult> {
        if session.is_ended() {
            tracing::debug!(goal_id = %handle.goal_id(), "Session already ended, ignoring result");
            return None;
        }

        let (status, result) = match outcome {
            Ok(r) => (r.status, Some(r.result)),
            Err(e) => {
                tracing::warn!(goal_id = %handle.goal_id(), "Waiting for result failed: {}", e);
                (GoalStatus::Aborted, None)
            }
        };

        if let Err(e) = handle.transition(status) {
            tracing::warn!("{}", e);
        }

        match (&result, status.is_success()) {
            (Some(r), true) => tracing::info!("Success: {}", r.reached_waypoint),
            (Some(r), false) => {
                tracing::info!("NOT Success: status={}, result={}", status, r.reached_waypoint)
            }
            (None, _) => tracing::info!("NOT Success: status={}, no result", status),
        }

        session.end(SessionEnd::Resolved { status });
        result
    }
}
