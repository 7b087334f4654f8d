//! 客户端错误类型
//!
//! TransportError 来自传输层；ActionError 是会话级致命错误，由 ActionClient::run 返回给调用方。
//! 其余失败（拒绝、取消未生效、非成功终态）只记录日志并驱动会话结束，不作为错误上抛。

use thiserror::Error;

use crate::core::GoalStatus;
use crate::transport::GoalId;

/// 传输层失败
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Action server unreachable: {0}")]
    Unreachable(String),

    #[error("Unknown goal: {0}")]
    UnknownGoal(GoalId),

    #[error("Transport closed")]
    Closed,

    #[error("Transport error: {0}")]
    Other(String),
}

/// 会话级致命错误
#[derive(Error, Debug)]
pub enum ActionError {
    #[error("Failed to send goal: {0}")]
    SendFailed(#[source] TransportError),
}

/// GoalHandle 上的非法状态转换
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GoalStateError {
    #[error("Goal {goal_id}: invalid status transition {from} -> {to}")]
    InvalidTransition {
        goal_id: GoalId,
        from: GoalStatus,
        to: GoalStatus,
    },
}
