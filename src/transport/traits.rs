//! 动作传输抽象
//!
//! 所有后端（真实中间件 / 进程内模拟）实现 ActionTransport：就绪探测、发送目标、等待结果、请求取消。
//! 反馈与状态更新通过发送目标时交给传输层的事件通道送回客户端。

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::core::{GoalStatus, TransportError};
use crate::msgs::{GotoWaypointFeedback, GotoWaypointGoal, GotoWaypointResult};

/// 目标 ID（由执行端分配）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GoalId(Uuid);

impl GoalId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for GoalId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for GoalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 执行端对目标的接受/拒绝回复
#[derive(Debug, Clone)]
pub struct GoalResponse {
    pub accepted: bool,
    pub goal_id: GoalId,
    pub stamp: DateTime<Utc>,
}

/// 终态结果：状态 + 载荷
#[derive(Debug, Clone)]
pub struct GoalResult {
    pub status: GoalStatus,
    pub result: GotoWaypointResult,
}

/// 取消请求的回复：真正进入取消流程的目标集合（可能为空）
#[derive(Debug, Clone, Default)]
pub struct CancelResponse {
    pub goals_canceling: Vec<GoalId>,
}

impl CancelResponse {
    pub fn honored(&self) -> bool {
        !self.goals_canceling.is_empty()
    }
}

/// 传输层推送给客户端的事件
#[derive(Debug, Clone)]
pub enum ActionEvent {
    Feedback {
        goal_id: GoalId,
        feedback: GotoWaypointFeedback,
    },
    Status {
        goal_id: GoalId,
        status: GoalStatus,
    },
}

pub type EventSender = mpsc::UnboundedSender<ActionEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<ActionEvent>;

/// 动作传输 trait
#[async_trait]
pub trait ActionTransport: Send + Sync {
    /// 动作端点名称
    fn action_name(&self) -> &str;

    /// 即时探测服务端是否可用（超时由调用方控制）
    async fn is_ready(&self) -> bool;

    /// 发送目标；events 在接受回复之前即已生效
    async fn send_goal(
        &self,
        goal: GotoWaypointGoal,
        events: EventSender,
    ) -> Result<GoalResponse, TransportError>;

    /// 等待目标终态；每个目标只会产生一次结果
    async fn get_result(&self, goal_id: GoalId) -> Result<GoalResult, TransportError>;

    /// 请求取消；执行端可以不予理会
    async fn cancel_goal(&self, goal_id: GoalId) -> Result<CancelResponse, TransportError>;
}
