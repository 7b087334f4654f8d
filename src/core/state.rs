//! 目标状态机：GoalStatus 与 GoalHandle
//!
//! GoalHandle 只在执行端接受目标后创建，由编排循环独占持有；取消调度器与结果解析器只借用它。
//! 状态只能前进：Pending → Executing → (Canceling) → 唯一终态。

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::GoalStateError;
use crate::transport::GoalId;

/// 执行端报告的目标状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    /// 已接受，尚未开始执行
    Pending,
    Executing,
    /// 执行端已接受取消请求，正在停止
    Canceling,
    Succeeded,
    Canceled,
    Aborted,
    /// 执行中被拒绝（接受后由执行端判定无法完成）
    Rejected,
}

impl GoalStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            GoalStatus::Succeeded | GoalStatus::Canceled | GoalStatus::Aborted | GoalStatus::Rejected
        )
    }

    pub fn is_success(self) -> bool {
        self == GoalStatus::Succeeded
    }

    /// 状态推进的先后序；终态之间不可互相转换
    fn rank(self) -> u8 {
        match self {
            GoalStatus::Pending => 0,
            GoalStatus::Executing => 1,
            GoalStatus::Canceling => 2,
            _ => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GoalStatus::Pending => "PENDING",
            GoalStatus::Executing => "EXECUTING",
            GoalStatus::Canceling => "CANCELING",
            GoalStatus::Succeeded => "SUCCEEDED",
            GoalStatus::Canceled => "CANCELED",
            GoalStatus::Aborted => "ABORTED",
            GoalStatus::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for GoalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 已接受目标的客户端句柄
#[derive(Debug, Clone)]
pub struct GoalHandle {
    goal_id: GoalId,
    accepted: bool,
    status: GoalStatus,
    accepted_at: DateTime<Utc>,
}

impl GoalHandle {
    /// 仅在接受响应为正时调用
    pub fn accepted(goal_id: GoalId, accepted_at: DateTime<Utc>) -> Self {
        Self {
            goal_id,
            accepted: true,
            status: GoalStatus::Pending,
            accepted_at,
        }
    }

    pub fn goal_id(&self) -> GoalId {
        self.goal_id
    }

    pub fn is_accepted(&self) -> bool {
        self.accepted
    }

    pub fn status(&self) -> GoalStatus {
        self.status
    }

    pub fn accepted_at(&self) -> DateTime<Utc> {
        self.accepted_at
    }

    /// 目标可能仍在执行端运行
    pub fn is_live(&self) -> bool {
        !self.status.is_terminal()
    }

    /// 应用执行端的状态更新；重复的同一状态视为无变化
    pub fn transition(&mut self, next: GoalStatus) -> Result<bool, GoalStateError> {
        if next == self.status {
            return Ok(false);
        }
        if self.status.is_terminal() || next.rank() < self.status.rank() {
            return Err(GoalStateError::InvalidTransition {
                goal_id: self.goal_id,
                from: self.status,
                to: next,
            });
        }
        tracing::debug!(goal_id = %self.goal_id, from = %self.status, to = %next, "Goal status changed");
        self.status = next;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle() -> GoalHandle {
        GoalHandle::accepted(GoalId::new(), Utc::now())
    }

    #[test]
    fn test_terminal_and_success_predicates() {
        assert!(!GoalStatus::Pending.is_terminal());
        assert!(!GoalStatus::Executing.is_terminal());
        assert!(!GoalStatus::Canceling.is_terminal());
        for s in [GoalStatus::Succeeded, GoalStatus::Canceled, GoalStatus::Aborted, GoalStatus::Rejected] {
            assert!(s.is_terminal());
        }
        assert!(GoalStatus::Succeeded.is_success());
        assert!(!GoalStatus::Canceled.is_success());
        assert!(!GoalStatus::Aborted.is_success());
    }

    #[test]
    fn test_new_handle_is_pending_and_accepted() {
        let h = handle();
        assert!(h.is_accepted());
        assert_eq!(h.status(), GoalStatus::Pending);
        assert!(h.is_live());
    }

    #[test]
    fn test_forward_transitions() {
        let mut h = handle();
        assert!(h.transition(GoalStatus::Executing).unwrap());
        assert!(!h.transition(GoalStatus::Executing).unwrap());
        assert!(h.transition(GoalStatus::Canceling).unwrap());
        assert!(h.transition(GoalStatus::Canceled).unwrap());
        assert!(!h.is_live());
    }

    #[test]
    fn test_pending_may_jump_to_terminal() {
        let mut h = handle();
        assert!(h.transition(GoalStatus::Aborted).unwrap());
        assert_eq!(h.status(), GoalStatus::Aborted);
    }

    #[test]
    fn test_terminal_is_final() {
        let mut h = handle();
        h.transition(GoalStatus::Succeeded).unwrap();
        let err = h.transition(GoalStatus::Canceled).unwrap_err();
        assert!(matches!(err, GoalStateError::InvalidTransition { .. }));
        assert_eq!(h.status(), GoalStatus::Succeeded);
    }

    #[test]
    fn test_no_backward_transition() {
        let mut h = handle();
        h.transition(GoalStatus::Canceling).unwrap();
        assert!(h.transition(GoalStatus::Executing).is_err());
    }
}
