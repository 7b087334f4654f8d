//! GotoWaypoint 动作的消息载荷：Goal / Feedback / Result
//!
//! 对客户端核心而言这些都是不透明的结构化值，只在日志与会话报告中读取个别字段。

use serde::{Deserialize, Serialize};

use crate::config::GoalSection;

/// 目标航点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub name: String,
    /// 推进器转速
    pub travel_rpm: f64,
    pub latitude: f64,
    pub longitude: f64,
    /// 目标深度（米）
    pub travel_depth: f64,
}

/// 发送给执行端的目标；提交后不可变
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GotoWaypointGoal {
    pub waypoint: Waypoint,
}

impl GotoWaypointGoal {
    pub fn new(waypoint: Waypoint) -> Self {
        Self { waypoint }
    }

    /// 由 [goal] 配置段构造
    pub fn from_config(cfg: &GoalSection) -> Self {
        Self::new(Waypoint {
            name: cfg.waypoint_name.clone(),
            travel_rpm: cfg.travel_rpm,
            latitude: cfg.latitude,
            longitude: cfg.longitude,
            travel_depth: cfg.travel_depth,
        })
    }

    /// 日志用的紧凑 JSON
    pub fn to_log_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{:?}", self))
    }
}

/// 执行中的进度反馈
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GotoWaypointFeedback {
    pub feedback_message: String,
    /// 距目标剩余距离（米），执行端未知时为 None
    pub distance_remaining: Option<f64>,
}

/// 终态结果载荷
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GotoWaypointResult {
    pub reached_waypoint: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_goal_from_default_config() {
        let goal = GotoWaypointGoal::from_config(&GoalSection::default());
        assert_eq!(goal.waypoint.name, "WP-1");
        assert_eq!(goal.waypoint.travel_rpm, 1000.0);
    }

    #[test]
    fn test_goal_log_string_is_json() {
        let goal = GotoWaypointGoal::from_config(&GoalSection::default());
        let s = goal.to_log_string();
        let v: serde_json::Value = serde_json::from_str(&s).unwrap();
        assert_eq!(v["waypoint"]["name"], "WP-1");
    }
}
