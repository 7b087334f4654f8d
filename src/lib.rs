//! Waypoint action client - 单目标远程动作客户端
//!
//! 模块划分：
//! - **action**: 目标生命周期组件（可用性闸门、提交、反馈、随机取消、结果解析）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误、目标状态机、会话生命周期、主控循环
//! - **msgs**: GotoWaypoint 的 Goal / Feedback / Result 载荷
//! - **observability**: 日志初始化
//! - **transport**: 动作传输抽象与进程内模拟执行端

pub mod action;
pub mod config;
pub mod core;
pub mod msgs;
pub mod observability;
pub mod transport;

pub use crate::core::{ActionClient, SessionEnd, SessionReport};
