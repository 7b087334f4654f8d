//! waypoint-client - 向执行端发送一个航点目标并跟踪到会话结束
//!
//! 入口：初始化日志、加载配置、启动模拟执行端与动作客户端，会话结束即退出。

use std::sync::Arc;

use anyhow::Context;
use waypoint_action::config::{load_config, AppConfig};
use waypoint_action::msgs::GotoWaypointGoal;
use waypoint_action::transport::SimulatedActionServer;
use waypoint_action::{observability, ActionClient, SessionEnd};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let config_path = std::env::args().nth(1).map(std::path::PathBuf::from);
    let cfg = load_config(config_path).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        AppConfig::default()
    });

    let server = Arc::new(SimulatedActionServer::new(
        cfg.client.action_name.clone(),
        cfg.simulator.clone(),
    ));
    let client = ActionClient::new(server, &cfg);
    client.session().install_signal_handlers();

    let goal = GotoWaypointGoal::from_config(&cfg.goal);
    let report = client.run(goal).await.context("Action session failed")?;

    tracing::info!(
        "Session report: {}",
        serde_json::to_string(&report).unwrap_or_else(|_| format!("{:?}", report))
    );

    if report.end == Some(SessionEnd::ServerUnavailable) {
        anyhow::bail!("action server {} was not available", cfg.client.action_name);
    }
    Ok(())
}
