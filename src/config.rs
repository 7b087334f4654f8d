//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `WAYPOINT__*` 覆盖（双下划线表示嵌套，如 `WAYPOINT__CANCEL__PERIOD_MS=500`）。

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::core::GoalStatus;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub client: ClientSection,
    #[serde(default)]
    pub cancel: CancelSection,
    #[serde(default)]
    pub goal: GoalSection,
    #[serde(default)]
    pub simulator: SimulatorSection,
}

/// [client] 段：动作端点、等待服务端、计时器启动时机
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSection {
    #[serde(default = "default_action_name")]
    pub action_name: String,
    /// 等待服务端就绪的超时（秒）
    #[serde(default = "default_server_timeout_secs")]
    pub server_timeout_secs: u64,
    /// 为 true 时忽略超时，一直等待服务端
    #[serde(default)]
    pub wait_forever: bool,
    /// 就绪探测间隔（毫秒）
    #[serde(default = "default_server_poll_ms")]
    pub server_poll_ms: u64,
    /// 发送目标后立即启动取消计时器（不等接受结果）
    #[serde(default)]
    pub arm_cancel_on_send: bool,
}

fn default_action_name() -> String {
    "/goto_waypoint".to_string()
}

fn default_server_timeout_secs() -> u64 {
    30
}

fn default_server_poll_ms() -> u64 {
    100
}

impl Default for ClientSection {
    fn default() -> Self {
        Self {
            action_name: default_action_name(),
            server_timeout_secs: default_server_timeout_secs(),
            wait_forever: false,
            server_poll_ms: default_server_poll_ms(),
            arm_cancel_on_send: false,
        }
    }
}

impl ClientSection {
    /// None 表示无限等待
    pub fn server_timeout(&self) -> Option<Duration> {
        if self.wait_forever {
            None
        } else {
            Some(Duration::from_secs(self.server_timeout_secs))
        }
    }

    pub fn server_poll_interval(&self) -> Duration {
        Duration::from_millis(self.server_poll_ms.max(1))
    }
}

/// [cancel] 段：周期性随机取消
#[derive(Debug, Clone, Deserialize)]
pub struct CancelSection {
    /// 检查周期（毫秒）
    #[serde(default = "default_cancel_period_ms")]
    pub period_ms: u64,
    /// 抽签范围上界（含），抽签区间为 0..=roll_max
    #[serde(default = "default_roll_max")]
    pub roll_max: u32,
    /// 抽签 >= 该值时本轮不取消
    #[serde(default = "default_keep_threshold")]
    pub keep_threshold: u32,
    /// 固定种子，便于复现
    pub seed: Option<u64>,
}

fn default_cancel_period_ms() -> u64 {
    2000
}

fn default_roll_max() -> u32 {
    10
}

fn default_keep_threshold() -> u32 {
    5
}

impl Default for CancelSection {
    fn default() -> Self {
        Self {
            period_ms: default_cancel_period_ms(),
            roll_max: default_roll_max(),
            keep_threshold: default_keep_threshold(),
            seed: None,
        }
    }
}

impl CancelSection {
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms.max(1))
    }
}

/// [goal] 段：要发送的航点
#[derive(Debug, Clone, Deserialize)]
pub struct GoalSection {
    #[serde(default = "default_waypoint_name")]
    pub waypoint_name: String,
    #[serde(default = "default_travel_rpm")]
    pub travel_rpm: f64,
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
    #[serde(default)]
    pub travel_depth: f64,
}

fn default_waypoint_name() -> String {
    "WP-1".to_string()
}

fn default_travel_rpm() -> f64 {
    1000.0
}

impl Default for GoalSection {
    fn default() -> Self {
        Self {
            waypoint_name: default_waypoint_name(),
            travel_rpm: default_travel_rpm(),
            latitude: 0.0,
            longitude: 0.0,
            travel_depth: 0.0,
        }
    }
}

/// [simulator] 段：进程内模拟执行端的行为
#[derive(Debug, Clone, Deserialize)]
pub struct SimulatorSection {
    /// 启动后多久就绪（毫秒）
    #[serde(default = "default_ready_after_ms")]
    pub ready_after_ms: u64,
    /// 永不就绪（模拟端点不可达）
    #[serde(default)]
    pub never_ready: bool,
    #[serde(default = "default_true")]
    pub accept: bool,
    /// 接受/拒绝回复的延迟（毫秒）；执行在回复之前就已开始
    #[serde(default)]
    pub accept_delay_ms: u64,
    /// 模拟发送失败（传输层错误）
    #[serde(default)]
    pub fail_send: bool,
    #[serde(default = "default_feedback_steps")]
    pub feedback_steps: u32,
    #[serde(default = "default_step_interval_ms")]
    pub step_interval_ms: u64,
    /// 自然结束时的终态：succeeded / aborted
    #[serde(default = "default_final_status", deserialize_with = "deserialize_final_status")]
    pub final_status: GoalStatus,
    #[serde(default = "default_true")]
    pub honor_cancel: bool,
}

fn default_ready_after_ms() -> u64 {
    500
}

fn default_true() -> bool {
    true
}

fn default_feedback_steps() -> u32 {
    5
}

fn default_step_interval_ms() -> u64 {
    1000
}

fn default_final_status() -> GoalStatus {
    GoalStatus::Succeeded
}

fn deserialize_final_status<'de, D>(deserializer: D) -> Result<GoalStatus, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    match raw.to_lowercase().as_str() {
        "succeeded" => Ok(GoalStatus::Succeeded),
        "aborted" => Ok(GoalStatus::Aborted),
        other => Err(serde::de::Error::custom(format!(
            "final_status must be succeeded or aborted, got {}",
            other
        ))),
    }
}

impl Default for SimulatorSection {
    fn default() -> Self {
        Self {
            ready_after_ms: default_ready_after_ms(),
            never_ready: false,
            accept: true,
            accept_delay_ms: 0,
            fail_send: false,
            feedback_steps: default_feedback_steps(),
            step_interval_ms: default_step_interval_ms(),
            final_status: default_final_status(),
            honor_cancel: true,
        }
    }
}

/// 环境变量前缀：`WAYPOINT__CANCEL__PERIOD_MS=500` 覆盖 [cancel].period_ms
const ENV_PREFIX: &str = "WAYPOINT";

/// 参考配置的查找位置（仓库根目录或其子目录下运行）
const REFERENCE_CONFIG: [&str; 2] = ["config/default", "../config/default"];

/// 加载配置：参考配置 → 场景文件 → 环境变量，后者覆盖前者
///
/// 场景文件通常只改 [simulator] 与 [cancel]，其余键沿用参考配置；找不到场景文件时记录警告并跳过。
pub fn load_config(scenario: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    if let Some(name) = REFERENCE_CONFIG
        .iter()
        .find(|name| Path::new(&format!("{}.toml", name)).exists())
    {
        builder = builder.add_source(config::File::with_name(name));
    }

    if let Some(path) = scenario {
        if path.exists() {
            builder = builder.add_source(config::File::from(path));
        } else {
            tracing::warn!(path = %path.display(), "Scenario file not found, skipping");
        }
    }

    builder
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_reference_values() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.client.server_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(cfg.cancel.period(), Duration::from_secs(2));
        assert_eq!(cfg.cancel.roll_max, 10);
        assert_eq!(cfg.cancel.keep_threshold, 5);
        assert!(!cfg.client.arm_cancel_on_send);
        assert_eq!(cfg.simulator.final_status, GoalStatus::Succeeded);
    }

    #[test]
    fn test_wait_forever_disables_timeout() {
        let section = ClientSection {
            wait_forever: true,
            ..ClientSection::default()
        };
        assert_eq!(section.server_timeout(), None);
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[client]
server_timeout_secs = 5

[cancel]
period_ms = 250
seed = 42

[goal]
waypoint_name = "WP-7"

[simulator]
final_status = "aborted"
honor_cancel = false
"#
        )
        .unwrap();

        let cfg = load_config(Some(path)).unwrap();
        assert_eq!(cfg.client.server_timeout_secs, 5);
        assert_eq!(cfg.cancel.period_ms, 250);
        assert_eq!(cfg.cancel.seed, Some(42));
        assert_eq!(cfg.cancel.roll_max, 10);
        assert_eq!(cfg.goal.waypoint_name, "WP-7");
        assert_eq!(cfg.goal.travel_rpm, 1000.0);
        assert_eq!(cfg.simulator.final_status, GoalStatus::Aborted);
        assert!(!cfg.simulator.honor_cancel);
    }

    #[test]
    fn test_env_overrides_scenario_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scenario.toml");
        std::fs::write(&path, "[simulator]\nstep_interval_ms = 200\nfeedback_steps = 2\n").unwrap();

        std::env::set_var("WAYPOINT__SIMULATOR__STEP_INTERVAL_MS", "42");
        std::env::set_var("WAYPOINT__CLIENT__ACTION_NAME", "/dock");
        let cfg = load_config(Some(path));
        std::env::remove_var("WAYPOINT__SIMULATOR__STEP_INTERVAL_MS");
        std::env::remove_var("WAYPOINT__CLIENT__ACTION_NAME");

        let cfg = cfg.unwrap();
        assert_eq!(cfg.simulator.step_interval_ms, 42);
        assert_eq!(cfg.simulator.feedback_steps, 2);
        assert_eq!(cfg.client.action_name, "/dock");
    }

    #[test]
    fn test_missing_scenario_file_is_skipped() {
        let cfg = load_config(Some(PathBuf::from("does/not/exist.toml"))).unwrap();
        assert_eq!(cfg.goal.waypoint_name, "WP-1");
    }
}
