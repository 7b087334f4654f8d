//! 会话生命周期：取消令牌 + 首个结束原因
//!
//! 一个会话对应一个目标的完整生命周期。拒绝、取消完成、结果解析、信号中断都会结束会话；
//! 结束是幂等的：只有第一次调用记录原因，之后的调用不做任何事。

use std::sync::{Arc, OnceLock};

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::core::GoalStatus;

/// 会话结束原因
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SessionEnd {
    /// 等待超时，目标从未发送
    ServerUnavailable,
    /// 执行端拒绝目标
    Rejected,
    /// 结果解析器拿到终态
    Resolved { status: GoalStatus },
    /// 取消请求有了回复（无论是否生效）
    CancelCompleted { honored: bool },
    /// 传输层发送失败
    SendFailed { message: String },
    /// Ctrl+C / SIGTERM
    Interrupted,
}

#[derive(Debug, Default)]
struct SessionInner {
    token: CancellationToken,
    reason: OnceLock<SessionEnd>,
}

/// 会话对象；克隆共享同一状态
#[derive(Debug, Clone, Default)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// 结束会话；返回 true 表示本次调用首次结束了会话
    pub fn end(&self, reason: SessionEnd) -> bool {
        match self.inner.reason.set(reason) {
            Ok(()) => {
                if let Some(r) = self.inner.reason.get() {
                    tracing::info!(?r, "Session ended");
                }
                self.inner.token.cancel();
                true
            }
            Err(late) => {
                tracing::debug!(?late, "Session already ended, ignoring");
                false
            }
        }
    }

    pub fn is_ended(&self) -> bool {
        self.inner.token.is_cancelled()
    }

    pub fn end_reason(&self) -> Option<SessionEnd> {
        self.inner.reason.get().cloned()
    }

    /// 等待会话结束
    pub async fn ended(&self) {
        self.inner.token.cancelled().await;
    }

    /// 安装系统信号处理器 (Ctrl+C, SIGTERM)，收到信号即结束会话
    pub fn install_signal_handlers(&self) {
        let session = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                res = tokio::signal::ctrl_c() => {
                    if res.is_ok() {
                        tracing::info!("Received Ctrl+C, ending session...");
                        session.end(SessionEnd::Interrupted);
                    }
                }
                _ = session.ended() => {}
            }
        });

        #[cfg(unix)]
        {
            let session = self.clone();
            tokio::spawn(async move {
                use tokio::signal::unix::{signal, SignalKind};
                if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                    tokio::select! {
                        _ = sigterm.recv() => {
                            tracing::info!("Received SIGTERM, ending session...");
                            session.end(SessionEnd::Interrupted);
                        }
                        _ = session.ended() => {}
                    }
                }
            });
        }
    }
}
