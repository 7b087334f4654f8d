//! 服务端可用性闸门：在发送目标前等待端点就绪

use std::sync::Arc;
use std::time::Duration;

use crate::transport::ActionTransport;

pub struct ServerAvailabilityGate {
    transport: Arc<dyn ActionTransport>,
    poll_interval: Duration,
}

impl ServerAvailabilityGate {
    pub fn new(transport: Arc<dyn ActionTransport>, poll_interval: Duration) -> Self {
        Self {
            transport,
            poll_interval,
        }
    }

    /// 轮询就绪探测，直到就绪（true）或超时（false）；timeout 为 None 时一直等待
    pub async fn await_ready(&self, timeout: Option<Duration>) -> bool {
        let poll = async {
            loop {
                if self.transport.is_ready().await {
                    return;
                }
                tokio::time::sleep(self.poll_interval).await;
            }
        };

        match timeout {
            Some(limit) => tokio::time::timeout(limit, poll).await.is_ok(),
            None => {
                poll.await;
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulatorSection;
    use crate::transport::SimulatedActionServer;

    fn gate(cfg: SimulatorSection) -> (ServerAvailabilityGate, Arc<SimulatedActionServer>) {
        let server = Arc::new(SimulatedActionServer::new("/test", cfg));
        (
            ServerAvailabilityGate::new(server.clone(), Duration::from_millis(5)),
            server,
        )
    }

    #[tokio::test]
    async fn test_ready_immediately() {
        let (gate, _) = gate(SimulatorSection {
            ready_after_ms: 0,
            ..SimulatorSection::default()
        });
        assert!(gate.await_ready(Some(Duration::from_millis(50))).await);
    }

    #[tokio::test]
    async fn test_becomes_ready_before_timeout() {
        let (gate, _) = gate(SimulatorSection {
            ready_after_ms: 30,
            ..SimulatorSection::default()
        });
        assert!(gate.await_ready(Some(Duration::from_secs(2))).await);
    }

    #[tokio::test]
    async fn test_wait_forever_returns_once_ready() {
        let (gate, _) = gate(SimulatorSection {
            ready_after_ms: 20,
            ..SimulatorSection::default()
        });
        assert!(gate.await_ready(None).await);
    }

    #[tokio::test]
    async fn test_times_out_when_never_ready() {
        let (gate, server) = gate(SimulatorSection {
            never_ready: true,
            ..SimulatorSection::default()
        });
        for ms in [0u64, 10, 40] {
            assert!(!gate.await_ready(Some(Duration::from_millis(ms))).await);
        }
        assert_eq!(server.goals_received(), 0);
    }
}
