//! 进程内模拟执行端（无需真实中间件）
//!
//! 接受目标后在后台任务中"航行"：先报告 Executing，每个步长推送一条反馈，最后给出终态结果。
//! 取消请求被接受时报告 Canceling，经过一小段收尾时间后以 Canceled 结束。

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{watch, RwLock};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::SimulatorSection;
use crate::core::{GoalStatus, TransportError};
use crate::msgs::{GotoWaypointFeedback, GotoWaypointGoal, GotoWaypointResult};
use crate::transport::{
    ActionEvent, ActionTransport, CancelResponse, EventSender, GoalId, GoalResponse, GoalResult,
};

/// 被接受的取消在多久之后真正生效（执行端收尾时间）
const CANCEL_WIND_DOWN: Duration = Duration::from_millis(100);

struct SimGoal {
    cancel: CancellationToken,
    result_rx: watch::Receiver<Option<GoalResult>>,
    events: EventSender,
}

/// 模拟执行端
pub struct SimulatedActionServer {
    action_name: String,
    cfg: SimulatorSection,
    started: Instant,
    goals: RwLock<HashMap<GoalId, SimGoal>>,
    goals_received: AtomicUsize,
    cancel_requests: AtomicUsize,
}

impl SimulatedActionServer {
    pub fn new(action_name: impl Into<String>, cfg: SimulatorSection) -> Self {
        Self {
            action_name: action_name.into(),
            cfg,
            started: Instant::now(),
            goals: RwLock::new(HashMap::new()),
            goals_received: AtomicUsize::new(0),
            cancel_requests: AtomicUsize::new(0),
        }
    }

    /// 收到过的目标数（包括被拒绝的）
    pub fn goals_received(&self) -> usize {
        self.goals_received.load(Ordering::SeqCst)
    }

    pub fn cancel_requests(&self) -> usize {
        self.cancel_requests.load(Ordering::SeqCst)
    }

    fn spawn_execution(
        &self,
        goal_id: GoalId,
        goal: GotoWaypointGoal,
        events: EventSender,
        cancel: CancellationToken,
        result_tx: watch::Sender<Option<GoalResult>>,
    ) {
        let steps = self.cfg.feedback_steps;
        let interval = Duration::from_millis(self.cfg.step_interval_ms);
        let final_status = self.cfg.final_status;

        tokio::spawn(async move {
            let _ = events.send(ActionEvent::Status {
                goal_id,
                status: GoalStatus::Executing,
            });

            let total = steps.max(1) as f64;
            for step in 1..=steps {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        tokio::time::sleep(CANCEL_WIND_DOWN).await;
                        let _ = result_tx.send(Some(GoalResult {
                            status: GoalStatus::Canceled,
                            result: GotoWaypointResult::default(),
                        }));
                        return;
                    }
                    _ = tokio::time::sleep(interval) => {}
                }
                let remaining = 1.0 - step as f64 / total;
                let _ = events.send(ActionEvent::Feedback {
                    goal_id,
                    feedback: GotoWaypointFeedback {
                        feedback_message: format!(
                            "Moving to {} ({}/{})",
                            goal.waypoint.name, step, steps
                        ),
                        distance_remaining: Some(remaining * 100.0),
                    },
                });
            }

            let reached_waypoint = if final_status.is_success() {
                goal.waypoint.name.clone()
            } else {
                String::new()
            };
            let _ = result_tx.send(Some(GoalResult {
                status: final_status,
                result: GotoWaypointResult { reached_waypoint },
            }));
        });
    }
}

#[async_trait]
impl ActionTransport for SimulatedActionServer {
    fn action_name(&self) -> &str {
        &self.action_name
    }

    async fn is_ready(&self) -> bool {
        !self.cfg.never_ready
            && self.started.elapsed() >= Duration::from_millis(self.cfg.ready_after_ms)
    }

    async fn send_goal(
        &self,
        goal: GotoWaypointGoal,
        events: EventSender,
    ) -> Result<GoalResponse, TransportError> {
        self.goals_received.fetch_add(1, Ordering::SeqCst);

        if self.cfg.fail_send {
            return Err(TransportError::Unreachable(self.action_name.clone()));
        }

        let goal_id = GoalId::new();
        if !self.cfg.accept {
            if self.cfg.accept_delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.cfg.accept_delay_ms)).await;
            }
            return Ok(GoalResponse {
                accepted: false,
                goal_id,
                stamp: Utc::now(),
            });
        }

        let cancel = CancellationToken::new();
        let (result_tx, result_rx) = watch::channel(None);
        self.goals.write().await.insert(
            goal_id,
            SimGoal {
                cancel: cancel.clone(),
                result_rx,
                events: events.clone(),
            },
        );
        self.spawn_execution(goal_id, goal, events, cancel, result_tx);

        if self.cfg.accept_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.cfg.accept_delay_ms)).await;
        }
        Ok(GoalResponse {
            accepted: true,
            goal_id,
            stamp: Utc::now(),
        })
    }

    async fn get_result(&self, goal_id: GoalId) -> Result<GoalResult, TransportError> {
        let mut rx = {
            let goals = self.goals.read().await;
            goals
                .get(&goal_id)
                .map(|g| g.result_rx.clone())
                .ok_or(TransportError::UnknownGoal(goal_id))?
        };
        let result = rx
            .wait_for(|r| r.is_some())
            .await
            .map_err(|_| TransportError::Closed)?;
        result.clone().ok_or(TransportError::Closed)
    }

    async fn cancel_goal(&self, goal_id: GoalId) -> Result<CancelResponse, TransportError> {
        self.cancel_requests.fetch_add(1, Ordering::SeqCst);

        let goals = self.goals.read().await;
        let goal = goals
            .get(&goal_id)
            .ok_or(TransportError::UnknownGoal(goal_id))?;

        let finished = goal.result_rx.borrow().is_some();
        if finished || !self.cfg.honor_cancel || goal.cancel.is_cancelled() {
            return Ok(CancelResponse::default());
        }

        goal.cancel.cancel();
        let _ = goal.events.send(ActionEvent::Status {
            goal_id,
            status: GoalStatus::Canceling,
        });
        Ok(CancelResponse {
            goals_canceling: vec![goal_id],
        })
    }
}
