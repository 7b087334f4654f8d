//! 动作客户端编排器：主控循环
//!
//! 负责：等待服务端、提交唯一的目标，然后在一个 select 循环里依次分派所有事件
//! （接受回复、反馈、状态更新、终态结果、取消计时器、取消回复）。所有回调都在这一个任务里串行执行，
//! GoalHandle 只在这里被修改；耗时等待（发送、结果、取消）放在后台任务中，由循环观察其完成。
//! 会话一旦结束，循环退出并中止所有仍在等待的后台任务。

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::{JoinError, JoinHandle};

use crate::action::{
    on_cancel_response, Acceptance, CancelPolicy, CancelPromise, CancellationScheduler,
    DecisionSource, FeedbackSink, GoalSubmitter, RandomDecisions, ResultPromise, ResultResolver,
    ServerAvailabilityGate, TickDecision,
};
use crate::config::{AppConfig, CancelSection, ClientSection};
use crate::core::{ActionError, GoalHandle, GoalStatus, Session, SessionEnd, TransportError};
use crate::msgs::{GotoWaypointGoal, GotoWaypointResult};
use crate::transport::{ActionEvent, ActionTransport, GoalId};

/// 一次会话的结果汇总
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionReport {
    pub end: Option<SessionEnd>,
    pub goal_id: Option<GoalId>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub final_status: Option<GoalStatus>,
    pub result: Option<GotoWaypointResult>,
    pub feedback_relayed: usize,
    /// 按到达顺序转发的反馈文本
    pub feedback_messages: Vec<String>,
    pub cancel_ticks: usize,
    pub cancel_armings: usize,
    pub cancel_requested: bool,
}

/// 单目标动作客户端
pub struct ActionClient {
    transport: Arc<dyn ActionTransport>,
    client_cfg: ClientSection,
    cancel_cfg: CancelSection,
    decisions: Box<dyn DecisionSource>,
    session: Session,
}

impl ActionClient {
    pub fn new(transport: Arc<dyn ActionTransport>, cfg: &AppConfig) -> Self {
        Self {
            transport,
            client_cfg: cfg.client.clone(),
            cancel_cfg: cfg.cancel.clone(),
            decisions: Box::new(RandomDecisions::from_config(&cfg.cancel)),
            session: Session::new(),
        }
    }

    /// 替换取消抽签的随机源
    pub fn with_decisions(mut self, decisions: impl DecisionSource + 'static) -> Self {
        self.decisions = Box::new(decisions);
        self
    }

    /// 会话句柄（用于安装信号处理或从外部结束会话）
    pub fn session(&self) -> Session {
        self.session.clone()
    }

    /// 运行整个会话；只有发送失败会作为错误返回，其它结局都记录在报告里
    pub async fn run(self, goal: GotoWaypointGoal) -> Result<SessionReport, ActionError> {
        let Self {
            transport,
            client_cfg,
            cancel_cfg,
            decisions,
            session,
        } = self;
        let mut report = SessionReport::default();

        tracing::info!(action = %transport.action_name(), "Waiting for server to come alive");
        let gate = ServerAvailabilityGate::new(transport.clone(), client_cfg.server_poll_interval());
        let ready = tokio::select! {
            biased;
            _ = session.ended() => false,
            ready = gate.await_ready(client_cfg.server_timeout()) => ready,
        };
        if !ready {
            if !session.is_ended() {
                tracing::warn!("Server was not available, quitting");
                session.end(SessionEnd::ServerUnavailable);
            }
            report.end = session.end_reason();
            return Ok(report);
        }

        let submitter = GoalSubmitter::new(transport.clone());
        let resolver = ResultResolver::new(transport.clone());
        let mut scheduler =
            CancellationScheduler::new(cancel_cfg.period(), CancelPolicy::from(&cancel_cfg), decisions);
        let mut sink = FeedbackSink::new();

        let (acceptance, mut events) = submitter.submit(goal);
        let mut acceptance = Some(acceptance);
        let mut result_wait: Option<ResultPromise> = None;
        let mut cancel_wait: Option<CancelPromise> = None;
        if client_cfg.arm_cancel_on_send {
            scheduler.arm();
        }

        let mut handle: Option<GoalHandle> = None;
        // 接受回复之前到达的最新状态
        let mut early_status: Option<(GoalId, GoalStatus)> = None;
        let mut fatal: Option<TransportError> = None;

        loop {
            tokio::select! {
                biased;
                _ = session.ended() => break,
                response = join_slot(&mut acceptance) => {
                    match GoalSubmitter::on_goal_response(response) {
                        Acceptance::Accepted(mut h) => {
                            if let Some((id, status)) = early_status.take() {
                                if id == h.goal_id() {
                                    apply_status(&mut h, status);
                                }
                            }
                            report.goal_id = Some(h.goal_id());
                            report.accepted_at = Some(h.accepted_at());
                            result_wait = Some(resolver.wait(h.goal_id()));
                            scheduler.arm();
                            handle = Some(h);
                        }
                        Acceptance::Rejected => {
                            tracing::info!("Goal rejected, nothing more to do");
                            session.end(SessionEnd::Rejected);
                        }
                        Acceptance::Failed(e) => {
                            session.end(SessionEnd::SendFailed { message: e.to_string() });
                            fatal = Some(e);
                        }
                    }
                }
                Some(event) = events.recv() => match event {
                    ActionEvent::Feedback { goal_id, feedback } => sink.on_feedback(goal_id, &feedback),
                    ActionEvent::Status { goal_id, status } => match handle.as_mut() {
                        Some(h) if h.goal_id() == goal_id => apply_status(h, status),
                        Some(_) => tracing::debug!(%goal_id, "Status update for another goal, ignoring"),
                        None => early_status = Some((goal_id, status)),
                    },
                },
                outcome = join_slot(&mut result_wait) => {
                    if let Some(h) = handle.as_mut() {
                        report.result = ResultResolver::resolve(&session, h, flatten(outcome));
                    }
                }
                outcome = join_slot(&mut cancel_wait) => {
                    on_cancel_response(&session, flatten(outcome));
                }
                _ = scheduler.tick(), if scheduler.is_armed() => {
                    if let TickDecision::Cancel(goal_id) = scheduler.on_tick(handle.as_ref()) {
                        cancel_wait = Some(CancellationScheduler::request_cancel(transport.clone(), goal_id));
                        report.cancel_requested = true;
                    }
                }
            }
        }

        // 会话结束：中止所有未完成的等待
        scheduler.disarm();
        if let Some(task) = acceptance.take() {
            task.abort();
        }
        if let Some(task) = result_wait.take() {
            task.abort();
        }
        if let Some(task) = cancel_wait.take() {
            task.abort();
        }

        report.end = session.end_reason();
        report.final_status = handle.as_ref().map(GoalHandle::status);
        report.feedback_relayed = sink.relayed();
        report.feedback_messages = sink.into_messages();
        report.cancel_ticks = scheduler.ticks();
        report.cancel_armings = scheduler.armings();

        match fatal {
            Some(e) => Err(ActionError::SendFailed(e)),
            None => Ok(report),
        }
    }
}

fn apply_status(handle: &mut GoalHandle, status: GoalStatus) {
    // 终态只由结果解析器写入
    if status.is_terminal() {
        return;
    }
    if let Err(e) = handle.transition(status) {
        tracing::warn!("{}", e);
    }
}

/// 等待槽位中的后台任务；槽位为空时永远挂起，完成后清空槽位
async fn join_slot<T>(slot: &mut Option<JoinHandle<T>>) -> Result<T, JoinError> {
    match slot.as_mut() {
        Some(task) => {
            let out = task.await;
            *slot = None;
            out
        }
        None => std::future::pending().await,
    }
}

fn flatten<T>(joined: Result<Result<T, TransportError>, JoinError>) -> Result<T, TransportError> {
    joined.map_err(|e| TransportError::Other(format!("task failed: {}", e)))?
}
