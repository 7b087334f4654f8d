//! 目标生命周期组件：可用性闸门、提交、反馈、随机取消、结果解析

pub mod cancel;
pub mod decision;
pub mod feedback;
pub mod gate;
pub mod resolver;
pub mod submitter;

pub use cancel::{on_cancel_response, CancelPolicy, CancelPromise, CancellationScheduler, TickDecision};
pub use decision::{DecisionSource, RandomDecisions, ScriptedDecisions};
pub use feedback::FeedbackSink;
pub use gate::ServerAvailabilityGate;
pub use resolver::{ResultPromise, ResultResolver};
pub use submitter::{Acceptance, AcceptancePromise, GoalSubmitter};
