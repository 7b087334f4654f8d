//! 核心层：错误、目标状态机、会话生命周期、主控循环

pub mod error;
pub mod orchestrator;
pub mod session;
pub mod state;

pub use error::{ActionError, GoalStateError, TransportError};
pub use orchestrator::{ActionClient, SessionReport};
pub use session::{Session, SessionEnd};
pub use state::{GoalHandle, GoalStatus};
