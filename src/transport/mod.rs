//! 传输层：动作传输抽象与进程内模拟实现

pub mod simulated;
pub mod traits;

pub use simulated::SimulatedActionServer;
pub use traits::{
    ActionEvent, ActionTransport, CancelResponse, EventReceiver, EventSender, GoalId, GoalResponse,
    GoalResult,
};
