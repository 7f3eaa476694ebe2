//! 核心层：会话状态、单轮调度、UI 状态投影、会话运行时

pub mod dispatch;
pub mod error;
pub mod runtime;
pub mod session;
pub mod state;

pub use dispatch::{DispatchController, TurnOutcome, TurnPhase, FAILED_TURN_REPLY};
pub use error::LabError;
pub use runtime::{create_session, spawn_session, Command};
pub use session::{Session, SessionConfig};
pub use state::{DocumentEntry, UiState};
