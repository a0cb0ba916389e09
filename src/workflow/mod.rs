mod context;
mod history;
mod state;
mod store;

pub use context::{Context, Subject};
pub use history::{AuditTrail, HistoryRecord, NewRecord, RecordId};
pub use state::{StateMachine, StateMachineBuilder, Transition, WorkflowState};
pub use store::{HistoryStore, HistoryTxn, MemoryHistoryStore};
