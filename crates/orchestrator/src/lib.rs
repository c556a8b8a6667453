//! Transaction orchestration for marketplace actions
//!
//! Every state-changing marketplace action follows the same shape: check
//! guards, top up the token allowance if it falls short, then execute the
//! economic call, with a dry-run simulation in front of every submission.
//! This crate implements that shape once, as a state machine driven by a
//! [`FlowEngine`] over anything implementing [`ApprovalThenAction`].

pub mod engine;
pub mod error;
pub mod flow;
pub mod state;

pub use engine::{FlowEngine, MAX_APPROVAL_ROUNDS, SUCCESS_LINGER_SECS};
pub use error::FlowError;
pub use flow::{ApprovalNeed, ApprovalThenAction};
pub use state::TransactionState;
