//! Scripted response side of the harness.
//!
//! A [`Frame`] replays one scripted timeline between its start and end
//! [`Condition`]s; a [`RequestHandler`] owns a set of frames and dispatches
//! each incoming input query to the right one (or to the default-value
//! table).

mod condition;
mod frame;
mod handler;
mod shared;
pub mod stock;

pub use condition::{Cause, Condition, ConditionKind, SharedCondition};
pub use frame::{Frame, FrameStatus};
pub use handler::RequestHandler;
pub use shared::Shared;
