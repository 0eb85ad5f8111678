//! Recorded-session side of the harness.
//!
//! * [`RequestLog`] – append-only request log with per-channel sequence
//!   extraction.
//! * [`Evaluator`] – per-channel pass/fail against a log.
//! * [`Scaffold`] – TestCase synthesis from a recorded log.
//! * [`TestCase`] – the user-facing (handler, evaluator) pair, persisted as
//!   an opaque blob.

mod case;
mod error;
mod evaluator;
mod fontgen;
mod log_store;
mod report;
mod scaffold;

pub use case::{load, save, TestCase};
pub use error::{EvalError, FontError, PersistError, ScaffoldError};
pub use evaluator::{
    Aggregation, ChannelReport, Check, ConditionOutcome, EvalPoint, EvalReport, Evaluator,
    PointReport,
};
pub use fontgen::build_font;
pub use log_store::RequestLog;
pub use report::{brief_description, description};
pub use scaffold::{Bound, EvalPointTemplate, FrameTemplate, IntervalTemplate, Scaffold};
