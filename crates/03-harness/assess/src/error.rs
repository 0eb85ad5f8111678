use thiserror::Error;

use signal::SignalKey;

/// Assertion-class failures during evaluation. These abort the evaluate
/// call; they are not per-point failures.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("eval point references condition {index} but only {len} exist")]
    ConditionIndex { index: usize, len: usize },
}

/// Failures synthesizing a test case from a log.
#[derive(Debug, Error)]
pub enum ScaffoldError {
    #[error("no default value for {0:?} and no lead-in sample before the window")]
    MissingDefault(SignalKey),

    #[error("unparseable interval bound {0:?} (expected e.g. \"0.2*T\", \"150\", \"1.0*T-20\")")]
    BadBound(String),
}

/// Failures saving or loading persisted blobs.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Codec(#[from] bincode::Error),
}

/// Failures scanning a log into a font.
#[derive(Debug, Error)]
pub enum FontError {
    #[error("glyph bitmaps disagree on cell shape: {0}x{1} vs {2}x{3}")]
    MixedShapes(u16, u16, u16, u16),
}
