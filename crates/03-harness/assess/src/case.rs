//! The user-facing test artifact and its persistence.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use script::RequestHandler;

use crate::error::PersistError;
use crate::evaluator::Evaluator;

/// A test case: the handler drives a live session, the evaluator scores the
/// resulting log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    pub handler: RequestHandler,
    pub evaluator: Evaluator,
}

/// Persists any serializable harness artifact (test case, log, font) as an
/// opaque binary blob. Only round-trip fidelity is promised.
pub fn save<T: Serialize>(value: &T, path: impl AsRef<Path>) -> Result<(), PersistError> {
    let bytes = bincode::serialize(value)?;
    fs::write(path, bytes)?;
    Ok(())
}

/// Loads a blob previously written by [`save`].
pub fn load<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, PersistError> {
    let bytes = fs::read(path)?;
    Ok(bincode::deserialize(&bytes)?)
}
