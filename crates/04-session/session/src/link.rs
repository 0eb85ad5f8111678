use std::time::Duration;
use thiserror::Error;

/// Outcome of a blocking read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkRead {
    /// The buffer was filled.
    Filled,
    /// Timeout or short read; the session ends cleanly.
    Closed,
}

/// Transport failures that are not a clean end of session.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("short write: {written} of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },

    #[error("cannot open port: {0}")]
    Open(String),
}

/// Byte transport owned exclusively by the session driver.
pub trait Link {
    /// Applies the read timeout used by subsequent reads.
    fn set_timeout(&mut self, timeout: Option<Duration>) -> Result<(), LinkError>;

    /// Blocks until the buffer is filled, the timeout expires, or the
    /// transport fails.
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<LinkRead, LinkError>;

    /// Writes the whole frame in a single call, so it lands in one packet.
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), LinkError>;
}
