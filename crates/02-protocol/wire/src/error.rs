use thiserror::Error;

use signal::InputKind;

pub type CodecResult<T> = Result<T, CodecError>;

/// Failures producing device-side frames.
///
/// Decoding never fails: a malformed frame becomes `Request::Invalid` and the
/// session answers it with an error response.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("analog input {0:?} cannot be framed without analog params")]
    MissingAnalogParams(InputKind),

    #[error("value cannot be framed: {0}")]
    Unencodable(String),

    #[error("frame body of {0} bytes exceeds the u16 length field")]
    BodyTooLarge(usize),
}

impl CodecError {
    pub fn unencodable(msg: impl Into<String>) -> Self {
        CodecError::Unencodable(msg.into())
    }
}
