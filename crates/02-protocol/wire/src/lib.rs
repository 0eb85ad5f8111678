//! Framed request/response protocol between the harness and the device.
//!
//! * [`Request`] / [`Response`] – the tagged message model.
//! * [`RequestMatcher`] – serializable predicates over requests, used by
//!   temporal conditions.
//! * [`WireCodec`] – byte-level translation for the serial framing.

mod codec;
mod error;
mod matcher;
mod message;

pub use codec::{parse_header, WireCodec, HEADER_LEN};
pub use error::{CodecError, CodecResult};
pub use matcher::RequestMatcher;
pub use message::{
    BatchParams, Channels, EventData, EventRequest, InputRequest, InvalidRequest, OutputChannels,
    OutputRequest, Request, Response,
};
