//! Tagged message model.
//!
//! Requests are immutable after construction and always timestamped. An
//! input request with `values: None` is a live query the harness must answer;
//! with values present it is the replay of a recorded query.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use signal::{AnalogParams, Channel, EventKind, InputKind, OutputKind, ScreenShape, Time, Value};

/// Channel lists are at most three entries (x, y, z) in practice.
pub type Channels = SmallVec<[Channel; 3]>;

/// Output channel lists; the screen reports with no channel at all.
pub type OutputChannels = SmallVec<[Option<Channel>; 3]>;

/// A request for `num` successive samples spaced `period` apart.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchParams {
    pub num: u16,
    pub period: Time,
}

impl Default for BatchParams {
    fn default() -> Self {
        Self { num: 1, period: 0 }
    }
}

impl BatchParams {
    pub fn new(num: u16, period: Time) -> Self {
        Self { num, period }
    }
}

/// Payload carried by an event request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum EventData {
    Text(String),
    Shape(ScreenShape),
}

/// The firmware is waiting on input values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InputRequest {
    pub timestamp: Time,
    pub kind: InputKind,
    pub channels: Channels,
    /// Raw wire integers (digital levels or analog bins); `None` for a live
    /// query.
    pub values: Option<Vec<i64>>,
    pub analog: Option<AnalogParams>,
    pub batch: BatchParams,
    pub response_expected: bool,
}

/// The firmware reports values it drove.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutputRequest {
    pub timestamp: Time,
    pub kind: OutputKind,
    pub channels: OutputChannels,
    pub values: Vec<Value>,
    pub analog: Option<AnalogParams>,
    pub response_expected: bool,
}

/// The firmware announces an internal event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventRequest {
    pub timestamp: Time,
    pub kind: EventKind,
    pub data: Option<EventData>,
    pub response_expected: bool,
}

/// A frame the codec could not make sense of.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InvalidRequest {
    pub timestamp: Time,
    pub response_expected: bool,
}

/// Any message the device can send.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Request {
    Input(InputRequest),
    Output(OutputRequest),
    Event(EventRequest),
    Invalid(InvalidRequest),
}

impl Request {
    pub fn timestamp(&self) -> Time {
        match self {
            Request::Input(r) => r.timestamp,
            Request::Output(r) => r.timestamp,
            Request::Event(r) => r.timestamp,
            Request::Invalid(r) => r.timestamp,
        }
    }

    pub fn response_expected(&self) -> bool {
        match self {
            Request::Input(r) => r.response_expected,
            Request::Output(r) => r.response_expected,
            Request::Event(r) => r.response_expected,
            Request::Invalid(r) => r.response_expected,
        }
    }

    pub fn is_valid(&self) -> bool {
        !matches!(self, Request::Invalid(_))
    }

    pub fn is_input(&self) -> bool {
        matches!(self, Request::Input(_))
    }

    pub fn is_output(&self) -> bool {
        matches!(self, Request::Output(_))
    }

    pub fn is_event(&self) -> bool {
        matches!(self, Request::Event(_))
    }

    /// Convenience constructor for a bare event.
    pub fn event(timestamp: Time, kind: EventKind) -> Self {
        Request::Event(EventRequest {
            timestamp,
            kind,
            data: None,
            response_expected: true,
        })
    }

    /// Convenience constructor for a print event.
    pub fn print(timestamp: Time, text: impl Into<String>) -> Self {
        Request::Event(EventRequest {
            timestamp,
            kind: EventKind::Print,
            data: Some(EventData::Text(text.into())),
            response_expected: true,
        })
    }

    /// Convenience constructor for a single digital write.
    pub fn digital_write(timestamp: Time, pin: u8, value: i64) -> Self {
        Request::Output(OutputRequest {
            timestamp,
            kind: OutputKind::DigitalWrite,
            channels: smallvec::smallvec![Some(Channel::Pin(pin))],
            values: vec![Value::Int(value)],
            analog: None,
            response_expected: true,
        })
    }

    /// Convenience constructor for a full-screen report.
    pub fn screen(timestamp: Time, buffer: signal::ScreenBuffer) -> Self {
        Request::Output(OutputRequest {
            timestamp,
            kind: OutputKind::Screen,
            channels: smallvec::smallvec![None],
            values: vec![Value::Screen(buffer)],
            analog: None,
            response_expected: true,
        })
    }

    /// Convenience constructor for a live digital query.
    pub fn digital_read(timestamp: Time, pin: u8) -> Self {
        Request::Input(InputRequest {
            timestamp,
            kind: InputKind::DigitalRead,
            channels: smallvec::smallvec![Channel::Pin(pin)],
            values: None,
            analog: None,
            batch: BatchParams::default(),
            response_expected: true,
        })
    }
}

/// Host reply to one request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Response {
    Ack {
        complete: bool,
    },
    Error {
        complete: bool,
    },
    Values {
        values: Vec<i64>,
        analog: bool,
        complete: bool,
    },
    /// Nothing goes on the wire; sent when the request opted out of a reply.
    Silent {
        complete: bool,
    },
}

impl Response {
    pub fn ack() -> Self {
        Response::Ack { complete: false }
    }

    pub fn error() -> Self {
        Response::Error { complete: false }
    }

    pub fn values(values: Vec<i64>, analog: bool) -> Self {
        Response::Values {
            values,
            analog,
            complete: false,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error { .. })
    }

    pub fn complete(&self) -> bool {
        match self {
            Response::Ack { complete }
            | Response::Error { complete }
            | Response::Values { complete, .. }
            | Response::Silent { complete } => *complete,
        }
    }

    pub fn set_complete(&mut self, value: bool) {
        match self {
            Response::Ack { complete }
            | Response::Error { complete }
            | Response::Values { complete, .. }
            | Response::Silent { complete } => *complete = value,
        }
    }
}
