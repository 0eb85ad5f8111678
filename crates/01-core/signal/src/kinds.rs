//! Signal taxonomy: what the device can ask for, report, or announce.

use serde::{Deserialize, Serialize};

/// Axis label for three-axis quantities (IMU channels).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

/// Addressable channel within a signal kind: a GPIO pin or an IMU axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Channel {
    Pin(u8),
    Axis(Axis),
}

/// Standard channel set for three-axis quantities.
pub const THREE_AXIS: [Channel; 3] = [
    Channel::Axis(Axis::X),
    Channel::Axis(Axis::Y),
    Channel::Axis(Axis::Z),
];

/// Inputs the firmware can query the harness for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum InputKind {
    DigitalRead,
    AnalogRead,
    Accelerometer,
    Gyroscope,
    Magnetometer,
}

impl InputKind {
    /// Whether samples of this kind travel as analog bins on the wire.
    pub fn is_analog(self) -> bool {
        !matches!(self, InputKind::DigitalRead)
    }
}

/// Outputs the firmware reports to the harness.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OutputKind {
    DigitalWrite,
    AnalogWrite,
    Screen,
}

/// One-way notifications from the firmware.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventKind {
    Init,
    ScreenInit,
    Print,
    Gps,
    Wifi,
}

/// Any signal kind, tagged by direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SignalKind {
    Input(InputKind),
    Output(OutputKind),
    Event(EventKind),
}

impl From<InputKind> for SignalKind {
    fn from(kind: InputKind) -> Self {
        SignalKind::Input(kind)
    }
}

impl From<OutputKind> for SignalKind {
    fn from(kind: OutputKind) -> Self {
        SignalKind::Output(kind)
    }
}

impl From<EventKind> for SignalKind {
    fn from(kind: EventKind) -> Self {
        SignalKind::Event(kind)
    }
}

/// Key addressing one stream of samples: a signal kind plus an optional
/// channel (events and the screen use `None`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SignalKey {
    pub kind: SignalKind,
    pub channel: Option<Channel>,
}

impl SignalKey {
    pub fn new(kind: impl Into<SignalKind>, channel: Option<Channel>) -> Self {
        Self {
            kind: kind.into(),
            channel,
        }
    }
}
