//! Core signal model shared across the harness.
//!
//! This crate exposes the foundational pieces the rest of the workspace
//! compiles against:
//! * [`Time`] – the single monotonic integer timebase (milliseconds).
//! * [`Value`] – polymorphic sample values (integer, real, text, bitmap).
//! * [`Sequence`] – time-indexed sample store with interpolation and
//!   interval profiling.
//! * [`AnalogParams`] – linear bin/value mapping with clamping.
//! * [`ScreenBuffer`] / [`Font`] – device display bitmaps.
//! * [`Preferences`] – hierarchical defaults keyed by signal kind/channel.

mod analog;
mod kinds;
mod prefs;
mod screen;
mod sequence;
mod time;
mod value;

pub use analog::AnalogParams;
pub use kinds::{
    Axis, Channel, EventKind, InputKind, OutputKind, SignalKey, SignalKind, THREE_AXIS,
};
pub use prefs::{pref_key, PrefAtom, PrefKey, Preferences};
pub use screen::{Font, ScreenBuffer, ScreenShape};
pub use sequence::{InterpolationKind, ProfileEntry, Sequence};
pub use time::{Time, TIME_RESOLUTION};
pub use value::Value;
