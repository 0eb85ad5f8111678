/// Milliseconds on the device's monotonic clock.
///
/// Every timestamp, check interval, and sequence key in the workspace shares
/// this unit. Values are normally non-negative but may dip below zero
/// transiently after a sequence shift.
pub type Time = i64;

/// Smallest representable step of the timebase, used as the sampling
/// resolution for linear interpolation.
pub const TIME_RESOLUTION: Time = 1;
