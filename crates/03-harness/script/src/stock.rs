//! Stock preference tables.

use signal::{pref_key, Axis, Channel, InputKind, Preferences, Value};

/// Default input values served when no frame can answer a query.
///
/// Gravity is baked into the accelerometer's z axis.
pub fn default_input_values() -> Preferences<Value> {
    let mut prefs = Preferences::new();
    prefs.set(&pref_key(InputKind::DigitalRead, None), Value::Int(0));
    prefs.set(&pref_key(InputKind::AnalogRead, None), Value::Real(0.0));
    prefs.set(&pref_key(InputKind::Accelerometer, None), Value::Real(0.0));
    prefs.set(
        &pref_key(InputKind::Accelerometer, Some(Channel::Axis(Axis::Z))),
        Value::Real(1.0),
    );
    prefs.set(&pref_key(InputKind::Gyroscope, None), Value::Real(0.0));
    prefs.set(&pref_key(InputKind::Magnetometer, None), Value::Real(0.0));
    prefs
}
