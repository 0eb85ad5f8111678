use serde::{Deserialize, Serialize};

/// Linear mapping between integer bins and real values.
///
/// Both directions clamp to the declared range, so conversions are monotone
/// and total for any input.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalogParams {
    pub min_bin: i32,
    pub max_bin: i32,
    pub min_value: f64,
    pub max_value: f64,
}

impl AnalogParams {
    pub fn new(min_bin: i32, max_bin: i32, min_value: f64, max_value: f64) -> Self {
        Self {
            min_bin,
            max_bin,
            min_value,
            max_value,
        }
    }

    /// Quantizes a real value into its bin, rounding to nearest.
    pub fn to_bin(&self, value: f64) -> i32 {
        if self.max_value == self.min_value {
            return self.min_bin;
        }
        let frac = (value - self.min_value) / (self.max_value - self.min_value);
        let raw = frac * (self.max_bin - self.min_bin) as f64 + self.min_bin as f64;
        (raw.round() as i64).clamp(self.min_bin as i64, self.max_bin as i64) as i32
    }

    /// Reconstructs the real value a bin stands for.
    pub fn to_value(&self, bin: i32) -> f64 {
        if self.max_bin == self.min_bin {
            return self.min_value;
        }
        let frac = (bin - self.min_bin) as f64 / (self.max_bin - self.min_bin) as f64;
        let raw = frac * (self.max_value - self.min_value) + self.min_value;
        raw.clamp(self.min_value, self.max_value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn params() -> AnalogParams {
        AnalogParams::new(-128, 127, 0.0, 5.0)
    }

    #[test]
    fn to_bin_reference_values() {
        let p = params();
        assert_eq!(p.to_bin(0.0), -128);
        assert_eq!(p.to_bin(5.0), 127);
        assert_eq!(p.to_bin(2.5098), 0);
    }

    #[test]
    fn to_bin_clamps() {
        let p = params();
        assert_eq!(p.to_bin(-1.0), -128);
        assert_eq!(p.to_bin(6.0), 127);
    }

    #[test]
    fn to_value_reference_values() {
        let p = params();
        assert_eq!(p.to_value(-128), 0.0);
        assert_eq!(p.to_value(127), 5.0);
        assert!((p.to_value(0) - 2.5098).abs() < 1e-3);
    }

    #[test]
    fn to_value_clamps() {
        let p = params();
        assert_eq!(p.to_value(-150), 0.0);
        assert_eq!(p.to_value(150), 5.0);
    }

    proptest! {
        #[test]
        fn round_trip_stays_within_one_bin(v in 0.0f64..=5.0) {
            let p = params();
            let bin_width = (p.max_value - p.min_value) / (p.max_bin - p.min_bin) as f64;
            let back = p.to_value(p.to_bin(v));
            prop_assert!((back - v).abs() <= bin_width);
        }

        #[test]
        fn to_bin_is_monotone(a in -2.0f64..=7.0, b in -2.0f64..=7.0) {
            let p = params();
            if a <= b {
                prop_assert!(p.to_bin(a) <= p.to_bin(b));
            }
        }
    }
}
