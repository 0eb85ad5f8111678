//! Per-channel pass/fail with aggregation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use script::SharedCondition;
use signal::{pref_key, Preferences, ProfileEntry, SignalKey, Time, Value};

use crate::error::EvalError;
use crate::log_store::RequestLog;

/// Slack applied to the coverage comparison so exact-portion checks are not
/// lost to float error.
const PORTION_EPSILON: f64 = 1e-9;

/// How an observed value is compared against the expectation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Check {
    /// Exact equality.
    Equal,
    /// Numeric equality within a tolerance.
    NearEqual { tolerance: f64 },
    /// Screens sharing at least this many equal pixels.
    PixelMatchMin { min: u32 },
    /// Screens differing in at most this many pixels.
    PixelErrorMax { max: u32 },
    /// Screens whose equal-pixel fraction reaches this threshold.
    ScreenCloseTo { fraction: f64 },
    /// Every observation passes.
    Always,
}

impl Check {
    /// Whether `observed` satisfies the check against `expected`. An
    /// undefined observation only passes `Always`.
    pub fn passes(&self, expected: &Value, observed: Option<&Value>) -> bool {
        let observed = match (self, observed) {
            (Check::Always, _) => return true,
            (_, None) => return false,
            (_, Some(observed)) => observed,
        };
        match self {
            Check::Always => true,
            Check::Equal => expected == observed,
            Check::NearEqual { tolerance } => match (expected.as_real(), observed.as_real()) {
                (Some(a), Some(b)) => (a - b).abs() <= *tolerance,
                _ => false,
            },
            Check::PixelMatchMin { min } => {
                screens(expected, observed).is_some_and(|(a, b)| {
                    a.matching_pixels(b).is_some_and(|count| count >= *min)
                })
            }
            Check::PixelErrorMax { max } => {
                screens(expected, observed).is_some_and(|(a, b)| {
                    a.differing_pixels(b).is_some_and(|count| count <= *max)
                })
            }
            Check::ScreenCloseTo { fraction } => {
                screens(expected, observed).is_some_and(|(a, b)| {
                    a.matching_fraction(b).is_some_and(|f| f >= *fraction)
                })
            }
        }
    }
}

fn screens<'a>(
    expected: &'a Value,
    observed: &'a Value,
) -> Option<(&'a signal::ScreenBuffer, &'a signal::ScreenBuffer)> {
    match (expected, observed) {
        (Value::Screen(a), Value::Screen(b)) => Some((a, b)),
        _ => None,
    }
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Check::Equal => write!(f, "equal"),
            Check::NearEqual { tolerance } => write!(f, "within {tolerance}"),
            Check::PixelMatchMin { min } => write!(f, ">= {min} matching pixels"),
            Check::PixelErrorMax { max } => write!(f, "<= {max} differing pixels"),
            Check::ScreenCloseTo { fraction } => {
                write!(f, ">= {:.0}% matching pixels", fraction * 100.0)
            }
            Check::Always => write!(f, "always passes"),
        }
    }
}

/// How a channel's point verdicts combine into one verdict.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Aggregation {
    All,
    Any,
}

impl Aggregation {
    pub fn apply(&self, mut results: impl Iterator<Item = bool>) -> bool {
        match self {
            Aggregation::All => results.all(|r| r),
            Aggregation::Any => results.any(|r| r),
        }
    }
}

/// One assertion: within this interval relative to a condition, the channel
/// should carry this value for at least `portion` of the interval.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvalPoint {
    /// Index into the evaluator's condition list.
    pub condition_id: usize,
    pub expected: Value,
    /// Check interval, relative to the condition's satisfaction time.
    pub interval: (Time, Time),
    pub check: Check,
    /// Required coverage fraction in `[0, 1]`.
    pub portion: f64,
}

/// Verdict for a single eval point, with the observed interval profile.
#[derive(Clone, Debug, PartialEq)]
pub struct PointReport {
    pub point: EvalPoint,
    pub passed: bool,
    pub observed: Vec<ProfileEntry<Value>>,
}

/// Verdict for one channel.
#[derive(Clone, Debug, PartialEq)]
pub struct ChannelReport {
    pub passed: bool,
    pub points: Vec<PointReport>,
}

/// How one replayed condition fared against the log.
#[derive(Clone, Debug, PartialEq)]
pub struct ConditionOutcome {
    pub description: String,
    pub satisfied_at: Option<Time>,
}

/// Full evaluation result.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EvalReport {
    pub conditions: Vec<ConditionOutcome>,
    pub channels: BTreeMap<SignalKey, ChannelReport>,
}

impl EvalReport {
    pub fn passed(&self) -> bool {
        self.channels.values().all(|channel| channel.passed)
    }
}

/// Replays conditions over a log and scores every eval point against the
/// extracted sequences.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Evaluator {
    pub conditions: Vec<SharedCondition>,
    pub points: BTreeMap<SignalKey, Vec<EvalPoint>>,
    pub aggregators: Preferences<Aggregation>,
}

impl Evaluator {
    pub fn new(
        conditions: Vec<SharedCondition>,
        points: BTreeMap<SignalKey, Vec<EvalPoint>>,
    ) -> Self {
        Self {
            conditions,
            points,
            aggregators: Preferences::with_fallback(Aggregation::All),
        }
    }

    pub fn evaluate(&self, log: &RequestLog) -> Result<EvalReport, EvalError> {
        let satisfied: Vec<Option<Time>> = self
            .conditions
            .iter()
            .map(|condition| log.condition_satisfied_at(condition))
            .collect();
        let sequences = log.extract_sequences();

        let mut report = EvalReport {
            conditions: self
                .conditions
                .iter()
                .zip(&satisfied)
                .map(|(condition, &satisfied_at)| ConditionOutcome {
                    description: condition.lock().to_string(),
                    satisfied_at,
                })
                .collect(),
            channels: BTreeMap::new(),
        };
        for (key, points) in &self.points {
            let sequence = sequences.get(key);
            let mut point_reports = Vec::with_capacity(points.len());
            for point in points {
                point_reports.push(self.evaluate_point(point, &satisfied, sequence)?);
            }
            let aggregation = self
                .aggregators
                .get(&pref_key(key.kind, key.channel))
                .copied()
                .unwrap_or(Aggregation::All);
            let passed = aggregation.apply(point_reports.iter().map(|p| p.passed));
            report.channels.insert(
                *key,
                ChannelReport {
                    passed,
                    points: point_reports,
                },
            );
        }
        Ok(report)
    }

    fn evaluate_point(
        &self,
        point: &EvalPoint,
        satisfied: &[Option<Time>],
        sequence: Option<&signal::Sequence<Option<Value>>>,
    ) -> Result<PointReport, EvalError> {
        let zero = *satisfied
            .get(point.condition_id)
            .ok_or(EvalError::ConditionIndex {
                index: point.condition_id,
                len: satisfied.len(),
            })?;
        let Some(zero) = zero else {
            // The condition never fired, so there is nothing to observe.
            return Ok(PointReport {
                point: point.clone(),
                passed: false,
                observed: Vec::new(),
            });
        };

        let (start, end) = point.interval;
        let empty = signal::Sequence::new();
        let profile = sequence.unwrap_or(&empty).profile(start + zero, end + zero);
        let observed: Vec<ProfileEntry<Value>> = profile
            .into_iter()
            .map(|entry| ProfileEntry {
                value: entry.value.flatten(),
                fraction: entry.fraction,
            })
            .collect();

        let covered: f64 = observed
            .iter()
            .filter(|entry| point.check.passes(&point.expected, entry.value.as_ref()))
            .map(|entry| entry.fraction)
            .sum();
        Ok(PointReport {
            point: point.clone(),
            passed: covered >= point.portion - PORTION_EPSILON,
            observed,
        })
    }
}
