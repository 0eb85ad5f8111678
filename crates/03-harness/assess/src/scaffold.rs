//! TestCase synthesis from a recorded log.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

use script::{Condition, Frame, RequestHandler, SharedCondition};
use signal::{
    pref_key, InterpolationKind, Preferences, Sequence, SignalKey, SignalKind, Time, Value,
    TIME_RESOLUTION,
};
use wire::Request;

use crate::case::TestCase;
use crate::error::ScaffoldError;
use crate::evaluator::{Aggregation, Check, EvalPoint, Evaluator};
use crate::log_store::{LogSequences, RequestLog};

/// One endpoint of a check interval, written as `a*T + b` where `T` is the
/// run length of the observed output value.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bound {
    pub scale: f64,
    pub offset: Time,
}

impl Bound {
    pub fn absolute(offset: Time) -> Self {
        Self { scale: 0.0, offset }
    }

    /// Evaluates the bound for a concrete run length, truncating toward
    /// zero like integer conversion does.
    pub fn eval(&self, run: Time) -> Time {
        (self.scale * run as f64) as Time + self.offset
    }
}

impl FromStr for Bound {
    type Err = ScaffoldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || ScaffoldError::BadBound(s.to_string());
        let trimmed = s.trim();
        match trimmed.find('T') {
            None => trimmed
                .parse::<Time>()
                .map(Bound::absolute)
                .map_err(|_| bad()),
            Some(index) => {
                let coefficient = trimmed[..index].trim_end_matches('*').trim();
                let scale = if coefficient.is_empty() {
                    1.0
                } else {
                    coefficient.parse::<f64>().map_err(|_| bad())?
                };
                let rest = trimmed[index + 1..].trim();
                let offset = if rest.is_empty() {
                    0
                } else {
                    rest.parse::<Time>().map_err(|_| bad())?
                };
                Ok(Bound { scale, offset })
            }
        }
    }
}

/// Check interval template relative to each observed output value.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct IntervalTemplate {
    pub start: Bound,
    pub end: Bound,
}

impl IntervalTemplate {
    pub fn parse(start: &str, end: &str) -> Result<Self, ScaffoldError> {
        Ok(Self {
            start: start.parse()?,
            end: end.parse()?,
        })
    }

    pub fn eval(&self, run: Time) -> (Time, Time) {
        (self.start.eval(run), self.end.eval(run))
    }
}

impl Default for IntervalTemplate {
    /// The middle 60% of each output's run: `("0.2*T", "0.8*T")`.
    fn default() -> Self {
        Self {
            start: Bound {
                scale: 0.2,
                offset: 0,
            },
            end: Bound {
                scale: 0.8,
                offset: 0,
            },
        }
    }
}

/// How eval points are minted for one output channel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvalPointTemplate {
    pub interval: IntervalTemplate,
    pub check: Check,
    pub portion: f64,
}

impl Default for EvalPointTemplate {
    fn default() -> Self {
        Self {
            interval: IntervalTemplate::default(),
            check: Check::Equal,
            portion: 1.0,
        }
    }
}

/// Blueprint for one frame of the synthesized test case.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FrameTemplate {
    pub start: SharedCondition,
    /// `None` means "until the end of the log"; the synthesized frame gets a
    /// fixed-delay end condition hung off its start.
    pub end: Option<SharedCondition>,
    pub priority: i32,
    /// Prefer the per-channel default over the lead-in sample when seeding
    /// the window's initial input value.
    pub init_to_default: bool,
}

impl FrameTemplate {
    pub fn new(start: SharedCondition, end: Option<SharedCondition>) -> Self {
        Self {
            start,
            end,
            priority: 0,
            init_to_default: true,
        }
    }
}

/// Template-driven procedure turning a recorded log into a reusable
/// TestCase.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Scaffold {
    pub frame_templates: Vec<FrameTemplate>,
    pub interpolations: Preferences<InterpolationKind>,
    pub default_values: Preferences<Value>,
    pub point_templates: Preferences<EvalPointTemplate>,
    pub aggregators: Preferences<Aggregation>,
}

impl Scaffold {
    pub fn new(frame_templates: Vec<FrameTemplate>) -> Self {
        Self {
            frame_templates,
            interpolations: Preferences::with_fallback(InterpolationKind::Mid),
            default_values: script::stock::default_input_values(),
            point_templates: Preferences::with_fallback(EvalPointTemplate::default()),
            aggregators: Preferences::with_fallback(Aggregation::All),
        }
    }

    /// Synthesizes a TestCase from `log`.
    ///
    /// Templates whose window cannot be found (start never fires, or the end
    /// fires first) are skipped. The evaluator's condition list is the
    /// frames' start conditions, so eval point condition ids are frame
    /// indices.
    pub fn build(&self, log: &RequestLog) -> Result<TestCase, ScaffoldError> {
        // Live queries carry no data and would pollute the input sequences.
        let log = log.filter(|request| match request {
            Request::Input(input) => input.values.is_some(),
            _ => true,
        });
        let sequences = log.extract_sequences();

        let mut frames: Vec<Frame> = Vec::new();
        let mut points: BTreeMap<SignalKey, Vec<EvalPoint>> = BTreeMap::new();
        for template in &self.frame_templates {
            let Some((start_time, end_time)) = self.frame_bounds(&log, template) else {
                log::info!("frame template window not found, skipping");
                continue;
            };

            let end_condition = match &template.end {
                Some(condition) => condition.clone(),
                None => Condition::after_child(end_time - start_time, &template.start),
            };
            let inputs = self.build_inputs(
                &sequences,
                start_time,
                end_time,
                template.init_to_default,
            )?;
            frames.push(Frame::new(
                template.start.clone(),
                end_condition,
                inputs,
                template.priority,
            ));

            let condition_id = frames.len() - 1;
            for (key, new_points) in
                self.build_points(&sequences, start_time, end_time, condition_id)
            {
                points.entry(key).or_default().extend(new_points);
            }
        }

        let overall_end = Condition::all_of(frames.iter().map(|f| f.end.clone()).collect());
        let handler = RequestHandler::new(overall_end, frames, true);
        let conditions = handler.frames.iter().map(|f| f.start.clone()).collect();
        let mut evaluator = Evaluator::new(conditions, points);
        evaluator.aggregators = self.aggregators.clone();
        Ok(TestCase { handler, evaluator })
    }

    /// `(start, end)` of the template's window inside the log, or `None`
    /// when the window never opens.
    fn frame_bounds(&self, log: &RequestLog, template: &FrameTemplate) -> Option<(Time, Time)> {
        let start = log.condition_satisfied_at(&template.start)?;
        let end = match &template.end {
            Some(condition) => log.condition_satisfied_at(condition)?,
            None => log.end_time()?,
        };
        (start < end).then_some((start, end))
    }

    /// Input sequences for the window, rebased to t=0 and interpolated per
    /// channel preference.
    fn build_inputs(
        &self,
        sequences: &LogSequences,
        start_time: Time,
        end_time: Time,
        init_to_default: bool,
    ) -> Result<BTreeMap<SignalKey, Sequence<Value>>, ScaffoldError> {
        let mut inputs = BTreeMap::new();
        for (key, sequence) in sequences {
            let SignalKind::Input(_) = key.kind else {
                continue;
            };
            let mut sub: Sequence<Value> = sequence
                .subsequence(start_time, end_time, false)
                .filter_map(|value| value);
            sub.shift(-start_time);

            if sub.first_time().map_or(true, |t| t > 0) {
                let lead_in = sequence.sample_at(start_time).cloned().flatten();
                let value = if init_to_default || lead_in.is_none() {
                    self.default_values
                        .get(&pref_key(key.kind, key.channel))
                        .cloned()
                        .or(lead_in)
                        .ok_or(ScaffoldError::MissingDefault(*key))?
                } else {
                    lead_in.unwrap()
                };
                sub.insert_at(0, value);
            }

            let interpolation = self
                .interpolations
                .get(&pref_key(key.kind, key.channel))
                .copied()
                .unwrap_or(InterpolationKind::Mid);
            inputs.insert(*key, sub.interpolate(interpolation, TIME_RESOLUTION));
        }
        Ok(inputs)
    }

    /// Eval points for every de-duplicated output value observed inside the
    /// window.
    fn build_points(
        &self,
        sequences: &LogSequences,
        start_time: Time,
        end_time: Time,
        condition_id: usize,
    ) -> BTreeMap<SignalKey, Vec<EvalPoint>> {
        let mut points: BTreeMap<SignalKey, Vec<EvalPoint>> = BTreeMap::new();
        for (key, sequence) in sequences {
            let SignalKind::Output(_) = key.kind else {
                continue;
            };
            let template = self
                .point_templates
                .get(&pref_key(key.kind, key.channel))
                .cloned()
                .unwrap_or_default();

            let mut sub: Sequence<Value> = sequence
                .subsequence(start_time, end_time, false)
                .filter_map(|value| value);
            sub.shift(-start_time);
            sub.dedup();

            let times = sub.times();
            let values = sub.values();
            for (i, (&time, value)) in times.iter().zip(values).enumerate() {
                // T is the run length of this value: until the next change,
                // or until the window closes for the last one.
                let run = match times.get(i + 1) {
                    Some(&next) => next - time,
                    None => (end_time - start_time) - time,
                };
                let (start, end) = template.interval.eval(run);
                points.entry(*key).or_default().push(EvalPoint {
                    condition_id,
                    expected: value.clone(),
                    interval: (start + time, end + time),
                    check: template.check,
                    portion: template.portion,
                });
            }
        }
        points
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use signal::{Channel, InputKind, OutputKind};
    use smallvec::smallvec;
    use wire::{BatchParams, InputRequest, RequestMatcher};

    fn bound(s: &str) -> Bound {
        s.parse().unwrap()
    }

    #[test]
    fn bounds_parse_the_template_grammar() {
        assert_eq!(
            bound("0.2*T"),
            Bound {
                scale: 0.2,
                offset: 0
            }
        );
        assert_eq!(bound("150"), Bound::absolute(150));
        assert_eq!(
            bound("T"),
            Bound {
                scale: 1.0,
                offset: 0
            }
        );
        assert_eq!(
            bound("1.0*T-20"),
            Bound {
                scale: 1.0,
                offset: -20
            }
        );
        assert_eq!(
            bound("0.5*T+10"),
            Bound {
                scale: 0.5,
                offset: 10
            }
        );
        assert!("bogus".parse::<Bound>().is_err());
    }

    #[test]
    fn bound_eval_truncates() {
        assert_eq!(bound("0.2*T").eval(1000), 200);
        assert_eq!(bound("0.8*T").eval(999), 799);
        assert_eq!(bound("T-20").eval(100), 80);
    }

    /// A button-style session: "Start" is printed at t=1000, pin 6 is read
    /// every 50 ms, and pin 13 mirrors the inverted reading.
    fn button_log() -> RequestLog {
        let mut reads = Vec::new();
        reads.extend(std::iter::repeat(1).take(20));
        reads.extend(std::iter::repeat(0).take(40));
        reads.extend(std::iter::repeat(1).take(10));
        reads.extend(std::iter::repeat(0).take(10));
        reads.extend(std::iter::repeat(1).take(40));

        let mut log = RequestLog::new();
        log.append(Request::event(900, signal::EventKind::Init));
        log.append(Request::print(1000, "Start"));
        for (i, &level) in reads.iter().enumerate() {
            let t = 1000 + 50 * i as Time;
            log.append(Request::Input(InputRequest {
                timestamp: t + 1,
                kind: InputKind::DigitalRead,
                channels: smallvec![Channel::Pin(6)],
                values: Some(vec![level]),
                analog: None,
                batch: BatchParams::default(),
                response_expected: true,
            }));
            log.append(Request::digital_write(t + 2, 13, 1 - level));
        }
        log
    }

    fn button_scaffold() -> Scaffold {
        let start = Condition::when(RequestMatcher::PrintEquals("Start".into()));
        let end = Condition::after_child(5000, &start);
        let mut scaffold = Scaffold::new(vec![FrameTemplate::new(start, Some(end))]);
        scaffold.interpolations.set(
            &pref_key(InputKind::DigitalRead, Some(Channel::Pin(6))),
            InterpolationKind::Start,
        );
        scaffold.default_values.set(
            &pref_key(InputKind::DigitalRead, Some(Channel::Pin(6))),
            Value::Int(1),
        );
        scaffold
    }

    #[test]
    fn builds_one_frame_with_rebased_inputs() {
        let case = button_scaffold().build(&button_log()).unwrap();
        assert_eq!(case.handler.frames.len(), 1);

        let frame = &case.handler.frames[0];
        let key = SignalKey::new(InputKind::DigitalRead, Some(Channel::Pin(6)));
        let seq = &frame.inputs[&key];
        // The window is [1000, 6000); reads land at 1, 51, 101, ... and the
        // lead-in default fills t=0.
        assert_eq!(seq.first_time(), Some(0));
        assert_eq!(seq.sample_at(0), Some(&Value::Int(1)));
        assert_eq!(seq.sample_at(1060), Some(&Value::Int(0)));
        assert_eq!(seq.last_time(), Some(4951));
    }

    #[test]
    fn mints_points_for_deduplicated_outputs() {
        let case = button_scaffold().build(&button_log()).unwrap();
        let key = SignalKey::new(OutputKind::DigitalWrite, Some(Channel::Pin(13)));
        let points = &case.evaluator.points[&key];

        // Output runs: 0 (t=2..1002), 1 (1002..3002), 0 (3002..3502),
        // 1 (3502..4002), 0 (4002..window end).
        let expected: Vec<i64> = vec![0, 1, 0, 1, 0];
        let observed: Vec<i64> = points
            .iter()
            .map(|p| p.expected.as_int().unwrap())
            .collect();
        assert_eq!(observed, expected);

        assert_eq!(points[0].interval, (202, 802));
        assert_eq!(points[1].interval, (1402, 2602));
        assert_eq!(points[2].interval, (3102, 3402));
        assert_eq!(points[3].interval, (3602, 3902));
        // Last run is cut by the window end at relative t=5000.
        assert_eq!(points[4].interval, (4201, 4800));
        assert!(points.iter().all(|p| p.condition_id == 0));
    }

    #[test]
    fn window_skipped_when_end_precedes_start() {
        let start = Condition::when(RequestMatcher::PrintEquals("Start".into()));
        let end = Condition::when(RequestMatcher::Always);
        let scaffold = Scaffold::new(vec![FrameTemplate::new(start, Some(end))]);
        let case = scaffold.build(&button_log()).unwrap();
        assert!(case.handler.frames.is_empty());
    }

    #[test]
    fn missing_end_spans_to_the_log_and_synthesizes_a_delay() {
        let start = Condition::when(RequestMatcher::PrintEquals("Start".into()));
        let scaffold = button_scaffold_with(FrameTemplate::new(start.clone(), None));
        let case = scaffold.build(&button_log()).unwrap();
        let frame = &case.handler.frames[0];
        // The log ends at t=6952; the synthesized end is that same delay
        // hung off the start condition.
        let log = button_log();
        assert_eq!(log.condition_satisfied_at(&frame.end), Some(6952));
    }

    fn button_scaffold_with(template: FrameTemplate) -> Scaffold {
        let mut scaffold = button_scaffold();
        scaffold.frame_templates = vec![template];
        scaffold
    }

    #[test]
    fn evaluating_the_source_log_passes() {
        // The log the case was built from must satisfy the case.
        let case = button_scaffold().build(&button_log()).unwrap();
        let report = case.evaluator.evaluate(&button_log()).unwrap();
        assert!(report.passed());
    }
}
