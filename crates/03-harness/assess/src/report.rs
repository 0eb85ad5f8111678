//! Text rendering of evaluation results.

use std::fmt::Write;

use signal::{Channel, SignalKey, SignalKind, Value};

use crate::evaluator::{EvalReport, PointReport};

fn verdict(passed: bool) -> &'static str {
    if passed {
        "PASS"
    } else {
        "FAIL"
    }
}

fn format_key(key: &SignalKey) -> String {
    let kind = match key.kind {
        SignalKind::Input(kind) => format!("{kind:?}"),
        SignalKind::Output(kind) => format!("{kind:?}"),
        SignalKind::Event(kind) => format!("{kind:?} event"),
    };
    match key.channel {
        Some(Channel::Pin(pin)) => format!("{kind} pin {pin}"),
        Some(Channel::Axis(axis)) => format!("{kind} axis {axis:?}"),
        None => kind,
    }
}

fn format_observed(value: Option<&Value>) -> String {
    match value {
        Some(value) => value.to_string(),
        None => "<undefined>".to_string(),
    }
}

fn write_point(out: &mut String, report: &PointReport) {
    let point = &report.point;
    let _ = write!(
        out,
        "  [{}] expected {} in [{}, {}] ({}), portion {:.2}",
        verdict(report.passed),
        point.expected,
        point.interval.0,
        point.interval.1,
        point.check,
        point.portion,
    );
    if report.observed.is_empty() {
        out.push_str(" - condition never fired\n");
        return;
    }
    out.push_str("\n    observed:");
    for entry in &report.observed {
        let _ = write!(
            out,
            " {} ({:.0}%)",
            format_observed(entry.value.as_ref()),
            entry.fraction * 100.0
        );
    }
    out.push('\n');
}

/// Full result tree: conditions, then every channel and point with its
/// observed profile.
pub fn description(report: &EvalReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Overall: {}", verdict(report.passed()));
    if !report.conditions.is_empty() {
        out.push_str("Conditions:\n");
        for (id, condition) in report.conditions.iter().enumerate() {
            match condition.satisfied_at {
                Some(t) => {
                    let _ = writeln!(out, "  [{id}] satisfied at {t}: {}", condition.description);
                }
                None => {
                    let _ = writeln!(out, "  [{id}] never satisfied: {}", condition.description);
                }
            }
        }
    }
    for (key, channel) in &report.channels {
        let _ = writeln!(out, "[{}] {}", verdict(channel.passed), format_key(key));
        for point in &channel.points {
            write_point(&mut out, point);
        }
    }
    out
}

/// One line per channel plus the overall verdict.
pub fn brief_description(report: &EvalReport) -> String {
    let mut out = String::new();
    for (key, channel) in &report.channels {
        let passing = channel.points.iter().filter(|p| p.passed).count();
        let _ = writeln!(
            out,
            "[{}] {} ({passing}/{} points)",
            verdict(channel.passed),
            format_key(key),
            channel.points.len(),
        );
    }
    let _ = writeln!(out, "Overall: {}", verdict(report.passed()));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::{ChannelReport, Check, EvalPoint};
    use signal::{OutputKind, ProfileEntry};

    fn sample_report() -> EvalReport {
        let point = EvalPoint {
            condition_id: 0,
            expected: Value::Int(1),
            interval: (200, 800),
            check: Check::Equal,
            portion: 1.0,
        };
        let mut report = EvalReport::default();
        report.conditions.push(crate::evaluator::ConditionOutcome {
            description: "print of \"Start\"".to_string(),
            satisfied_at: Some(1000),
        });
        report.channels.insert(
            SignalKey::new(OutputKind::DigitalWrite, Some(Channel::Pin(13))),
            ChannelReport {
                passed: true,
                points: vec![PointReport {
                    point,
                    passed: true,
                    observed: vec![ProfileEntry {
                        value: Some(Value::Int(1)),
                        fraction: 1.0,
                    }],
                }],
            },
        );
        report
    }

    #[test]
    fn description_contains_the_tree() {
        let text = description(&sample_report());
        assert!(text.starts_with("Overall: PASS"));
        assert!(text.contains("[0] satisfied at 1000: print of \"Start\""));
        assert!(text.contains("[PASS] DigitalWrite pin 13"));
        assert!(text.contains("expected 1 in [200, 800] (equal)"));
        assert!(text.contains("observed: 1 (100%)"));
    }

    #[test]
    fn brief_is_one_line_per_channel() {
        let text = brief_description(&sample_report());
        assert_eq!(
            text,
            "[PASS] DigitalWrite pin 13 (1/1 points)\nOverall: PASS\n"
        );
    }
}
