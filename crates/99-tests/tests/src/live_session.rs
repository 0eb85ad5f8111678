//! Live-session suites: scripted device on one end of a loopback link, a
//! hand-built test case on the other.

use std::collections::BTreeMap;

use assess::{Check, EvalPoint, Evaluator, TestCase};
use pretty_assertions::assert_eq;
use script::{Condition, Frame, RequestHandler};
use session::loopback::loopback;
use session::{run_session, SessionEnd};
use signal::{Channel, InputKind, OutputKind, Sequence, SignalKey, Value};
use smallvec::smallvec;
use wire::{InputRequest, Request, RequestMatcher, Response, WireCodec};

use crate::preload;

/// The blinky case from the protocol reference: start on the first
/// "Start" print, end 5000 ms later, expect pin 13 to alternate.
fn blinky_case() -> TestCase {
    let start = Condition::when(RequestMatcher::PrintEquals("Start".into()));
    let end = Condition::after_child(5000, &start);
    let frame = Frame::new(start.clone(), end.clone(), BTreeMap::new(), 0);
    let handler = RequestHandler::new(Condition::all_of(vec![end]), vec![frame], true);

    let mut points = BTreeMap::new();
    points.insert(
        SignalKey::new(OutputKind::DigitalWrite, Some(Channel::Pin(13))),
        (0..4)
            .map(|i| EvalPoint {
                condition_id: 0,
                expected: Value::Int((1 - i % 2) as i64),
                interval: (200 + 1000 * i, 800 + 1000 * i),
                check: Check::Equal,
                portion: 1.0,
            })
            .collect(),
    );
    let evaluator = Evaluator::new(vec![start], points);
    TestCase { handler, evaluator }
}

fn blinky_script() -> Vec<Request> {
    let mut requests = vec![Request::print(1000, "Start")];
    for i in 0..7 {
        requests.push(Request::digital_write(1002 + 1000 * i, 13, 1 - i % 2));
    }
    requests
}

#[test]
fn blinky_session_runs_and_passes() {
    let (mut link, device) = loopback();
    preload(&device, &blinky_script());

    let mut case = blinky_case();
    let outcome = run_session(&mut link, &mut case.handler, None);
    assert!(matches!(outcome.end, SessionEnd::Complete));

    // The end pegs at 6000 and is realized by the write at 6002; the final
    // scripted write at 7002 never gets read.
    assert_eq!(outcome.log.len(), 7);
    assert_eq!(outcome.log.end_time(), Some(6002));

    let report = case.evaluator.evaluate(&outcome.log).unwrap();
    assert!(report.passed(), "{}", assess::description(&report));
}

#[test]
fn preempting_frame_serves_the_query_on_the_wire() {
    // Two overlapping frames; the later-started one has higher priority and
    // a different scripted level on pin 6.
    let low = Frame::new(
        Condition::after(1000),
        Condition::after(10_000),
        one_input(6, 0),
        0,
    );
    let high = Frame::new(
        Condition::after(2000),
        Condition::after(10_000),
        one_input(6, 1),
        1,
    );
    let end = Condition::after(20_000);
    let mut handler = RequestHandler::new(end, vec![low, high], true);

    let (mut link, device) = loopback();
    preload(&device, &[Request::digital_read(2500, 6)]);

    let outcome = run_session(&mut link, &mut handler, None);
    assert!(matches!(outcome.end, SessionEnd::Timeout));
    // The response on the wire carries the high-priority frame's value.
    assert_eq!(device.received_responses(), vec![(0x80, vec![1])]);
}

fn one_input(pin: u8, level: i64) -> BTreeMap<SignalKey, Sequence<Value>> {
    let mut inputs = BTreeMap::new();
    inputs.insert(
        SignalKey::new(InputKind::DigitalRead, Some(Channel::Pin(pin))),
        Sequence::from_parts(vec![0], vec![Value::Int(level)]),
    );
    inputs
}

#[test]
fn batched_query_is_answered_in_row_major_order() {
    let mut inputs = BTreeMap::new();
    inputs.insert(
        SignalKey::new(InputKind::DigitalRead, Some(Channel::Pin(5))),
        Sequence::from_parts(vec![0, 100], vec![Value::Int(0), Value::Int(1)]),
    );
    inputs.insert(
        SignalKey::new(InputKind::DigitalRead, Some(Channel::Pin(6))),
        Sequence::from_parts(vec![0], vec![Value::Int(1)]),
    );
    let frame = Frame::new(Condition::after(0), Condition::after(10_000), inputs, 0);
    let mut handler = RequestHandler::new(Condition::after(20_000), vec![frame], true);

    let query = Request::Input(InputRequest {
        timestamp: 50,
        kind: InputKind::DigitalRead,
        channels: smallvec![Channel::Pin(5), Channel::Pin(6)],
        values: None,
        analog: None,
        batch: wire::BatchParams::new(2, 100),
        response_expected: true,
    });
    let (mut link, device) = loopback();
    preload(&device, &[query]);

    run_session(&mut link, &mut handler, None);
    // Samples at relative t=50 and t=150: (p5=0, p6=1) then (p5=1, p6=1).
    assert_eq!(device.received_responses(), vec![(0x80, vec![0, 1, 1, 1])]);
}

#[test]
fn screen_outputs_survive_the_wire_and_evaluate() {
    use signal::{EventKind, ScreenBuffer, ScreenShape};
    use wire::{EventData, EventRequest};

    let mut pattern = ScreenBuffer::new(16, 8);
    for x in 4..9 {
        pattern.set(x, 3, true);
    }

    let script = vec![
        Request::Event(EventRequest {
            timestamp: 500,
            kind: EventKind::ScreenInit,
            data: Some(EventData::Shape(ScreenShape {
                width: 16,
                height: 8,
            })),
            response_expected: true,
        }),
        Request::print(1000, "Start"),
        Request::screen(1100, pattern.clone()),
        Request::digital_write(3100, 13, 0),
    ];

    let start = Condition::when(RequestMatcher::PrintEquals("Start".into()));
    let end = Condition::after_child(2000, &start);
    let mut handler = RequestHandler::new(end, Vec::new(), true);

    let mut points = BTreeMap::new();
    points.insert(
        SignalKey::new(OutputKind::Screen, None),
        vec![EvalPoint {
            condition_id: 0,
            expected: Value::Screen(pattern.clone()),
            interval: (100, 900),
            check: Check::Equal,
            portion: 1.0,
        }],
    );
    let evaluator = Evaluator::new(vec![start], points);

    let (mut link, device) = loopback();
    preload(&device, &script);
    let outcome = run_session(&mut link, &mut handler, None);
    assert!(matches!(outcome.end, SessionEnd::Complete));

    // The composed screen in the log equals the one the device painted.
    let sequences = outcome.log.extract_sequences();
    let key = SignalKey::new(OutputKind::Screen, None);
    assert_eq!(
        sequences[&key].sample_at(1100),
        Some(&Some(Value::Screen(pattern)))
    );

    let report = evaluator.evaluate(&outcome.log).unwrap();
    assert!(report.passed(), "{}", assess::description(&report));
}

#[test]
fn responses_frame_exactly_as_the_codec_says() {
    let response = Response::values(vec![-2, 300], true);
    let frame = WireCodec::encode_response(&response);
    assert_eq!(frame[0], 0x80);
    assert_eq!(u16::from_le_bytes([frame[1], frame[2]]), 8);
    assert_eq!(&frame[3..7], &(-2i32).to_le_bytes());
    assert_eq!(&frame[7..11], &300i32.to_le_bytes());
}
