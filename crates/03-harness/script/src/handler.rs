//! Multi-frame scheduler.

use serde::{Deserialize, Serialize};

use signal::{pref_key, Preferences, Time, Value};
use wire::{InputRequest, Request, RequestMatcher, Response};

use crate::condition::{Condition, SharedCondition};
use crate::frame::Frame;
use crate::stock;

/// Dispatches each incoming request: updates every frame and the session end
/// condition, then answers input queries from the currently scheduled frame
/// (falling back to the default-value table), acks everything else.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RequestHandler {
    pub end_condition: SharedCondition,
    pub frames: Vec<Frame>,
    /// Among equal-priority active frames, prefer the most recently started
    /// one. Disabling this lets long-running background frames keep serving.
    pub preempt: bool,
    pub default_values: Preferences<Value>,
}

impl PartialEq for RequestHandler {
    fn eq(&self, other: &Self) -> bool {
        self.end_condition == other.end_condition
            && self.frames == other.frames
            && self.preempt == other.preempt
            && self.default_values == other.default_values
    }
}

impl RequestHandler {
    pub fn new(end_condition: SharedCondition, frames: Vec<Frame>, preempt: bool) -> Self {
        Self {
            end_condition,
            frames,
            preempt,
            default_values: stock::default_input_values(),
        }
    }

    /// Blank handler for recording sessions: never completes, owns no
    /// frames, serves every input from the default table.
    pub fn endless() -> Self {
        Self::new(Condition::when(RequestMatcher::Never), Vec::new(), true)
    }

    /// Processes one request and produces the response to put on the wire.
    pub fn update(&mut self, request: &Request) -> Response {
        for frame in &mut self.frames {
            frame.update(request);
        }

        let mut response = match request {
            Request::Invalid(_) => Response::error(),
            // Recorded values in a live session are not trusted; the query
            // is served as if it carried none.
            Request::Input(input) => self.input_response(input),
            _ => Response::ack(),
        };

        self.end_condition.update(request);
        // Errors end the session, so they report complete as well.
        response.set_complete(self.end_condition.is_satisfied() || response.is_error());

        if !request.response_expected() && !response.is_error() {
            response = Response::Silent {
                complete: response.complete(),
            };
        }
        response
    }

    /// Index of the frame scheduled to serve input queries right now.
    ///
    /// Among active frames, the highest priority wins; ties break by start
    /// time, latest first under preemption, earliest otherwise.
    pub fn current_frame(&self) -> Option<usize> {
        let mut active: Vec<(usize, i32, Time)> = self
            .frames
            .iter()
            .enumerate()
            .filter(|(_, frame)| frame.is_active())
            .map(|(i, frame)| (i, frame.priority, frame.start_time().unwrap_or(0)))
            .collect();
        if active.is_empty() {
            return None;
        }
        let top = active.iter().map(|&(_, priority, _)| priority).max()?;
        active.retain(|&(_, priority, _)| priority == top);
        active.sort_by_key(|&(_, _, start)| start);
        let chosen = if self.preempt {
            active.last()
        } else {
            active.first()
        };
        chosen.map(|&(index, _, _)| index)
    }

    fn input_response(&self, input: &InputRequest) -> Response {
        if let Some(index) = self.current_frame() {
            let response = self.frames[index].get_response(input);
            if !response.is_error() {
                return response;
            }
            log::debug!(
                "frame {index} could not serve {:?} at t={}, using defaults",
                input.kind,
                input.timestamp
            );
        }
        self.default_response(input)
    }

    fn default_response(&self, input: &InputRequest) -> Response {
        let mut values = Vec::with_capacity(input.batch.num as usize * input.channels.len());
        for _sample in 0..input.batch.num {
            for &channel in &input.channels {
                let default = self
                    .default_values
                    .get(&pref_key(input.kind, Some(channel)));
                let Some(default) = default else {
                    return Response::error();
                };
                let encoded = match &input.analog {
                    Some(params) => default.as_real().map(|v| params.to_bin(v) as i64),
                    None => default.as_int(),
                };
                let Some(encoded) = encoded else {
                    return Response::error();
                };
                values.push(encoded);
            }
        }
        Response::values(values, input.analog.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use signal::{AnalogParams, Channel, EventKind, InputKind, Sequence, SignalKey};
    use smallvec::smallvec;
    use std::collections::BTreeMap;
    use wire::BatchParams;

    fn constant_frame(start: Time, end: Time, value: f64, priority: i32) -> Frame {
        let mut inputs = BTreeMap::new();
        inputs.insert(
            SignalKey::new(InputKind::AnalogRead, Some(Channel::Pin(0))),
            Sequence::from_parts(vec![0], vec![Value::Real(value)]),
        );
        Frame::new(
            Condition::after(start),
            Condition::after(end),
            inputs,
            priority,
        )
    }

    fn handler() -> RequestHandler {
        let frames = vec![
            constant_frame(100, 1200, 0.0, 0),
            constant_frame(200, 1100, 1.0, 0),
            constant_frame(300, 1000, 2.0, 1),
        ];
        RequestHandler::new(Condition::after(2000), frames, true)
    }

    fn analog_query(timestamp: Time, pin: u8) -> Request {
        Request::Input(InputRequest {
            timestamp,
            kind: InputKind::AnalogRead,
            channels: smallvec![Channel::Pin(pin)],
            values: None,
            analog: Some(AnalogParams::new(-128, 127, 0.0, 5.0)),
            batch: BatchParams::default(),
            response_expected: true,
        })
    }

    #[test]
    fn acks_outputs_and_errors_invalid() {
        let mut handler = handler();
        let response = handler.update(&Request::digital_write(0, 13, 1));
        assert_eq!(response, Response::Ack { complete: false });

        let response = handler.update(&Request::Invalid(wire::InvalidRequest {
            timestamp: 1,
            response_expected: true,
        }));
        // Errors end the session, so the complete bit rides along.
        assert_eq!(response, Response::Error { complete: true });
    }

    #[test]
    fn silent_when_no_response_expected() {
        let mut handler = handler();
        let mut write = Request::digital_write(0, 13, 1);
        if let Request::Output(output) = &mut write {
            output.response_expected = false;
        }
        assert_eq!(
            handler.update(&write),
            Response::Silent { complete: false }
        );
    }

    #[test]
    fn defaults_serve_when_no_frame_is_active() {
        let mut handler = handler();
        // t=50: nothing started yet; AnalogRead default 0.0 -> bin -128.
        let response = handler.update(&analog_query(50, 0));
        assert_eq!(response, Response::values(vec![-128], true));
    }

    #[test]
    fn defaults_serve_when_frame_lacks_the_channel() {
        let mut handler = handler();
        let response = handler.update(&analog_query(150, 1));
        assert_eq!(response, Response::values(vec![-128], true));

        // A per-channel default overrides the per-kind one.
        handler.default_values.set(
            &pref_key(InputKind::AnalogRead, Some(Channel::Pin(1))),
            Value::Real(5.0),
        );
        let response = handler.update(&analog_query(151, 1));
        assert_eq!(response, Response::values(vec![127], true));
    }

    #[test]
    fn scheduling_follows_priority_and_preemption() {
        let mut handler = handler();

        handler.update(&Request::event(150, EventKind::Init));
        assert_eq!(handler.current_frame(), Some(0));

        handler.update(&Request::event(250, EventKind::Init));
        assert_eq!(handler.current_frame(), Some(1));

        handler.preempt = false;
        handler.update(&Request::event(251, EventKind::Init));
        assert_eq!(handler.current_frame(), Some(0));

        // Priority beats start order either way.
        handler.update(&Request::event(350, EventKind::Init));
        assert_eq!(handler.current_frame(), Some(2));

        // Frame 2 completes at t=1000; frame 0 is the earliest still active.
        handler.update(&Request::event(1050, EventKind::Init));
        assert_eq!(handler.current_frame(), Some(0));

        handler.update(&Request::event(1250, EventKind::Init));
        assert_eq!(handler.current_frame(), None);
    }

    #[test]
    fn preemption_serves_the_higher_priority_frame() {
        // Two frames both in progress at t=2500: the earlier-started one has
        // priority 0, the later-started one priority 1.
        let frames = vec![
            constant_frame(1000, 10_000, 0.0, 0),
            constant_frame(2000, 10_000, 5.0, 1),
        ];
        let mut handler = RequestHandler::new(Condition::after(20_000), frames, true);
        let response = handler.update(&analog_query(2500, 0));
        assert_eq!(response, Response::values(vec![127], true));
        assert_eq!(handler.current_frame(), Some(1));
    }

    #[test]
    fn frame_values_convert_through_the_request_params() {
        let mut handler = handler();
        handler.update(&Request::event(150, EventKind::Init));
        let response = handler.update(&analog_query(160, 0));
        // Frame 0 scripts 0.0 volts -> bin -128.
        assert_eq!(response, Response::values(vec![-128], true));

        handler.update(&Request::event(350, EventKind::Init));
        let response = handler.update(&analog_query(360, 0));
        // Frame 2 scripts 2.0 volts.
        let expected_bin = AnalogParams::new(-128, 127, 0.0, 5.0).to_bin(2.0) as i64;
        assert_eq!(response, Response::values(vec![expected_bin], true));
    }

    #[test]
    fn session_completes_with_the_end_condition() {
        let mut handler = handler();
        let response = handler.update(&Request::digital_write(2150, 13, 1));
        assert_eq!(response, Response::Ack { complete: true });
    }

    #[test]
    fn endless_handler_never_completes() {
        let mut handler = RequestHandler::endless();
        let response = handler.update(&Request::digital_write(1_000_000, 13, 1));
        assert_eq!(response, Response::Ack { complete: false });
        // Inputs are served from the stock defaults so the firmware keeps
        // running while being recorded.
        let response = handler.update(&Request::digital_read(1_000_001, 6));
        assert_eq!(response, Response::values(vec![0], false));
    }
}
