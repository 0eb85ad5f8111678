//! Append-only request log.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use script::SharedCondition;
use signal::{Sequence, SignalKey, Time, Value};
use wire::{EventData, Request};

/// Every request of one session, in wire-arrival order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestLog {
    requests: Vec<Request>,
}

/// Per-channel sequences extracted from a log. Samples are `None` where a
/// live query was logged without data.
pub type LogSequences = BTreeMap<SignalKey, Sequence<Option<Value>>>;

impl RequestLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, request: Request) {
        self.requests.push(request);
    }

    pub fn requests(&self) -> &[Request] {
        &self.requests
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Timestamp of the last request.
    pub fn end_time(&self) -> Option<Time> {
        self.requests.last().map(Request::timestamp)
    }

    /// Log containing only the requests the predicate keeps.
    pub fn filter(&self, mut keep: impl FnMut(&Request) -> bool) -> RequestLog {
        RequestLog {
            requests: self.requests.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }

    /// Expands the log into per-(kind, channel) sequences.
    ///
    /// Batched requests spread across `num` timestamps `period` apart.
    /// Values carried with analog params are converted from bins back into
    /// real values; live queries contribute `None` samples.
    pub fn extract_sequences(&self) -> LogSequences {
        let mut sequences = LogSequences::new();
        let mut add = |key: SignalKey, time: Time, value: Option<Value>| {
            sequences.entry(key).or_default().push(time, value);
        };

        for request in &self.requests {
            match request {
                Request::Invalid(_) => {}
                Request::Event(event) => {
                    let value = match &event.data {
                        Some(EventData::Text(text)) => Some(Value::Text(text.clone())),
                        _ => None,
                    };
                    add(SignalKey::new(event.kind, None), event.timestamp, value);
                }
                Request::Output(output) => {
                    for (channel, value) in output.channels.iter().zip(&output.values) {
                        let converted = match (&output.analog, value.as_int()) {
                            (Some(params), Some(bin)) => {
                                Value::Real(params.to_value(bin as i32))
                            }
                            _ => value.clone(),
                        };
                        add(
                            SignalKey::new(output.kind, *channel),
                            output.timestamp,
                            Some(converted),
                        );
                    }
                }
                Request::Input(input) => {
                    let width = input.channels.len();
                    for sample in 0..input.batch.num as usize {
                        let time = input.timestamp + sample as Time * input.batch.period;
                        for (i, &channel) in input.channels.iter().enumerate() {
                            let value = input.values.as_ref().map(|values| {
                                let raw = values[sample * width + i];
                                match &input.analog {
                                    Some(params) => Value::Real(params.to_value(raw as i32)),
                                    None => Value::Int(raw),
                                }
                            });
                            add(SignalKey::new(input.kind, Some(channel)), time, value);
                        }
                    }
                }
            }
        }
        sequences
    }

    /// Replays the log against a fresh clone of `condition` and reports when
    /// it became satisfied. The live tree is untouched.
    pub fn condition_satisfied_at(&self, condition: &SharedCondition) -> Option<Time> {
        let replay = condition.reset_clone();
        for request in &self.requests {
            replay.update(request);
            if let Some(t) = replay.satisfied_at() {
                return Some(t);
            }
        }
        None
    }
}
