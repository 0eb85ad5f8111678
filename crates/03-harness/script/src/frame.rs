//! A single scripted timeline.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use signal::{Sequence, SignalKey, Time, Value};
use wire::{InputRequest, Request, Response};

use crate::condition::SharedCondition;

/// Lifecycle of a frame.
///
/// `Avoided` is a dead end: the end condition fired before the start
/// condition ever did, so the timeline can never run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameStatus {
    NotBegun,
    InProgress,
    Complete,
    Avoided,
}

/// One scripted timeline, active between its start and end conditions and
/// owning the input sequences it can replay.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Frame {
    pub start: SharedCondition,
    pub end: SharedCondition,
    pub inputs: BTreeMap<SignalKey, Sequence<Value>>,
    pub priority: i32,
    #[serde(skip, default = "default_status")]
    status: FrameStatus,
    #[serde(skip)]
    start_time: Option<Time>,
}

fn default_status() -> FrameStatus {
    FrameStatus::NotBegun
}

impl PartialEq for Frame {
    fn eq(&self, other: &Self) -> bool {
        self.start == other.start
            && self.end == other.end
            && self.inputs == other.inputs
            && self.priority == other.priority
    }
}

impl Frame {
    pub fn new(
        start: SharedCondition,
        end: SharedCondition,
        inputs: BTreeMap<SignalKey, Sequence<Value>>,
        priority: i32,
    ) -> Self {
        Self {
            start,
            end,
            inputs,
            priority,
            status: FrameStatus::NotBegun,
            start_time: None,
        }
    }

    pub fn status(&self) -> FrameStatus {
        self.status
    }

    /// Device time at which the frame went `InProgress`.
    pub fn start_time(&self) -> Option<Time> {
        self.start_time
    }

    pub fn is_active(&self) -> bool {
        self.status == FrameStatus::InProgress
    }

    /// Advances both conditions and recomputes the status. Conditions are
    /// monotone, so the status can only move forward through the machine.
    pub fn update(&mut self, request: &Request) {
        self.start.update(request);
        self.start_time = self.start.satisfied_at();
        self.end.update(request);

        let started = self.start.is_satisfied();
        let ended = self.end.is_satisfied();
        self.status = match (started, ended) {
            (true, true) => FrameStatus::Complete,
            (true, false) => FrameStatus::InProgress,
            (false, true) => FrameStatus::Avoided,
            (false, false) => FrameStatus::NotBegun,
        };
    }

    /// Answers an input query from the scripted sequences.
    ///
    /// Sample times are relative to the frame's start. Values come back in
    /// row-major `(sample, channel)` order; any missing sample fails the
    /// whole query.
    pub fn get_response(&self, input: &InputRequest) -> Response {
        if !self.is_active() {
            return Response::error();
        }
        let Some(start_time) = self.start_time else {
            return Response::error();
        };
        let relative = input.timestamp - start_time;
        let num = input.batch.num as usize;

        let mut per_channel = Vec::with_capacity(input.channels.len());
        for &channel in &input.channels {
            let key = SignalKey::new(input.kind, Some(channel));
            let series = self
                .inputs
                .get(&key)
                .and_then(|seq| seq.sample_series(relative, num, input.batch.period));
            let Some(series) = series else {
                return Response::error();
            };
            let mut encoded = Vec::with_capacity(series.len());
            for value in &series {
                let bin = match &input.analog {
                    Some(params) => value.as_real().map(|v| params.to_bin(v) as i64),
                    None => value.as_int(),
                };
                let Some(bin) = bin else {
                    return Response::error();
                };
                encoded.push(bin);
            }
            per_channel.push(encoded);
        }

        let mut values = Vec::with_capacity(num * per_channel.len());
        for sample in 0..num {
            for channel in &per_channel {
                values.push(channel[sample]);
            }
        }
        Response::values(values, input.analog.is_some())
    }
}
