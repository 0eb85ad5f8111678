//! End-to-end suites for the harness, plus the shared device fixtures.

#[cfg(test)]
mod live_session;

#[cfg(test)]
mod scaffold_cycle;

use assess::RequestLog;
use session::loopback::DeviceHandle;
use signal::{Channel, InputKind, Time};
use smallvec::smallvec;
use wire::{BatchParams, InputRequest, Request};

/// Queues a whole request script on the device half of a loopback link.
pub fn preload(device: &DeviceHandle, requests: &[Request]) {
    for request in requests {
        device
            .send_request(request)
            .expect("fixture requests are encodable");
    }
}

/// Collects a request script into a log, the way a session would.
pub fn log_of(requests: &[Request]) -> RequestLog {
    let mut log = RequestLog::new();
    for request in requests {
        log.append(request.clone());
    }
    log
}

/// A digital read carrying its recorded value, the way firmware under a
/// recording session reports it.
pub fn recorded_read(timestamp: Time, pin: u8, level: i64) -> Request {
    Request::Input(InputRequest {
        timestamp,
        kind: InputKind::DigitalRead,
        channels: smallvec![Channel::Pin(pin)],
        values: Some(vec![level]),
        analog: None,
        batch: BatchParams::default(),
        response_expected: true,
    })
}

/// A button-style recording: "Start" at t=1000, pin 6 sampled every 50 ms,
/// pin 13 driven to the inverted sample, running long enough to close a
/// 5-second window.
pub fn button_script() -> Vec<Request> {
    let mut levels = Vec::new();
    levels.extend(std::iter::repeat(1).take(20));
    levels.extend(std::iter::repeat(0).take(40));
    levels.extend(std::iter::repeat(1).take(10));
    levels.extend(std::iter::repeat(0).take(10));
    levels.extend(std::iter::repeat(1).take(40));

    let mut requests = vec![
        Request::event(900, signal::EventKind::Init),
        Request::print(1000, "Start"),
    ];
    for (i, &level) in levels.iter().enumerate() {
        let t = 1000 + 50 * i as Time;
        requests.push(recorded_read(t + 1, 6, level));
        requests.push(Request::digital_write(t + 2, 13, 1 - level));
    }
    requests
}
