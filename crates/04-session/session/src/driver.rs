//! The interactive session loop.

use std::time::Duration;

use assess::RequestLog;
use script::RequestHandler;
use signal::EventKind;
use wire::{parse_header, EventData, Request, WireCodec, HEADER_LEN};

use crate::link::{Link, LinkError, LinkRead};

/// Why the session ended.
#[derive(Debug)]
pub enum SessionEnd {
    /// A response carried the complete bit.
    Complete,
    /// The handler answered with an error.
    HandlerError,
    /// Read timeout or short read.
    Timeout,
    /// The transport failed outright.
    Transport(LinkError),
}

/// A finished session: the accumulated log survives every kind of ending.
#[derive(Debug)]
pub struct SessionOutcome {
    pub log: RequestLog,
    pub end: SessionEnd,
}

/// Runs one session: read a request, update the handler, write the response,
/// until the handler completes, errors, or the transport goes quiet.
pub fn run_session(
    link: &mut dyn Link,
    handler: &mut RequestHandler,
    timeout: Option<Duration>,
) -> SessionOutcome {
    let mut codec = WireCodec::new();
    let mut log = RequestLog::new();

    if let Err(err) = link.set_timeout(timeout) {
        return SessionOutcome {
            log,
            end: SessionEnd::Transport(err),
        };
    }
    log::info!("session started");

    let end = loop {
        let mut header = [0u8; HEADER_LEN];
        match link.read_exact(&mut header) {
            Ok(LinkRead::Filled) => {}
            Ok(LinkRead::Closed) => break SessionEnd::Timeout,
            Err(err) => break SessionEnd::Transport(err),
        }
        let (code, raw_timestamp, body_len) = parse_header(&header);
        let mut body = vec![0u8; body_len as usize];
        match link.read_exact(&mut body) {
            Ok(LinkRead::Filled) => {}
            Ok(LinkRead::Closed) => break SessionEnd::Timeout,
            Err(err) => break SessionEnd::Transport(err),
        }

        let request = codec.decode(code, raw_timestamp, &body);
        if let Request::Event(event) = &request {
            if event.kind == EventKind::Print {
                if let Some(EventData::Text(text)) = &event.data {
                    log::info!("device: {text}");
                }
            }
        }
        log::debug!("request: {request:?}");
        log.append(request.clone());

        let response = handler.update(&request);
        log::debug!("response: {response:?}");

        let frame = WireCodec::encode_response(&response);
        if !frame.is_empty() {
            if let Err(err) = link.write_all(&frame) {
                break SessionEnd::Transport(err);
            }
        }

        if response.is_error() {
            log::warn!("handler errored on {request:?}");
            break SessionEnd::HandlerError;
        }
        if response.complete() {
            break SessionEnd::Complete;
        }
    };

    log::info!("session over: {} requests", log.len());
    SessionOutcome { log, end }
}
