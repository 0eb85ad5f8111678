//! In-memory duplex link for driving sessions without hardware.
//!
//! The device half queues pre-framed requests; the host half is a [`Link`]
//! the session driver consumes. Responses accumulate on the device half for
//! later inspection.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use wire::{CodecResult, Request, WireCodec};

use crate::link::{Link, LinkError, LinkRead};

/// Host half of the duplex; hand this to the session driver.
pub struct LoopbackLink {
    inbound: Arc<Mutex<VecDeque<u8>>>,
    outbound: Arc<Mutex<Vec<u8>>>,
}

/// Device half of the duplex; the test script talks through this.
#[derive(Clone)]
pub struct DeviceHandle {
    inbound: Arc<Mutex<VecDeque<u8>>>,
    outbound: Arc<Mutex<Vec<u8>>>,
}

/// Builds a connected pair.
pub fn loopback() -> (LoopbackLink, DeviceHandle) {
    let inbound = Arc::new(Mutex::new(VecDeque::new()));
    let outbound = Arc::new(Mutex::new(Vec::new()));
    (
        LoopbackLink {
            inbound: Arc::clone(&inbound),
            outbound: Arc::clone(&outbound),
        },
        DeviceHandle { inbound, outbound },
    )
}

impl DeviceHandle {
    /// Queues raw bytes as if the device had sent them.
    pub fn send_bytes(&self, bytes: &[u8]) {
        self.inbound.lock().extend(bytes.iter().copied());
    }

    /// Frames and queues a request.
    pub fn send_request(&self, request: &Request) -> CodecResult<()> {
        let frame = WireCodec::encode_request(request)?;
        self.send_bytes(&frame);
        Ok(())
    }

    /// Everything the host has written so far.
    pub fn received_bytes(&self) -> Vec<u8> {
        self.outbound.lock().clone()
    }

    /// Splits the host's output back into `(code, body)` response frames.
    pub fn received_responses(&self) -> Vec<(u8, Vec<u8>)> {
        let bytes = self.received_bytes();
        let mut responses = Vec::new();
        let mut offset = 0;
        while offset + 3 <= bytes.len() {
            let code = bytes[offset];
            let len = u16::from_le_bytes([bytes[offset + 1], bytes[offset + 2]]) as usize;
            let body = bytes[offset + 3..offset + 3 + len].to_vec();
            responses.push((code, body));
            offset += 3 + len;
        }
        responses
    }
}

impl Link for LoopbackLink {
    fn set_timeout(&mut self, _timeout: Option<Duration>) -> Result<(), LinkError> {
        Ok(())
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<LinkRead, LinkError> {
        let mut inbound = self.inbound.lock();
        if inbound.len() < buf.len() {
            // An empty queue is the loopback's end of session.
            return Ok(LinkRead::Closed);
        }
        for slot in buf.iter_mut() {
            *slot = inbound.pop_front().expect("length checked");
        }
        Ok(LinkRead::Filled)
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        self.outbound.lock().extend_from_slice(bytes);
        Ok(())
    }
}
