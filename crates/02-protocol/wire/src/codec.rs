//! Byte-level translation for the serial framing.
//!
//! Frames from the device:
//!
//! ```text
//! byte   0       message code (top bit set = no response expected)
//! bytes  1..4    timestamp, u32 LE, device milliseconds
//! bytes  5..6    body length, u16 LE
//! bytes  7..     body
//! ```
//!
//! Responses back to the device use the same layout without the timestamp.
//! All multi-byte values are little-endian. Malformed bodies decode to
//! [`Request::Invalid`]; decoding never fails the session.

use smallvec::smallvec;

use signal::{
    AnalogParams, Channel, EventKind, InputKind, OutputKind, ScreenBuffer, ScreenShape, Time,
    Value, THREE_AXIS,
};

use crate::error::{CodecError, CodecResult};
use crate::message::{
    BatchParams, Channels, EventData, EventRequest, InputRequest, InvalidRequest, OutputRequest,
    Request, Response,
};

/// Length of a request frame header.
pub const HEADER_LEN: usize = 7;

const ANALOG_PARAMS_LEN: usize = 16;
const BATCH_PARAMS_LEN: usize = 6;

/// Top bit of the code byte: the device does not expect a reply.
const NO_RESPONSE_MASK: u8 = 0x80;

/// Bit 0 of the generic-input flags byte: recorded values follow.
const FLAG_VALUES: u8 = 0x01;
/// Bit 1 of the generic-input flags byte: batch params follow.
const FLAG_BATCH: u8 = 0x02;

// Semantic message codes (low 7 bits of the code byte).
const CODE_INIT: u8 = 0x00;
const CODE_PRINT: u8 = 0x01;
const CODE_DIGITAL_READ: u8 = 0x20;
const CODE_DIGITAL_WRITE: u8 = 0x21;
const CODE_ANALOG_READ: u8 = 0x22;
const CODE_ANALOG_WRITE: u8 = 0x23;
const CODE_IMU_ACC: u8 = 0x30;
const CODE_IMU_GYRO: u8 = 0x31;
const CODE_IMU_MAG: u8 = 0x32;
const CODE_SCREEN_INIT: u8 = 0x40;
const CODE_SCREEN_FULL: u8 = 0x41;
const CODE_SCREEN_TILE: u8 = 0x42;
const CODE_GPS_FIX: u8 = 0x50;
const CODE_WIFI_REQ: u8 = 0x60;
const CODE_WIFI_RESP: u8 = 0x61;

// Response codes.
const CODE_ACK: u8 = 0x80;
const CODE_ACK_COMPLETE: u8 = 0x81;
const CODE_ERROR: u8 = 0x82;
const CODE_ERROR_COMPLETE: u8 = 0x83;

/// Splits a raw header into `(code byte, raw timestamp, body length)`.
pub fn parse_header(header: &[u8; HEADER_LEN]) -> (u8, u32, u16) {
    let code = header[0];
    let timestamp = u32::from_le_bytes([header[1], header[2], header[3], header[4]]);
    let len = u16::from_le_bytes([header[5], header[6]]);
    (code, timestamp, len)
}

/// Stateful decoder/encoder for the wire protocol.
///
/// The only state is the screen: its shape arrives once via `ScreenInit` and
/// tile updates compose onto the last full buffer.
#[derive(Debug, Default)]
pub struct WireCodec {
    screen: Option<ScreenBuffer>,
}

impl WireCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forgets the screen, as if no `ScreenInit` had been seen.
    pub fn reset(&mut self) {
        self.screen = None;
    }

    /// Decodes one frame. Device timestamps are milliseconds and scale 1:1
    /// onto the internal timebase.
    pub fn decode(&mut self, code_byte: u8, raw_timestamp: u32, body: &[u8]) -> Request {
        let response_expected = code_byte & NO_RESPONSE_MASK == 0;
        let code = code_byte & !NO_RESPONSE_MASK;
        let timestamp = raw_timestamp as Time;

        let request = match code {
            CODE_INIT => Request::event(timestamp, EventKind::Init),
            CODE_PRINT => match std::str::from_utf8(body) {
                Ok(text) => Request::print(timestamp, text),
                Err(_) => invalid(timestamp),
            },
            CODE_DIGITAL_READ => match body.split_first() {
                Some((&pin, rest)) => self.decode_input(
                    InputKind::DigitalRead,
                    smallvec![Channel::Pin(pin)],
                    timestamp,
                    rest,
                ),
                None => invalid(timestamp),
            },
            CODE_DIGITAL_WRITE => {
                if body.len() < 2 {
                    invalid(timestamp)
                } else {
                    Request::digital_write(timestamp, body[0], body[1] as i64)
                }
            }
            CODE_ANALOG_READ => match body.split_first() {
                Some((&pin, rest)) => self.decode_input(
                    InputKind::AnalogRead,
                    smallvec![Channel::Pin(pin)],
                    timestamp,
                    rest,
                ),
                None => invalid(timestamp),
            },
            CODE_ANALOG_WRITE => self.decode_analog_write(timestamp, body),
            CODE_IMU_ACC => self.decode_input(
                InputKind::Accelerometer,
                THREE_AXIS.iter().copied().collect(),
                timestamp,
                body,
            ),
            CODE_IMU_GYRO => self.decode_input(
                InputKind::Gyroscope,
                THREE_AXIS.iter().copied().collect(),
                timestamp,
                body,
            ),
            CODE_IMU_MAG => self.decode_input(
                InputKind::Magnetometer,
                THREE_AXIS.iter().copied().collect(),
                timestamp,
                body,
            ),
            CODE_SCREEN_INIT => self.decode_screen_init(timestamp, body),
            CODE_SCREEN_FULL => self.decode_screen_full(timestamp, body),
            CODE_SCREEN_TILE => self.decode_screen_tile(timestamp, body),
            CODE_GPS_FIX => Request::event(timestamp, EventKind::Gps),
            CODE_WIFI_REQ => wifi_event(timestamp, "request"),
            CODE_WIFI_RESP => wifi_event(timestamp, "response"),
            _ => invalid(timestamp),
        };

        if !request.is_valid() {
            log::debug!("malformed frame: code={code:#04x} t={timestamp} len={}", body.len());
        }
        with_response_expected(request, response_expected)
    }

    /// Decodes the generic input body shared by GPIO reads and the IMU:
    /// `flags [, AnalogParams] [, BatchParams] [, values]`.
    fn decode_input(
        &self,
        kind: InputKind,
        channels: Channels,
        timestamp: Time,
        body: &[u8],
    ) -> Request {
        let Some((&flags, mut body)) = body.split_first() else {
            return invalid(timestamp);
        };
        let has_values = flags & FLAG_VALUES != 0;
        let has_batch = flags & FLAG_BATCH != 0;

        let analog = if kind.is_analog() {
            if body.len() < ANALOG_PARAMS_LEN {
                return invalid(timestamp);
            }
            let params = decode_analog_params(&body[..ANALOG_PARAMS_LEN]);
            body = &body[ANALOG_PARAMS_LEN..];
            Some(params)
        } else {
            None
        };

        let batch = if has_batch {
            if body.len() < BATCH_PARAMS_LEN {
                return invalid(timestamp);
            }
            let params = decode_batch_params(&body[..BATCH_PARAMS_LEN]);
            body = &body[BATCH_PARAMS_LEN..];
            params
        } else {
            BatchParams::default()
        };

        let values = if has_values {
            let count = channels.len() * batch.num as usize;
            let width = if kind.is_analog() { 4 } else { 1 };
            if body.len() < count * width {
                return invalid(timestamp);
            }
            let mut values = Vec::with_capacity(count);
            for i in 0..count {
                let value = if kind.is_analog() {
                    let mut bytes = [0u8; 4];
                    bytes.copy_from_slice(&body[4 * i..4 * (i + 1)]);
                    i32::from_le_bytes(bytes) as i64
                } else {
                    body[i] as i64
                };
                values.push(value);
            }
            body = &body[count * width..];
            Some(values)
        } else {
            None
        };

        if !body.is_empty() {
            return invalid(timestamp);
        }

        Request::Input(InputRequest {
            timestamp,
            kind,
            channels,
            values,
            analog,
            batch,
            response_expected: true,
        })
    }

    fn decode_analog_write(&self, timestamp: Time, body: &[u8]) -> Request {
        if body.len() < 1 + ANALOG_PARAMS_LEN + 4 {
            return invalid(timestamp);
        }
        let pin = body[0];
        let params = decode_analog_params(&body[1..1 + ANALOG_PARAMS_LEN]);
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&body[1 + ANALOG_PARAMS_LEN..1 + ANALOG_PARAMS_LEN + 4]);
        let value = i32::from_le_bytes(bytes);
        Request::Output(OutputRequest {
            timestamp,
            kind: OutputKind::AnalogWrite,
            channels: smallvec![Some(Channel::Pin(pin))],
            values: vec![Value::Int(value as i64)],
            analog: Some(params),
            response_expected: true,
        })
    }

    fn decode_screen_init(&mut self, timestamp: Time, body: &[u8]) -> Request {
        if body.len() < 2 {
            return invalid(timestamp);
        }
        if self.screen.is_some() {
            // Redundant initialization.
            return invalid(timestamp);
        }
        let shape = ScreenShape {
            width: 8 * body[0] as u16,
            height: 8 * body[1] as u16,
        };
        self.screen = Some(ScreenBuffer::new(shape.width, shape.height));
        Request::Event(EventRequest {
            timestamp,
            kind: EventKind::ScreenInit,
            data: Some(EventData::Shape(shape)),
            response_expected: true,
        })
    }

    fn decode_screen_full(&mut self, timestamp: Time, body: &[u8]) -> Request {
        let Some(previous) = self.screen.as_ref() else {
            return invalid(timestamp);
        };
        let tile_w = (previous.width() as usize + 7) / 8;
        let tile_h = (previous.height() as usize + 7) / 8;
        if body.len() < 8 * tile_w * tile_h {
            return invalid(timestamp);
        }

        // Tiles arrive row-major, rows running bottom-to-top.
        let mut screen = ScreenBuffer::new(previous.width(), previous.height());
        for ty in 0..tile_h {
            for tx in 0..tile_w {
                let start = 8 * (ty * tile_w + tx);
                let tile = decode_tile(&body[start..start + 8]);
                screen.paint(&tile, 8 * tx as u16, 8 * (tile_h - ty - 1) as u16);
            }
        }
        self.screen = Some(screen.clone());
        Request::screen(timestamp, screen)
    }

    fn decode_screen_tile(&mut self, timestamp: Time, body: &[u8]) -> Request {
        let Some(screen) = self.screen.as_mut() else {
            return invalid(timestamp);
        };
        if body.len() < 10 {
            return invalid(timestamp);
        }
        let (tx, ty) = (body[0] as u16, body[1] as u16);
        let tile = decode_tile(&body[2..10]);
        screen.paint(&tile, 8 * tx, 8 * ty);
        let composed = screen.clone();
        Request::screen(timestamp, composed)
    }

    /// Produces the device-side framing for a request, as the firmware would
    /// send it. Used by the scripted device and round-trip checks.
    pub fn encode_request(request: &Request) -> CodecResult<Vec<u8>> {
        let (code, body) = match request {
            Request::Event(event) => encode_event(event)?,
            Request::Input(input) => encode_input(input)?,
            Request::Output(output) => encode_output(output)?,
            Request::Invalid(_) => {
                return Err(CodecError::unencodable("invalid requests have no frame"))
            }
        };
        let mut code = code;
        if !request.response_expected() {
            code |= NO_RESPONSE_MASK;
        }
        if body.len() > u16::MAX as usize {
            return Err(CodecError::BodyTooLarge(body.len()));
        }

        let timestamp = request.timestamp().clamp(0, u32::MAX as Time) as u32;
        let mut frame = Vec::with_capacity(HEADER_LEN + body.len());
        frame.push(code);
        frame.extend_from_slice(&timestamp.to_le_bytes());
        frame.extend_from_slice(&(body.len() as u16).to_le_bytes());
        frame.extend_from_slice(&body);
        Ok(frame)
    }

    /// Serializes a response frame. `Silent` responses produce no bytes.
    pub fn encode_response(response: &Response) -> Vec<u8> {
        let (code, body) = match response {
            Response::Silent { .. } => return Vec::new(),
            Response::Ack { complete } => (ack_code(*complete), Vec::new()),
            Response::Error { complete } => (error_code(*complete), Vec::new()),
            Response::Values {
                values,
                analog,
                complete,
            } => {
                let mut body = Vec::new();
                for &value in values {
                    if *analog {
                        body.extend_from_slice(&(value as i32).to_le_bytes());
                    } else {
                        body.push(value as u8);
                    }
                }
                (ack_code(*complete), body)
            }
        };

        let mut frame = Vec::with_capacity(3 + body.len());
        frame.push(code);
        frame.extend_from_slice(&(body.len() as u16).to_le_bytes());
        frame.extend_from_slice(&body);
        frame
    }
}

fn ack_code(complete: bool) -> u8 {
    if complete {
        CODE_ACK_COMPLETE
    } else {
        CODE_ACK
    }
}

fn error_code(complete: bool) -> u8 {
    if complete {
        CODE_ERROR_COMPLETE
    } else {
        CODE_ERROR
    }
}

fn invalid(timestamp: Time) -> Request {
    Request::Invalid(InvalidRequest {
        timestamp,
        response_expected: true,
    })
}

fn wifi_event(timestamp: Time, direction: &str) -> Request {
    Request::Event(EventRequest {
        timestamp,
        kind: EventKind::Wifi,
        data: Some(EventData::Text(direction.to_string())),
        response_expected: true,
    })
}

fn with_response_expected(mut request: Request, response_expected: bool) -> Request {
    match &mut request {
        Request::Input(r) => r.response_expected = response_expected,
        Request::Output(r) => r.response_expected = response_expected,
        Request::Event(r) => r.response_expected = response_expected,
        Request::Invalid(r) => r.response_expected = response_expected,
    }
    request
}

fn decode_analog_params(bytes: &[u8]) -> AnalogParams {
    let read = |i: usize| {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(&bytes[4 * i..4 * (i + 1)]);
        i32::from_le_bytes(buf)
    };
    AnalogParams::new(read(0), read(1), read(2) as f64, read(3) as f64)
}

fn encode_analog_params(params: &AnalogParams) -> [u8; ANALOG_PARAMS_LEN] {
    let mut out = [0u8; ANALOG_PARAMS_LEN];
    out[0..4].copy_from_slice(&params.min_bin.to_le_bytes());
    out[4..8].copy_from_slice(&params.max_bin.to_le_bytes());
    out[8..12].copy_from_slice(&(params.min_value as i32).to_le_bytes());
    out[12..16].copy_from_slice(&(params.max_value as i32).to_le_bytes());
    out
}

fn decode_batch_params(bytes: &[u8]) -> BatchParams {
    let num = u16::from_le_bytes([bytes[0], bytes[1]]);
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[2..6]);
    let period_micros = u32::from_le_bytes(buf);
    // Wire periods are microseconds; the timebase is milliseconds.
    let period = ((period_micros as i64) + 500) / 1000;
    BatchParams::new(num, period)
}

fn encode_batch_params(batch: &BatchParams) -> [u8; BATCH_PARAMS_LEN] {
    let mut out = [0u8; BATCH_PARAMS_LEN];
    out[0..2].copy_from_slice(&batch.num.to_le_bytes());
    let period_micros = (batch.period.max(0) as u32).saturating_mul(1000);
    out[2..6].copy_from_slice(&period_micros.to_le_bytes());
    out
}

/// Decodes one 8-byte tile into an 8x8 cell. Each byte maps one column, the
/// byte order running right-to-left across the tile, with the most
/// significant bit as the top pixel.
fn decode_tile(bytes: &[u8]) -> ScreenBuffer {
    debug_assert_eq!(bytes.len(), 8);
    let mut tile = ScreenBuffer::new(8, 8);
    for (i, &byte) in bytes.iter().enumerate() {
        let x = 7 - i as u16;
        for row in 0..8u16 {
            let bit = 7 - row;
            tile.set(x, row, (byte >> bit) & 1 == 1);
        }
    }
    tile
}

fn encode_tile(tile: &ScreenBuffer) -> [u8; 8] {
    debug_assert_eq!((tile.width(), tile.height()), (8, 8));
    let mut out = [0u8; 8];
    for (i, slot) in out.iter_mut().enumerate() {
        let x = 7 - i as u16;
        for row in 0..8u16 {
            if tile.get(x, row) != 0 {
                *slot |= 1 << (7 - row);
            }
        }
    }
    out
}

fn encode_event(event: &EventRequest) -> CodecResult<(u8, Vec<u8>)> {
    let frame = match event.kind {
        EventKind::Init => (CODE_INIT, Vec::new()),
        EventKind::Print => match &event.data {
            Some(EventData::Text(text)) => (CODE_PRINT, text.as_bytes().to_vec()),
            _ => return Err(CodecError::unencodable("print event without text")),
        },
        EventKind::ScreenInit => match &event.data {
            Some(EventData::Shape(shape)) => (
                CODE_SCREEN_INIT,
                vec![(shape.width / 8) as u8, (shape.height / 8) as u8],
            ),
            _ => return Err(CodecError::unencodable("screen init event without shape")),
        },
        EventKind::Gps => (CODE_GPS_FIX, Vec::new()),
        EventKind::Wifi => match &event.data {
            Some(EventData::Text(direction)) if direction == "response" => {
                (CODE_WIFI_RESP, Vec::new())
            }
            _ => (CODE_WIFI_REQ, Vec::new()),
        },
    };
    Ok(frame)
}

fn encode_input(input: &InputRequest) -> CodecResult<(u8, Vec<u8>)> {
    let mut body = Vec::new();
    let code = match input.kind {
        InputKind::DigitalRead => CODE_DIGITAL_READ,
        InputKind::AnalogRead => CODE_ANALOG_READ,
        InputKind::Accelerometer => CODE_IMU_ACC,
        InputKind::Gyroscope => CODE_IMU_GYRO,
        InputKind::Magnetometer => CODE_IMU_MAG,
    };
    if matches!(input.kind, InputKind::DigitalRead | InputKind::AnalogRead) {
        body.push(pin_of(input.channels.first().copied())?);
    }

    let mut flags = 0u8;
    if input.values.is_some() {
        flags |= FLAG_VALUES;
    }
    let batched = input.batch != BatchParams::default();
    if batched {
        flags |= FLAG_BATCH;
    }
    body.push(flags);

    if input.kind.is_analog() {
        let params = input
            .analog
            .as_ref()
            .ok_or(CodecError::MissingAnalogParams(input.kind))?;
        body.extend_from_slice(&encode_analog_params(params));
    }
    if batched {
        body.extend_from_slice(&encode_batch_params(&input.batch));
    }
    if let Some(values) = &input.values {
        for &value in values {
            if input.kind.is_analog() {
                body.extend_from_slice(&(value as i32).to_le_bytes());
            } else {
                body.push(value as u8);
            }
        }
    }
    Ok((code, body))
}

fn encode_output(output: &OutputRequest) -> CodecResult<(u8, Vec<u8>)> {
    match output.kind {
        OutputKind::DigitalWrite => {
            let pin = pin_of(output.channels.first().copied().flatten())?;
            let value = int_value(output.values.first())?;
            Ok((CODE_DIGITAL_WRITE, vec![pin, value as u8]))
        }
        OutputKind::AnalogWrite => {
            let pin = pin_of(output.channels.first().copied().flatten())?;
            let params = output
                .analog
                .as_ref()
                .ok_or_else(|| CodecError::unencodable("analog write without analog params"))?;
            let value = int_value(output.values.first())?;
            let mut body = vec![pin];
            body.extend_from_slice(&encode_analog_params(params));
            body.extend_from_slice(&(value as i32).to_le_bytes());
            Ok((CODE_ANALOG_WRITE, body))
        }
        OutputKind::Screen => {
            let Some(Value::Screen(buffer)) = output.values.first() else {
                return Err(CodecError::unencodable("screen report without a bitmap"));
            };
            let tile_w = (buffer.width() as usize + 7) / 8;
            let tile_h = (buffer.height() as usize + 7) / 8;
            let mut body = Vec::with_capacity(8 * tile_w * tile_h);
            for ty in 0..tile_h {
                for tx in 0..tile_w {
                    let tile =
                        buffer.region(8 * tx as u16, 8 * (tile_h - ty - 1) as u16, 8, 8);
                    body.extend_from_slice(&encode_tile(&tile));
                }
            }
            Ok((CODE_SCREEN_FULL, body))
        }
    }
}

fn pin_of(channel: Option<Channel>) -> CodecResult<u8> {
    match channel {
        Some(Channel::Pin(pin)) => Ok(pin),
        other => Err(CodecError::unencodable(format!(
            "expected a pin channel, got {other:?}"
        ))),
    }
}

fn int_value(value: Option<&Value>) -> CodecResult<i64> {
    value
        .and_then(Value::as_int)
        .ok_or_else(|| CodecError::unencodable("expected an integer value"))
}
