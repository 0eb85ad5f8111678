//! Serial transport: 8-N-1 at a configurable baud.

use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use serialport::SerialPort;

use crate::link::{Link, LinkError, LinkRead};

/// A serial port without a timeout still needs one internally; pick one long
/// enough to look like "blocking forever" to firmware timescales.
const NO_TIMEOUT: Duration = Duration::from_secs(60 * 60 * 24);

/// Exclusive handle on the device's serial port.
pub struct SerialLink {
    port: Box<dyn SerialPort>,
}

impl SerialLink {
    pub fn open(path: &str, baud: u32) -> Result<Self, LinkError> {
        let port = serialport::new(path, baud)
            .timeout(NO_TIMEOUT)
            .open()
            .map_err(|err| LinkError::Open(err.to_string()))?;
        log::info!("opened {path} at {baud} baud");
        Ok(Self { port })
    }
}

impl Link for SerialLink {
    fn set_timeout(&mut self, timeout: Option<Duration>) -> Result<(), LinkError> {
        self.port
            .set_timeout(timeout.unwrap_or(NO_TIMEOUT))
            .map_err(|err| LinkError::Open(err.to_string()))
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<LinkRead, LinkError> {
        match self.port.read_exact(buf) {
            Ok(()) => Ok(LinkRead::Filled),
            Err(err)
                if matches!(
                    err.kind(),
                    ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::UnexpectedEof
                ) =>
            {
                Ok(LinkRead::Closed)
            }
            Err(err) => Err(err.into()),
        }
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        let written = self.port.write(bytes)?;
        if written != bytes.len() {
            return Err(LinkError::ShortWrite {
                written,
                expected: bytes.len(),
            });
        }
        Ok(())
    }
}
