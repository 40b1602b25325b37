//! Serial link to the device
//!
//! Wraps a `serialport` handle opened with the standard Arduino settings
//! (8 data bits, no parity, one stop bit, no flow control) behind a small
//! line-oriented trait so the session can be driven by a scripted link in tests.

use std::io::{self, BufRead, BufReader, Write};
use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use thiserror::Error;
use tracing::debug;

/// Read and write timeout applied to every port operation
pub const LINK_TIMEOUT: Duration = Duration::from_millis(5000);

#[derive(Error, Debug)]
pub enum LinkError {
    #[error("Failed to open serial port {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: serialport::Error,
    },

    #[error("Timed out waiting for data")]
    Timeout,

    #[error("Serial port closed by the device")]
    Disconnected,

    #[error("Serial I/O error: {0}")]
    Io(#[source] io::Error),
}

impl From<io::Error> for LinkError {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::TimedOut {
            LinkError::Timeout
        } else {
            LinkError::Io(e)
        }
    }
}

impl LinkError {
    /// What went wrong, without the port name an `Open` error is prefixed with
    pub fn cause(&self) -> String {
        match self {
            LinkError::Open { source, .. } => source.to_string(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LinkError>;

/// Line-oriented access to a serial device
pub trait SerialLink {
    /// Block until one full line arrives, returning it with its `\n` terminator
    fn read_line(&mut self) -> Result<Vec<u8>>;

    /// Send a command string as-is (no terminator is appended)
    fn write_command(&mut self, command: &str) -> Result<()>;
}

/// A real serial port
pub struct SerialPortLink {
    name: String,
    reader: BufReader<Box<dyn SerialPort>>,
    /// Bytes of a line that was cut short by a timeout
    pending: Vec<u8>,
}

impl SerialLink for SerialPortLink {
    fn read_line(&mut self) -> Result<Vec<u8>> {
        read_line_into(&mut self.reader, &mut self.pending)
    }

    fn write_command(&mut self, command: &str) -> Result<()> {
        let port = self.reader.get_mut();
        port.write_all(command.as_bytes())?;
        port.flush()?;
        debug!("Wrote {} bytes to {}", command.len(), self.name);
        Ok(())
    }
}

/// Open `name` at `baud_rate` with the fixed framing and timeouts
pub fn open_port(name: &str, baud_rate: u32) -> Result<SerialPortLink> {
    let port = serialport::new(name, baud_rate)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .timeout(LINK_TIMEOUT)
        .open()
        .map_err(|source| LinkError::Open {
            port: name.to_string(),
            source,
        })?;

    debug!("Opened {} at {} baud", name, baud_rate);

    Ok(SerialPortLink {
        name: name.to_string(),
        reader: BufReader::new(port),
        pending: Vec::new(),
    })
}

/// Names of the serial ports the OS currently reports
pub fn available_ports() -> Vec<String> {
    match serialport::available_ports() {
        Ok(ports) => ports.into_iter().map(|p| p.port_name).collect(),
        Err(e) => {
            debug!("Port enumeration failed: {}", e);
            Vec::new()
        }
    }
}

/// Read up to and including the next `\n`.
///
/// On timeout the partial line stays in `pending` and is completed by the
/// next call. End of stream with nothing buffered is a disconnect; end of
/// stream after a partial line yields that partial line.
fn read_line_into<R: BufRead>(reader: &mut R, pending: &mut Vec<u8>) -> Result<Vec<u8>> {
    match reader.read_until(b'\n', pending) {
        Ok(0) if pending.is_empty() => Err(LinkError::Disconnected),
        Ok(_) => Ok(std::mem::take(pending)),
        Err(e) => Err(e.into()),
    }
}
