//! Logger session
//!
//! Drives one run against a device: handshake, startup commands, then the
//! logging loop until the device goes quiet, fails, or the user cancels.
//! The session owns the link, so the port is released whenever the session
//! is dropped, whichever step it stopped at.

use std::fmt::Display;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use super::clock::{general_date_time, long_time, Clock};
use super::link::{self, LinkError, SerialLink, SerialPortLink};
use super::logfile::{format_line, log_path, LogFile};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Failed to parse the provided baud rate")]
    InvalidBaudRate,

    #[error("Failed to open serial port {port}")]
    PortOpen {
        port: String,
        #[source]
        source: LinkError,
    },

    #[error("Timed out attempting to communicate with the arduino on {port} at {baud_rate} baud with standard settings")]
    HandshakeTimeout { port: String, baud_rate: u32 },

    #[error("Failed to communicate with the arduino on {port}: {source}")]
    Handshake {
        port: String,
        #[source]
        source: LinkError,
    },

    #[error("Failed to send command {command:?} to {port}")]
    CommandWrite {
        port: String,
        command: String,
        #[source]
        source: LinkError,
    },

    #[error("Failed to write log file {}", .path.display())]
    LogFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Console I/O failed: {0}")]
    Console(#[source] io::Error),

    #[error("Console input ended before all questions were answered")]
    InputClosed,
}

pub type Result<T> = std::result::Result<T, SessionError>;

/// Everything the user chose for this run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub port: String,
    pub baud_rate: u32,
    /// Prefix for the log file path, used verbatim
    pub output_dir: String,
    /// Prefix each logged line with the local time
    pub timestamp_lines: bool,
    /// Sent in order after the handshake
    pub commands: Vec<String>,
}

/// Answers to the setup questions, before the baud rate is checked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionAnswers {
    pub port: String,
    /// Speed exactly as typed
    pub baud_rate: String,
    pub output_dir: String,
    pub timestamp_lines: bool,
    pub commands: Vec<String>,
}

impl SessionAnswers {
    /// Validate the speed and build the session settings
    pub fn into_config(self) -> Result<SessionConfig> {
        let baud_rate = parse_baud_rate(&self.baud_rate)?;
        Ok(SessionConfig {
            port: self.port,
            baud_rate,
            output_dir: self.output_dir,
            timestamp_lines: self.timestamp_lines,
            commands: self.commands,
        })
    }
}

/// How a typed port name becomes an OS port name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortNaming {
    /// Prepended to purely numeric input
    pub prefix: String,
    /// Upper-case any other input
    pub uppercase: bool,
}

impl PortNaming {
    /// Windows style: `3` becomes `COM3`, `com4` becomes `COM4`
    pub fn com() -> Self {
        Self {
            prefix: "COM".to_string(),
            uppercase: true,
        }
    }

    /// Naming convention of the platform we were built for
    pub fn platform_default() -> Self {
        if cfg!(windows) {
            Self::com()
        } else {
            Self {
                prefix: "/dev/ttyACM".to_string(),
                uppercase: false,
            }
        }
    }

    pub fn resolve(&self, input: &str) -> String {
        let input = input.trim();
        if input.parse::<i32>().is_ok() {
            format!("{}{}", self.prefix, input)
        } else if self.uppercase {
            input.to_uppercase()
        } else {
            input.to_string()
        }
    }
}

/// Parse a positive baud rate
pub fn parse_baud_rate(input: &str) -> Result<u32> {
    match input.trim().parse::<u32>() {
        Ok(rate) if rate > 0 => Ok(rate),
        _ => {
            warn!("Rejected baud rate {:?}", input);
            Err(SessionError::InvalidBaudRate)
        }
    }
}

/// Split a comma separated command list.
///
/// All whitespace is removed first, including whitespace inside a command,
/// so `"A B, C"` yields `["AB", "C"]`.
pub fn parse_command_list(input: &str) -> Vec<String> {
    let compact: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    compact.split(',').map(str::to_string).collect()
}

/// Shared cancellation flag, checked between blocking reads
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Why the logging loop stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopEnd {
    /// No line arrived within the read timeout
    TimedOut,
    /// The user pressed Enter
    Cancelled,
    /// The port failed or was closed
    DeviceError(String),
}

/// Outcome of a completed session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub path: PathBuf,
    pub lines_written: usize,
    pub end: LoopEnd,
}

/// One logging session over a link
pub struct LoggerSession<L: SerialLink> {
    config: SessionConfig,
    link: L,
}

impl LoggerSession<SerialPortLink> {
    /// Open the configured port with the standard settings
    pub fn open(config: SessionConfig) -> Result<Self> {
        let link = link::open_port(&config.port, config.baud_rate).map_err(|source| {
            SessionError::PortOpen {
                port: config.port.clone(),
                source,
            }
        })?;
        info!("Opened {} at {} baud", config.port, config.baud_rate);
        Ok(Self::new(config, link))
    }
}

impl<L: SerialLink> LoggerSession<L> {
    pub fn new(config: SessionConfig, link: L) -> Self {
        Self { config, link }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Wait for the first line from the device and throw it away.
    ///
    /// Confirms the device is talking; the discarded line is usually its
    /// boot banner.
    pub fn handshake(&mut self) -> Result<()> {
        match self.link.read_line() {
            Ok(first) => {
                debug!("Handshake line discarded ({} bytes)", first.len());
                Ok(())
            }
            Err(LinkError::Timeout) => Err(SessionError::HandshakeTimeout {
                port: self.config.port.clone(),
                baud_rate: self.config.baud_rate,
            }),
            Err(source) => Err(SessionError::Handshake {
                port: self.config.port.clone(),
                source,
            }),
        }
    }

    /// Write the startup commands back to back, returning how many were sent
    pub fn send_commands(&mut self) -> Result<usize> {
        let mut sent = 0;
        for command in &self.config.commands {
            if command.is_empty() {
                continue;
            }
            self.link
                .write_command(command)
                .map_err(|source| SessionError::CommandWrite {
                    port: self.config.port.clone(),
                    command: command.clone(),
                    source,
                })?;
            debug!("Sent command {:?}", command);
            sent += 1;
        }
        info!("Sent {} startup commands", sent);
        Ok(sent)
    }

    /// Copy lines from the device into `log` until timeout, error or cancel
    pub fn log_until_done<W: Write, C: Write>(
        &mut self,
        log: &mut LogFile<W>,
        cancel: &CancelToken,
        console: &mut C,
        clock: &dyn Clock,
    ) -> Result<LoopEnd> {
        loop {
            if cancel.is_cancelled() {
                info!("Logging cancelled by user");
                return Ok(LoopEnd::Cancelled);
            }

            match self.link.read_line() {
                Ok(raw) => {
                    let line = String::from_utf8_lossy(&raw);
                    let stamp = self
                        .config
                        .timestamp_lines
                        .then(|| long_time(&clock.now()));
                    log.write_line(&format_line(&line, stamp.as_deref()))
                        .map_err(|source| SessionError::LogFile {
                            path: log.path().to_path_buf(),
                            source,
                        })?;
                    say(console, line.trim_end_matches(['\r', '\n']))?;
                }
                Err(LinkError::Timeout) => {
                    info!("Read timed out after {} lines", log.lines_written());
                    say(console, format!("Timed out at {}", general_date_time(&clock.now())))?;
                    return Ok(LoopEnd::TimedOut);
                }
                Err(e) => {
                    warn!("Device error on {}: {}", self.config.port, e);
                    say(console, format!("Lost connection to {}: {}", self.config.port, e))?;
                    return Ok(LoopEnd::DeviceError(e.to_string()));
                }
            }
        }
    }

    /// Run the whole session.
    ///
    /// `open_log` creates the file writer for the computed path. `watch` is
    /// called with the cancellation token right before the loop starts and
    /// whatever it returns is dropped as soon as the loop ends.
    pub fn run<W, F, G, C>(
        mut self,
        open_log: F,
        watch: impl FnOnce(&CancelToken) -> G,
        console: &mut C,
        clock: &dyn Clock,
    ) -> Result<SessionReport>
    where
        W: Write,
        F: FnOnce(&Path) -> io::Result<W>,
        C: Write,
    {
        say(console, "Attempting to communicate with the Arduino...")?;
        self.handshake()?;
        say(console, "Communication established with the Arduino.")?;

        self.send_commands()?;

        let path = log_path(&self.config.output_dir, &clock.now());
        let writer = open_log(&path).map_err(|source| SessionError::LogFile {
            path: path.clone(),
            source,
        })?;
        let mut log = LogFile::from_writer(path.clone(), writer);
        info!("Logging to {}", path.display());

        say(console, format!("Writing csv log file to {}...", path.display()))?;
        say(console, "Press the enter key at any time to exit the program")?;

        let cancel = CancelToken::new();
        let end = {
            let _watch = watch(&cancel);
            self.log_until_done(&mut log, &cancel, console, clock)?
        };

        say(console, "Saving file...")?;
        let lines_written = log.lines_written();
        let path = log
            .close()
            .map_err(|source| SessionError::LogFile { path, source })?;
        say(console, format!("File saved to {}", path.display()))?;

        info!("Session finished: {} lines, {:?}", lines_written, end);
        Ok(SessionReport {
            path,
            lines_written,
            end,
        })
    }
}

fn say<C: Write>(console: &mut C, message: impl Display) -> Result<()> {
    writeln!(console, "{}", message)
        .and_then(|_| console.flush())
        .map_err(SessionError::Console)
}
