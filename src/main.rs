//! arduino-comm-logger - Log Arduino serial output to CSV
//!
//! Asks for a port, speed, output location and startup commands, waits for
//! the board to say something, sends the commands and then writes every line
//! it receives to a timestamped CSV file.
//!
//! # Quick Start
//!
//! ```text
//! arduino-comm-logger
//! Enter the COM port of the Arduino
//! 3
//! Enter the serial communication speed
//! 9600
//! ...
//! ```
//!
//! Logging stops when Enter is pressed or when the board is silent for five
//! seconds. The file is named `log_<time>_<date>.csv`, e.g.
//! `log_3-04-05_PM_10-17-2026.csv`.

mod config;
mod core;
mod ui;

use std::env;
use std::fs::File;
use std::io::{self, BufWriter, Write};

use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::config::Config;
use crate::core::clock::{long_time, Clock, SystemClock};
use crate::core::link;
use crate::core::session::{LoggerSession, SessionError};
use crate::ui::{hold_with_message, wait_for_key, KeyWatcher, Prompter};

/// Version string from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_version() {
    eprintln!("arduino-comm-logger {}", VERSION);
}

fn print_help() {
    eprintln!("arduino-comm-logger {} - Log Arduino serial output to CSV", VERSION);
    eprintln!();
    eprintln!("Usage: arduino-comm-logger [OPTIONS]");
    eprintln!();
    eprintln!("All session settings are asked for interactively:");
    eprintln!("  port                  Number (e.g. 3 for COM3) or full port name");
    eprintln!("  speed                 Baud rate, e.g. 9600");
    eprintln!("  path                  Prefix for the log file, e.g. C:\\logs\\");
    eprintln!("  time                  Prefix each line with the local time (y/n)");
    eprintln!("  commands              Comma separated, sent before logging starts");
    eprintln!();
    eprintln!("Serial settings: 8 data bits, no parity, 1 stop bit, no flow control,");
    eprintln!("                 5 second read/write timeout");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -v, --version         Show version");
    eprintln!("  -h, --help            Show this help");
    eprintln!();
    eprintln!("Press Enter while logging to stop. Logging also stops after");
    eprintln!("5 seconds without data.");
    eprintln!();
    eprintln!("Configuration: ~/.arduino-comm-logger/config.toml");
    eprintln!("Diagnostic log: ~/.arduino-comm-logger/arduino-comm-logger.log");
}

fn parse_args() -> Result<(), String> {
    for arg in env::args().skip(1) {
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-v" | "--version" => {
                print_version();
                std::process::exit(0);
            }
            arg => {
                return Err(format!("Unknown argument: {}. Use -h for help.", arg));
            }
        }
    }
    Ok(())
}

/// Send diagnostics to the log file in the app directory
fn init_logging(config: &Config) {
    let log_path = Config::app_dir()
        .map(|dir| dir.join("arduino-comm-logger.log"))
        .unwrap_or_else(|| std::path::PathBuf::from("arduino-comm-logger.log"));

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .ok();

    if let Some(file) = log_file {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }
}

fn main() -> anyhow::Result<()> {
    if let Err(e) = parse_args() {
        eprintln!("Error: {}", e);
        eprintln!("Use --help for usage information");
        std::process::exit(1);
    }

    let (config, config_error) = match Config::load() {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };

    init_logging(&config);
    info!("arduino-comm-logger {} starting...", VERSION);
    if let Some(e) = config_error {
        warn!("{}, using defaults", e);
    }

    println!("Welcome to the Arduino Serial Communication Logger {}", VERSION);
    println!("The current time is {}", long_time(&SystemClock.now()));

    match run(&config) {
        Ok(()) => {
            println!("Press any key to exit");
            io::stdout().flush()?;
            wait_for_key()?;
        }
        Err(e) => halt(e)?,
    }

    info!("arduino-comm-logger exiting");
    Ok(())
}

/// One full session, from the setup questions to the saved file
fn run(config: &Config) -> Result<(), SessionError> {
    let answers = {
        let stdin = io::stdin();
        let mut prompter = Prompter::new(stdin.lock(), io::stdout());
        prompter.collect_answers(&config.port_naming())?
    };

    println!("Opening serial port with standard Arduino communication settings...");
    println!("(No parity, 8 data bits, one stop bit, no handshake)");

    let session = LoggerSession::open(answers.into_config()?)?;
    println!("Successfully opened {}", session.config().port);

    let report = session.run(
        |path| File::create(path).map(BufWriter::new),
        |cancel| KeyWatcher::spawn(cancel.clone()),
        &mut io::stdout(),
        &SystemClock,
    )?;

    info!(
        "Saved {} lines to {} ({:?})",
        report.lines_written,
        report.path.display(),
        report.end
    );
    Ok(())
}

/// Report a fatal error and wait for a key. The port, if it was opened,
/// has already been released with the session.
fn halt(err: SessionError) -> anyhow::Result<()> {
    error!("Session aborted: {:?}", err);

    let mut stdout = io::stdout();
    if let SessionError::PortOpen { source, .. } = &err {
        writeln!(stdout, "{}", source.cause())?;
        let ports = link::available_ports();
        if ports.is_empty() {
            writeln!(stdout, "No serial ports detected")?;
        } else {
            writeln!(stdout, "Available serial ports: {}", ports.join(", "))?;
        }
    }

    hold_with_message(&mut stdout, &err.to_string())?;
    Ok(())
}
