//! Device session components.
//!
//! - **link**: serial port with the standard Arduino framing, read line by line
//! - **session**: handshake, startup commands and the logging loop
//! - **logfile**: CSV file naming and the owned log writer
//! - **clock**: local time source and display formats
//!
//! # Architecture
//!
//! ```text
//! LoggerSession
//! ├── SerialLink (owned, released on drop)
//! ├── LogFile (opened after the handshake, closed exactly once)
//! └── CancelToken (set by the key watcher thread)
//! ```

pub mod clock;
pub mod link;
pub mod logfile;
pub mod session;
