//! Console interaction.
//!
//! - **prompt**: line-based setup questions and the yes/no helper
//! - **keys**: Enter-to-stop watcher and "press any key" waits

pub mod keys;
pub mod prompt;

pub use keys::{hold_with_message, wait_for_key, KeyWatcher};
pub use prompt::Prompter;
