//! Keyboard handling
//!
//! Enter cancels the logging loop; fatal messages and the final exit wait
//! for any single key.

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::terminal;
use tracing::{debug, info, warn};

use crate::core::session::CancelToken;

/// How long the watcher blocks on the keyboard before rechecking its stop flag
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Background thread that cancels the session when Enter is pressed
pub struct KeyWatcher {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl KeyWatcher {
    pub fn spawn(cancel: CancelToken) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = stop.clone();

        let handle = thread::spawn(move || {
            while !thread_stop.load(Ordering::SeqCst) {
                match event::poll(POLL_INTERVAL) {
                    Ok(false) => continue,
                    Ok(true) => {}
                    Err(e) => {
                        warn!("Keyboard polling unavailable: {}", e);
                        break;
                    }
                }

                match event::read() {
                    Ok(Event::Key(key)) if is_enter_press(&key) => {
                        info!("Enter pressed, stopping");
                        cancel.cancel();
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!("Failed to read keyboard event: {}", e);
                        break;
                    }
                }
            }
            debug!("Key watcher exiting");
        });

        Self {
            stop,
            handle: Some(handle),
        }
    }
}

impl Drop for KeyWatcher {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn is_enter_press(key: &KeyEvent) -> bool {
    key.code == KeyCode::Enter && key.kind != KeyEventKind::Release
}

/// Block until any key is pressed
pub fn wait_for_key() -> io::Result<()> {
    terminal::enable_raw_mode()?;
    let result = loop {
        match event::read() {
            Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => break Ok(()),
            Ok(_) => continue,
            Err(e) => break Err(e),
        }
    };
    terminal::disable_raw_mode()?;
    result
}

/// Show `message` and wait for a key before the caller gives up
pub fn hold_with_message<W: Write>(out: &mut W, message: &str) -> io::Result<()> {
    writeln!(out, "{}", message)?;
    writeln!(out, "Press any key to continue")?;
    out.flush()?;
    wait_for_key()
}
