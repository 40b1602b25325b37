//! CSV log file
//!
//! One file per session, named after the session start time. Each received
//! line is written as-is, optionally preceded by the local time with no
//! separator in between. Fields are not quoted or escaped.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::{debug, warn};

use super::clock::{long_time, short_date};

/// Replace the characters that are unsafe in file names
pub fn sanitize_timestamp(raw: &str) -> String {
    raw.chars()
        .map(|c| match c {
            ' ' => '_',
            '/' | ':' | '.' => '-',
            c => c,
        })
        .collect()
}

/// File name for a session started at `start`, e.g. `log_3-04-05_PM_10-17-2026.csv`
pub fn log_file_name(start: &DateTime<Local>) -> String {
    let stamp = format!("{} {}", long_time(start), short_date(start));
    format!("log_{}.csv", sanitize_timestamp(&stamp))
}

/// Full log path. `output_dir` is a plain prefix: no separator is inserted.
pub fn log_path(output_dir: &str, start: &DateTime<Local>) -> PathBuf {
    PathBuf::from(format!("{}{}", output_dir, log_file_name(start)))
}

/// Build a log row from a received line and an optional time prefix
pub fn format_line(line: &str, stamp: Option<&str>) -> String {
    match stamp {
        Some(stamp) => format!("{}{}", stamp, line),
        None => line.to_string(),
    }
}

/// An open log file.
///
/// The writer is flushed and released exactly once, either by `close` or,
/// if the session bails out early, on drop.
pub struct LogFile<W: Write> {
    path: PathBuf,
    writer: Option<W>,
    lines: usize,
}

impl<W: Write> LogFile<W> {
    pub fn from_writer(path: PathBuf, writer: W) -> Self {
        Self {
            path,
            writer: Some(writer),
            lines: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of rows written so far
    pub fn lines_written(&self) -> usize {
        self.lines
    }

    /// Append one row
    pub fn write_line(&mut self, row: &str) -> io::Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "log file already closed"))?;
        writer.write_all(row.as_bytes())?;
        self.lines += 1;
        Ok(())
    }

    /// Flush and release the file, returning its path
    pub fn close(mut self) -> io::Result<PathBuf> {
        self.release()?;
        Ok(std::mem::take(&mut self.path))
    }

    fn release(&mut self) -> io::Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
            debug!("Closed {} after {} lines", self.path.display(), self.lines);
        }
        Ok(())
    }
}

impl<W: Write> Drop for LogFile<W> {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!("Failed to flush {}: {}", self.path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::cell::{Cell, RefCell};
    use std::fs;
    use std::io::BufWriter;
    use std::rc::Rc;

    /// Writer that records its bytes and how many times it was dropped
    struct TrackedWriter {
        data: Rc<RefCell<Vec<u8>>>,
        drops: Rc<Cell<usize>>,
    }

    impl Write for TrackedWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.data.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Drop for TrackedWriter {
        fn drop(&mut self) {
            self.drops.set(self.drops.get() + 1);
        }
    }

    fn tracked() -> (TrackedWriter, Rc<RefCell<Vec<u8>>>, Rc<Cell<usize>>) {
        let data = Rc::new(RefCell::new(Vec::new()));
        let drops = Rc::new(Cell::new(0));
        let writer = TrackedWriter {
            data: data.clone(),
            drops: drops.clone(),
        };
        (writer, data, drops)
    }

    fn start() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 10, 17, 15, 4, 5).unwrap()
    }

    #[test]
    fn test_sanitize_timestamp() {
        assert_eq!(sanitize_timestamp("3:04:05 PM 10/17/2026"), "3-04-05_PM_10-17-2026");
        assert_eq!(sanitize_timestamp("17.10.2026 15:04"), "17-10-2026_15-04");
    }

    #[test]
    fn test_log_file_name_is_deterministic() {
        let name = log_file_name(&start());
        assert_eq!(name, "log_3-04-05_PM_10-17-2026.csv");
        assert_eq!(name, log_file_name(&start()));

        let stamp = name.trim_start_matches("log_").trim_end_matches(".csv");
        assert!(!stamp.contains([':', '.', '/', ' ']));
    }

    #[test]
    fn test_log_path_uses_dir_as_prefix() {
        assert_eq!(
            log_path("/tmp/run1_", &start()),
            PathBuf::from("/tmp/run1_log_3-04-05_PM_10-17-2026.csv")
        );
        assert_eq!(
            log_path("", &start()),
            PathBuf::from("log_3-04-05_PM_10-17-2026.csv")
        );
    }

    #[test]
    fn test_format_line() {
        assert_eq!(format_line("21.5,40\n", None), "21.5,40\n");
        assert_eq!(format_line("21.5,40\n", Some("3:04:05 PM")), "3:04:05 PM21.5,40\n");
    }

    #[test]
    fn test_close_releases_once() {
        let (writer, data, drops) = tracked();
        let mut log = LogFile::from_writer(PathBuf::from("a.csv"), writer);
        log.write_line("L1\n").unwrap();
        log.write_line("L2\n").unwrap();
        assert_eq!(log.lines_written(), 2);

        let path = log.close().unwrap();
        assert_eq!(path, PathBuf::from("a.csv"));
        assert_eq!(drops.get(), 1);
        assert_eq!(&*data.borrow(), b"L1\nL2\n");
    }

    #[test]
    fn test_drop_releases_once() {
        let (writer, data, drops) = tracked();
        {
            let mut log = LogFile::from_writer(PathBuf::from("b.csv"), writer);
            log.write_line("only\n").unwrap();
        }
        assert_eq!(drops.get(), 1);
        assert_eq!(&*data.borrow(), b"only\n");
    }

    #[test]
    fn test_writes_real_file() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = format!("{}/", dir.path().display());
        let path = log_path(&prefix, &start());

        let file = fs::File::create(&path).unwrap();
        let mut log = LogFile::from_writer(path.clone(), BufWriter::new(file));
        log.write_line("3:04:05 PMhello\r\n").unwrap();
        log.close().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "3:04:05 PMhello\r\n");
    }
}
