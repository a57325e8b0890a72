use crate::error::Error;
use crate::progress::ProgressReporter;
use chrono::Local;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::warn;

struct LogState {
    lines: Vec<String>,
    file: Option<File>,
}

/// Append-only report for one scan.
///
/// Every line is kept in memory, forwarded to the reporter and, when a log
/// directory is configured, appended to `log_<YYYYmmdd_HHMMSS>.txt` there
/// prefixed with a timestamp. Writers are serialized by one mutex.
pub struct ScanLog<'a> {
    reporter: &'a dyn ProgressReporter,
    path: Option<PathBuf>,
    state: Mutex<LogState>,
}

impl<'a> ScanLog<'a> {
    pub fn new(reporter: &'a dyn ProgressReporter, log_dir: Option<&Path>) -> Result<Self, Error> {
        let (path, file) = match log_dir {
            Some(dir) => {
                fs::create_dir_all(dir)?;
                let name = format!("log_{}.txt", Local::now().format("%Y%m%d_%H%M%S"));
                let path = dir.join(name);
                let file = OpenOptions::new().create(true).append(true).open(&path)?;
                (Some(path), Some(file))
            }
            None => (None, None),
        };

        Ok(Self {
            reporter,
            path,
            state: Mutex::new(LogState {
                lines: Vec::new(),
                file,
            }),
        })
    }

    pub fn line(&self, message: impl Into<String>) {
        let message = message.into();
        let mut state = self.lock();

        if let Some(file) = state.file.as_mut() {
            let stamp = Local::now().format("%Y-%m-%dT%H:%M:%S%.6f");
            if let Err(e) = writeln!(file, "{}: {}", stamp, message) {
                warn!("Failed to write scan log: {}", e);
            }
        }

        self.reporter.on_log(&message);
        state.lines.push(message);
    }

    /// Whether lines are persisted to a log file.
    pub fn is_persistent(&self) -> bool {
        self.path.is_some()
    }

    pub fn file_path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn into_lines(self) -> Vec<String> {
        let state = self
            .state
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        state.lines
    }

    fn lock(&self) -> MutexGuard<'_, LogState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
