use std::fmt;

/// Stages of one scan, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanPhase {
    Counting,
    Enumerating,
    Scanning,
    Aggregating,
    Reporting,
}

impl ScanPhase {
    pub fn name(self) -> &'static str {
        match self {
            ScanPhase::Counting => "counting",
            ScanPhase::Enumerating => "enumerating",
            ScanPhase::Scanning => "scanning",
            ScanPhase::Aggregating => "aggregating",
            ScanPhase::Reporting => "reporting",
        }
    }
}

impl fmt::Display for ScanPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Trait for reporting scan progress and report lines.
///
/// CLI implements with indicatif; tests use [`SilentReporter`] or a
/// collecting reporter. All methods have default no-op implementations.
/// Calls come from the coordinating thread only.
pub trait ProgressReporter: Send + Sync {
    fn on_phase_start(&self, _phase: ScanPhase) {}
    fn on_progress(&self, _phase: ScanPhase, _completed: usize, _total: usize) {}
    fn on_phase_complete(&self, _phase: ScanPhase, _count: usize, _duration_secs: f64) {}
    fn on_log(&self, _line: &str) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
