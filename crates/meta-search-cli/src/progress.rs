use indicatif::{ProgressBar, ProgressStyle};
use meta_search_core::{ProgressReporter, ScanPhase};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

const TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// CLI progress reporter using indicatif.
///
/// - Counting/Enumerating: spinner
/// - Scanning/Aggregating: bar, total known from the counting pass
/// - Report lines are printed above whatever bar is active
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<ProgressBar>> {
        self.bar.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set_bar(&self, pb: ProgressBar) {
        let mut guard = self.lock();
        if let Some(old) = guard.take() {
            old.finish_and_clear();
        }
        *guard = Some(pb);
    }

    fn finish_bar(&self) {
        if let Some(pb) = self.lock().take() {
            pb.finish_and_clear();
        }
    }
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars(TICK_CHARS),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

fn bar(label: &str) -> ProgressBar {
    let pb = ProgressBar::new(0);
    let template = format!(
        "  {{spinner:.cyan}} {} [{{bar:30.cyan/dim}}] {{pos}}/{{len}} files ({{eta}} remaining)",
        label
    );
    pb.set_style(
        ProgressStyle::with_template(&template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("━╸─")
            .tick_chars(TICK_CHARS),
    );
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

impl ProgressReporter for CliReporter {
    fn on_phase_start(&self, phase: ScanPhase) {
        match phase {
            ScanPhase::Counting => self.set_bar(spinner("Counting PNG files...")),
            ScanPhase::Enumerating => self.set_bar(spinner("Collecting candidates...")),
            ScanPhase::Scanning => self.set_bar(bar("Scanning")),
            ScanPhase::Aggregating => self.set_bar(bar("Processing matches")),
            ScanPhase::Reporting => self.finish_bar(),
        }
    }

    fn on_progress(&self, _phase: ScanPhase, completed: usize, total: usize) {
        let guard = self.lock();
        if let Some(pb) = guard.as_ref() {
            if pb.length() != Some(total as u64) {
                pb.set_length(total as u64);
            }
            pb.set_position(completed as u64);
        }
    }

    fn on_phase_complete(&self, phase: ScanPhase, count: usize, duration_secs: f64) {
        match phase {
            ScanPhase::Counting => {
                self.finish_bar();
                eprintln!(
                    "  \x1b[32m✓\x1b[0m Found {} PNG files in {:.2}s",
                    count, duration_secs
                );
            }
            ScanPhase::Scanning => {
                self.finish_bar();
                eprintln!(
                    "  \x1b[32m✓\x1b[0m Matching complete: {} matches in {:.2}s",
                    count, duration_secs
                );
            }
            ScanPhase::Aggregating => self.finish_bar(),
            ScanPhase::Enumerating | ScanPhase::Reporting => {}
        }
    }

    fn on_log(&self, line: &str) {
        match self.lock().as_ref() {
            Some(pb) => pb.println(line),
            None => println!("{}", line),
        }
    }
}
