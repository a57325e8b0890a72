use crate::destination::{self, ActionFailure, ActionKind};
use crate::error::Error;
use crate::expression::{self, CompiledExpression, CustomFilter, FieldScope, MatchResult};
use crate::job::{ActionPlan, ScanJob};
use crate::metadata::{self, ParsedMetadata};
use crate::progress::{ProgressReporter, ScanPhase};
use crate::scanner::CandidateWalker;
use crate::sink::ScanLog;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Runs one search over a folder of images at a time.
///
/// Matching is spread over a bounded rayon pool. Workers only ever send a
/// [`FileOutcome`] back; every summary list and counter is touched on the
/// calling thread alone.
pub struct SearchEngine {
    workers: usize,
    log_dir: Option<PathBuf>,
    cancel_token: Arc<AtomicBool>,
    busy: AtomicBool,
}

/// A file that passed ignore, primary and custom-filter checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMatch {
    pub path: PathBuf,
    pub result: MatchResult,
}

#[derive(Debug, Default)]
pub struct ScanSummary {
    pub total_files: usize,
    pub matched: usize,
    pub copied: usize,
    pub moved: usize,
    pub logged: usize,
    pub decode_failures: usize,
    /// File names of matches, in completion order.
    pub matched_files: Vec<String>,
    /// Where each match ended up: its action destinations, or the original
    /// path when no action ran.
    pub resolved_paths: Vec<PathBuf>,
    pub matches: Vec<FileMatch>,
    pub action_failures: Vec<ActionFailure>,
    pub log: Vec<String>,
    pub log_file: Option<PathBuf>,
    pub scan_duration: Duration,
    pub action_duration: Duration,
}

enum FileOutcome {
    Matched(FileMatch),
    Rejected,
    Failed { path: PathBuf, reason: String },
}

/// Compiled criteria shared read-only by all workers of one scan.
struct FileMatcher {
    primary: CompiledExpression,
    ignore: CompiledExpression,
    filter: Option<CustomFilter>,
    scope: FieldScope,
}

impl FileMatcher {
    /// Ignore wins over everything; then the primary expression; then the
    /// custom filter, if any.
    fn check(&self, metadata: &ParsedMetadata) -> Option<MatchResult> {
        if self.ignore.evaluate(metadata, self.scope).is_some() {
            return None;
        }

        let result = self.primary.evaluate(metadata, self.scope)?;

        match &self.filter {
            Some(filter) if !filter.matches(metadata) => None,
            _ => Some(result),
        }
    }

    fn evaluate_file(&self, path: &Path) -> FileOutcome {
        let blob = match metadata::png::read_parameters(path) {
            Ok(blob) => blob,
            Err(e) => {
                return FileOutcome::Failed {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                }
            }
        };

        let metadata = ParsedMetadata::parse(blob.as_deref());
        match self.check(&metadata) {
            Some(result) => FileOutcome::Matched(FileMatch {
                path: path.to_path_buf(),
                result,
            }),
            None => FileOutcome::Rejected,
        }
    }
}

/// Clears the busy flag when a scan ends, however it ends.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Available hardware parallelism minus one unit for the coordinating thread.
pub fn default_worker_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .saturating_sub(1)
        .max(1)
}

impl Default for SearchEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchEngine {
    pub fn new() -> Self {
        Self {
            workers: default_worker_count(),
            log_dir: None,
            cancel_token: Arc::new(AtomicBool::new(false)),
            busy: AtomicBool::new(false),
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Persist the scan report to a timestamped file in `dir`.
    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Shared cancel flag. Setting it stops the running scan at the next
    /// file boundary. `scan()` clears it when it starts.
    pub fn cancel_token(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel_token)
    }

    /// Run the full pipeline:
    /// 1. Normalize and compile criteria, refusing when there are none
    /// 2. Count and enumerate candidate images under the root
    /// 3. Match every candidate on the worker pool
    /// 4. Copy/move matches in completion order
    /// 5. Emit the report and return the summary
    pub fn scan(
        &self,
        job: ScanJob,
        plan: ActionPlan,
        reporter: &dyn ProgressReporter,
    ) -> Result<ScanSummary, Error> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Error::ScanInProgress);
        }
        let _busy = BusyGuard(&self.busy);
        self.cancel_token.store(false, Ordering::Relaxed);

        let log = ScanLog::new(reporter, self.log_dir.as_deref())?;
        log.line(format!("Searching in: {}", job.root.display()));

        let matcher = build_matcher(&job, &log);
        if matcher.primary.is_empty() && matcher.filter.is_none() {
            log.line("No valid search terms or custom filter provided; nothing to search for");
            return Err(Error::EmptyCriteria);
        }

        // Counting / Enumerating
        info!("Counting files...");
        reporter.on_phase_start(ScanPhase::Counting);
        let count_start = Instant::now();
        let walker = CandidateWalker::new(&job.root, job.recursive, &job.exclude_patterns)?;
        let total_files = walker.count();
        reporter.on_progress(ScanPhase::Counting, total_files, total_files);
        reporter.on_phase_complete(
            ScanPhase::Counting,
            total_files,
            count_start.elapsed().as_secs_f64(),
        );
        log.line(format!("Found {} PNG files to process", total_files));

        reporter.on_phase_start(ScanPhase::Enumerating);
        let enum_start = Instant::now();
        let candidates = walker.collect();
        reporter.on_phase_complete(
            ScanPhase::Enumerating,
            candidates.len(),
            enum_start.elapsed().as_secs_f64(),
        );

        // Scanning
        info!("Scanning {} files with {} workers...", candidates.len(), self.workers);
        reporter.on_phase_start(ScanPhase::Scanning);
        let scan_start = Instant::now();
        let (matches, decode_failures) =
            self.match_candidates(candidates, matcher, total_files, reporter)?;
        let scan_duration = scan_start.elapsed();
        reporter.on_phase_complete(ScanPhase::Scanning, matches.len(), scan_duration.as_secs_f64());
        debug!(
            "Matching completed in {:.2}s: {} matches, {} unreadable files",
            scan_duration.as_secs_f64(),
            matches.len(),
            decode_failures,
        );

        // Aggregating
        reporter.on_phase_start(ScanPhase::Aggregating);
        let action_start = Instant::now();
        let mut summary = ScanSummary {
            total_files,
            decode_failures,
            scan_duration,
            ..Default::default()
        };
        self.aggregate(&job.root, &plan, matches, &mut summary, &log, reporter)?;
        summary.action_duration = action_start.elapsed();
        reporter.on_phase_complete(
            ScanPhase::Aggregating,
            summary.matched,
            summary.action_duration.as_secs_f64(),
        );

        // Reporting
        reporter.on_phase_start(ScanPhase::Reporting);
        if log.is_persistent() {
            summary.logged = summary.matched;
        }
        report(&summary, &plan, &log);
        reporter.on_phase_complete(ScanPhase::Reporting, summary.matched, 0.0);

        summary.log_file = log.file_path().map(Path::to_path_buf);
        summary.log = log.into_lines();
        Ok(summary)
    }

    fn match_candidates(
        &self,
        candidates: Vec<PathBuf>,
        matcher: FileMatcher,
        total_files: usize,
        reporter: &dyn ProgressReporter,
    ) -> Result<(Vec<FileMatch>, usize), Error> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|idx| format!("meta-search-{}", idx))
            .build()
            .map_err(|e| Error::Other(format!("Failed to create worker pool: {}", e)))?;

        let matcher = Arc::new(matcher);
        let (tx, rx) = mpsc::channel::<FileOutcome>();

        for path in candidates {
            let tx = tx.clone();
            let matcher = Arc::clone(&matcher);
            let cancel = Arc::clone(&self.cancel_token);
            pool.spawn(move || {
                if cancel.load(Ordering::Relaxed) {
                    return;
                }
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| matcher.evaluate_file(&path)))
                    .unwrap_or_else(|_| FileOutcome::Failed {
                        reason: "decoder panicked".to_string(),
                        path,
                    });
                // The receiver only goes away once the scan is abandoned.
                let _ = tx.send(outcome);
            });
        }
        drop(tx);

        let mut matches = Vec::new();
        let mut decode_failures = 0usize;
        let mut completed = 0usize;

        for outcome in rx {
            completed += 1;
            match outcome {
                FileOutcome::Matched(file_match) => matches.push(file_match),
                FileOutcome::Rejected => {}
                FileOutcome::Failed { path, reason } => {
                    decode_failures += 1;
                    debug!("Skipping {}: {}", path.display(), reason);
                }
            }
            reporter.on_progress(ScanPhase::Scanning, completed, total_files);
        }

        if self.cancel_token.load(Ordering::Relaxed) {
            info!("Scan cancelled after {} of {} files", completed, total_files);
            return Err(Error::Cancelled);
        }

        Ok((matches, decode_failures))
    }

    fn aggregate(
        &self,
        scan_root: &Path,
        plan: &ActionPlan,
        matches: Vec<FileMatch>,
        summary: &mut ScanSummary,
        log: &ScanLog<'_>,
        reporter: &dyn ProgressReporter,
    ) -> Result<(), Error> {
        let total = matches.len();

        for (idx, file_match) in matches.into_iter().enumerate() {
            if self.cancel_token.load(Ordering::Relaxed) {
                info!("Scan cancelled while processing matches");
                return Err(Error::Cancelled);
            }

            let file_name = file_match
                .path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            summary.matched += 1;
            summary.matched_files.push(file_name);

            if plan.has_action() {
                let outcome = destination::apply_plan(
                    &file_match.path,
                    scan_root,
                    &file_match.result.branch_text,
                    plan,
                );

                if let Some(copied) = outcome.copied_to {
                    summary.copied += 1;
                    summary.resolved_paths.push(copied);
                }
                if let Some(moved) = outcome.moved_to {
                    summary.moved += 1;
                    summary.resolved_paths.push(moved);
                }
                if outcome.failures.len() == usize::from(plan.copy_to.is_some())
                    + usize::from(plan.move_to.is_some())
                {
                    summary.resolved_paths.push(file_match.path.clone());
                }

                for failure in outcome.failures {
                    let verb = match failure.kind {
                        ActionKind::Copy => "copy",
                        ActionKind::Move => "move",
                    };
                    error!(
                        "Failed to {} {} to {}: {}",
                        verb,
                        failure.source.display(),
                        failure.destination.display(),
                        failure.reason
                    );
                    log.line(format!(
                        "Error: failed to {} {} to {}: {}",
                        verb,
                        failure.source.display(),
                        failure.destination.display(),
                        failure.reason
                    ));
                    summary.action_failures.push(failure);
                }
            } else {
                summary.resolved_paths.push(file_match.path.clone());
            }

            summary.matches.push(file_match);
            reporter.on_progress(ScanPhase::Aggregating, idx + 1, total);
        }

        Ok(())
    }
}

/// Normalize both expressions, compile them and the custom filter, logging
/// every repair the user should know about.
fn build_matcher(job: &ScanJob, log: &ScanLog<'_>) -> FileMatcher {
    let primary = expression::normalize(&job.search);
    let ignore = expression::normalize(&job.ignore);

    for warning in primary.warnings.iter().chain(ignore.warnings.iter()) {
        warn!("{}", warning);
        log.line(format!("Warning: {}", warning));
    }

    let cleaned = primary.expression.to_string();
    if cleaned != job.search.trim() && !primary.expression.is_empty() {
        log.line(format!("Search term was cleaned to: {}", cleaned));
    }

    let filter = CustomFilter::new(job.custom_filter.as_deref());
    if let Some(CustomFilter::Invalid { pattern, reason }) = &filter {
        warn!("Invalid custom filter '{}': {}", pattern, reason);
        log.line(format!(
            "Warning: custom filter '{}' is not a valid pattern and will match nothing ({})",
            pattern, reason
        ));
    }

    let primary = CompiledExpression::compile(&primary.expression, job.case_sensitive);
    let ignore = CompiledExpression::compile(&ignore.expression, job.case_sensitive);
    for (kind, compiled) in [("search", &primary), ("ignore", &ignore)] {
        for rejected in compiled.rejected() {
            warn!("Unusable {} term '{}': {}", kind, rejected.term, rejected.reason);
            log.line(format!(
                "Warning: {} term '{}' could not be compiled; OR branch {} will match nothing ({})",
                kind, rejected.term, rejected.branch_index, rejected.reason
            ));
        }
    }

    FileMatcher {
        primary,
        ignore,
        filter,
        scope: job.scope(),
    }
}

fn report(summary: &ScanSummary, plan: &ActionPlan, log: &ScanLog<'_>) {
    if summary.matched > 0 {
        log.line("");
        log.line("Matching files:");
        for name in &summary.matched_files {
            log.line(name.as_str());
        }

        log.line("");
        log.line("Complete paths:");
        for path in &summary.resolved_paths {
            log.line(path.display().to_string());
        }
    }

    log.line("");
    log.line("Summary:");
    log.line(format!("Total PNG files processed: {}", summary.total_files));
    log.line(format!("Matches found: {}", summary.matched));
    if summary.decode_failures > 0 {
        log.line(format!("Unreadable files skipped: {}", summary.decode_failures));
    }

    let mut actions = Vec::new();
    if log.is_persistent() {
        actions.push(format!("logged {} files", summary.logged));
    }
    if plan.copy_to.is_some() {
        actions.push(format!("copied {} files", summary.copied));
    }
    if plan.move_to.is_some() {
        actions.push(format!("moved {} files", summary.moved));
    }
    if !actions.is_empty() {
        log.line(format!("Actions taken: {}", actions.join(", ")));
    }
    if !summary.action_failures.is_empty() {
        log.line(format!("Failed actions: {}", summary.action_failures.len()));
    }

    info!(
        "{} of {} files matched ({} copied, {} moved)",
        summary.matched, summary.total_files, summary.copied, summary.moved
    );
}
