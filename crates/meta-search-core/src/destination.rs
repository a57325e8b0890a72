use crate::job::ActionPlan;
use filetime::{set_file_mtime, FileTime};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

/// Folder name used when a branch text sanitizes to nothing.
pub const UNNAMED_FOLDER: &str = "unnamed";

const ILLEGAL_PATH_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Which side effect an action performed or attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Copy,
    Move,
}

/// One copy or move that failed. Recorded per file; never aborts a batch.
#[derive(Debug, Clone)]
pub struct ActionFailure {
    pub kind: ActionKind,
    pub source: PathBuf,
    pub destination: PathBuf,
    pub reason: String,
}

/// Result of running an [`ActionPlan`] for one matched file.
#[derive(Debug, Default)]
pub struct ActionOutcome {
    pub copied_to: Option<PathBuf>,
    pub moved_to: Option<PathBuf>,
    pub failures: Vec<ActionFailure>,
}

/// Make an OR-branch text usable as a single folder name.
///
/// Path-illegal and control characters become `_`, leading and trailing dots
/// and spaces are stripped, and an empty result becomes [`UNNAMED_FOLDER`].
/// Distinct branch texts may sanitize to the same name; both land in one
/// folder.
pub fn sanitize_folder_name(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| {
            if ILLEGAL_PATH_CHARS.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();

    let trimmed = replaced.trim_matches(|c| c == '.' || c == ' ');
    if trimmed.is_empty() {
        UNNAMED_FOLDER.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Directory a matched file lands in under `action_root`.
///
/// Layout is `action_root[/<branch folder>][/<dir relative to scan root>]`.
/// A file directly in the scan root contributes no relative segment.
pub fn destination_dir(
    action_root: &Path,
    file: &Path,
    scan_root: &Path,
    branch_text: &str,
    plan: &ActionPlan,
) -> PathBuf {
    let mut dir = action_root.to_path_buf();

    if plan.group_by_branch {
        dir.push(sanitize_folder_name(branch_text));
    }

    if plan.preserve_structure {
        if let Some(relative) = relative_parent(file, scan_root) {
            dir.push(relative);
        }
    }

    dir
}

/// Full destination path: [`destination_dir`] plus the file name.
pub fn destination_path(
    action_root: &Path,
    file: &Path,
    scan_root: &Path,
    branch_text: &str,
    plan: &ActionPlan,
) -> PathBuf {
    let dir = destination_dir(action_root, file, scan_root, branch_text, plan);
    match file.file_name() {
        Some(name) => dir.join(name),
        None => dir,
    }
}

fn relative_parent(file: &Path, scan_root: &Path) -> Option<PathBuf> {
    let parent = file.parent()?;
    let relative = match parent.strip_prefix(scan_root) {
        Ok(relative) => relative,
        Err(_) => {
            warn!(
                "{} is outside scan root {}; not preserving structure",
                file.display(),
                scan_root.display()
            );
            return None;
        }
    };

    let cleaned: PathBuf = relative
        .components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .collect();

    if cleaned.as_os_str().is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

/// Run the plan for one matched file: copy first, then move.
///
/// Copy and move destinations are resolved independently under their own
/// roots. The copy always reads the untouched source. Each step records its
/// own failure without stopping the other.
pub fn apply_plan(
    file: &Path,
    scan_root: &Path,
    branch_text: &str,
    plan: &ActionPlan,
) -> ActionOutcome {
    let mut outcome = ActionOutcome::default();

    if let Some(copy_root) = &plan.copy_to {
        let destination = destination_path(copy_root, file, scan_root, branch_text, plan);
        match copy_file(file, &destination) {
            Ok(()) => outcome.copied_to = Some(destination),
            Err(e) => outcome.failures.push(ActionFailure {
                kind: ActionKind::Copy,
                source: file.to_path_buf(),
                destination,
                reason: e.to_string(),
            }),
        }
    }

    if let Some(move_root) = &plan.move_to {
        let destination = destination_path(move_root, file, scan_root, branch_text, plan);
        match move_file(file, &destination) {
            Ok(()) => outcome.moved_to = Some(destination),
            Err(e) => outcome.failures.push(ActionFailure {
                kind: ActionKind::Move,
                source: file.to_path_buf(),
                destination,
                reason: e.to_string(),
            }),
        }
    }

    outcome
}

/// Copy, creating the destination directory on demand. Overwrites an
/// existing file of the same name and carries over the modification time.
/// Refuses to copy a file onto itself, which would truncate it.
pub fn copy_file(source: &Path, destination: &Path) -> io::Result<()> {
    if is_same_file(source, destination) {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            "source and destination are the same file",
        ));
    }

    ensure_parent(destination)?;
    fs::copy(source, destination)?;

    match fs::metadata(source) {
        Ok(metadata) => {
            let mtime = FileTime::from_last_modification_time(&metadata);
            if let Err(e) = set_file_mtime(destination, mtime) {
                warn!("Could not keep mtime on {}: {}", destination.display(), e);
            }
        }
        Err(e) => warn!("Could not read mtime of {}: {}", source.display(), e),
    }

    debug!("Copied {} -> {}", source.display(), destination.display());
    Ok(())
}

/// Move, creating the destination directory on demand. Falls back to
/// copy-and-remove when a rename is not possible (e.g. across filesystems).
pub fn move_file(source: &Path, destination: &Path) -> io::Result<()> {
    if is_same_file(source, destination) {
        debug!("{} is already in place", source.display());
        return Ok(());
    }

    ensure_parent(destination)?;
    if let Err(rename_err) = fs::rename(source, destination) {
        if !source.exists() {
            return Err(rename_err);
        }
        debug!(
            "Rename of {} failed ({}); copying instead",
            source.display(),
            rename_err
        );
        fs::copy(source, destination)?;
        fs::remove_file(source)?;
    }
    debug!("Moved {} -> {}", source.display(), destination.display());
    Ok(())
}

/// Both paths exist and resolve to the same file.
fn is_same_file(source: &Path, destination: &Path) -> bool {
    match (fs::canonicalize(source), fs::canonicalize(destination)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn ensure_parent(destination: &Path) -> io::Result<()> {
    match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}
