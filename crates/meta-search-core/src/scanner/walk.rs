use crate::error::Error;
use glob::Pattern;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{error, warn};
use walkdir::{DirEntry, WalkDir};

/// Extension of files known to carry an embedded parameters blob.
pub const IMAGE_EXTENSION: &str = "png";

/// Candidate selection rules for one traversal of the scan root.
pub struct CandidateWalker {
    root: PathBuf,
    recursive: bool,
    exclude: Vec<Pattern>,
}

impl CandidateWalker {
    /// Fails with [`Error::RootAccess`] when the root is missing, not a
    /// directory, or unreadable. Invalid exclude globs are logged and dropped.
    pub fn new(root: &Path, recursive: bool, exclude_globs: &[String]) -> Result<Self, Error> {
        check_root(root)?;

        let exclude = exclude_globs
            .iter()
            .filter_map(|glob| match Pattern::new(glob) {
                Ok(p) => Some(p),
                Err(e) => {
                    error!("Invalid glob pattern '{}': {}", glob, e);
                    None
                }
            })
            .collect();

        Ok(Self {
            root: root.to_path_buf(),
            recursive,
            exclude,
        })
    }

    /// Counting pass: the progress denominator.
    pub fn count(&self) -> usize {
        self.candidates().count()
    }

    /// Enumeration pass: candidate paths in traversal order.
    pub fn collect(&self) -> Vec<PathBuf> {
        self.candidates().collect()
    }

    fn candidates(&self) -> impl Iterator<Item = PathBuf> + '_ {
        let max_depth = if self.recursive { usize::MAX } else { 1 };

        WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(max_depth)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |entry| !self.is_excluded(entry.path()))
            .filter_map(|entry_result| match entry_result {
                Ok(entry) => Some(entry),
                Err(err) => {
                    let path = err
                        .path()
                        .map(|p| p.display().to_string())
                        .unwrap_or_default();
                    warn!("Skipping unreadable entry {}: {}", path, err);
                    None
                }
            })
            .filter(is_candidate)
            .map(DirEntry::into_path)
    }

    fn is_excluded(&self, path: &Path) -> bool {
        self.exclude.iter().any(|pattern| pattern.matches_path(path))
    }
}

fn is_candidate(entry: &DirEntry) -> bool {
    let is_file = entry.file_type().is_file()
        || (entry.path_is_symlink() && entry.path().is_file());

    is_file
        && entry
            .path()
            .extension()
            .map_or(false, |ext| ext.eq_ignore_ascii_case(IMAGE_EXTENSION))
}

fn check_root(root: &Path) -> Result<(), Error> {
    let root_error = |source: io::Error| Error::RootAccess {
        path: root.to_path_buf(),
        source,
    };

    let metadata = fs::metadata(root).map_err(root_error)?;
    if !metadata.is_dir() {
        return Err(root_error(io::Error::new(
            io::ErrorKind::Other,
            "not a directory",
        )));
    }
    fs::read_dir(root).map_err(root_error)?;
    Ok(())
}
