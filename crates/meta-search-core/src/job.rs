use crate::expression::FieldScope;
use std::path::PathBuf;

/// Immutable description of what one scan looks for.
#[derive(Debug, Clone, Default)]
pub struct ScanJob {
    pub root: PathBuf,
    pub recursive: bool,
    /// Raw primary expression, normalized when the scan starts.
    pub search: String,
    /// Raw ignore expression; any satisfied branch excludes the file.
    pub ignore: String,
    pub custom_filter: Option<String>,
    pub search_positive: bool,
    pub search_negative: bool,
    pub case_sensitive: bool,
    /// Glob patterns for files and directories skipped during traversal.
    pub exclude_patterns: Vec<String>,
}

impl ScanJob {
    pub fn new(root: impl Into<PathBuf>, search: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            search: search.into(),
            ..Default::default()
        }
    }

    pub fn scope(&self) -> FieldScope {
        FieldScope::new(self.search_positive, self.search_negative)
    }
}

/// What happens to matched files.
#[derive(Debug, Clone, Default)]
pub struct ActionPlan {
    pub copy_to: Option<PathBuf>,
    pub move_to: Option<PathBuf>,
    /// Mirror each file's directory relative to the scan root.
    pub preserve_structure: bool,
    /// Put files under a folder named after the matched OR-branch.
    pub group_by_branch: bool,
}

impl ActionPlan {
    pub fn has_action(&self) -> bool {
        self.copy_to.is_some() || self.move_to.is_some()
    }
}
