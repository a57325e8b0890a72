use crate::job::{ActionPlan, ScanJob};
use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::Deserialize;
use std::path::PathBuf;

/// Saved defaults for a scan, loaded from `MetaSearch.toml` and
/// `META_SEARCH__*` environment variables. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub search: SearchSection,
    pub output: OutputSection,
    pub paths: PathsSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchSection {
    pub term: String,
    pub ignore_term: String,
    pub custom_filter: String,
    pub recursive: bool,
    pub case_sensitive: bool,
    pub search_positive: bool,
    pub search_negative: bool,
    pub exclude_patterns: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputSection {
    pub match_folder_structure: bool,
    pub create_or_subfolders: bool,
    pub enable_logging: bool,
    pub log_dir: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PathsSection {
    pub search_folder: String,
    pub copy_folder: String,
    pub move_folder: String,
}

impl Default for SearchSection {
    fn default() -> Self {
        Self {
            term: String::new(),
            ignore_term: String::new(),
            custom_filter: String::new(),
            recursive: true,
            case_sensitive: false,
            search_positive: true,
            search_negative: false,
            exclude_patterns: Vec::new(),
        }
    }
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            match_folder_structure: true,
            create_or_subfolders: false,
            enable_logging: false,
            log_dir: "logs".to_string(),
        }
    }
}

pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name("MetaSearch").required(false))
        .add_source(Environment::with_prefix("META_SEARCH").separator("__"))
        .build()?;
    builder.try_deserialize::<AppConfig>()
}

impl AppConfig {
    pub fn to_job(&self) -> ScanJob {
        ScanJob {
            root: PathBuf::from(&self.paths.search_folder),
            recursive: self.search.recursive,
            search: self.search.term.clone(),
            ignore: self.search.ignore_term.clone(),
            custom_filter: non_blank(&self.search.custom_filter).map(str::to_string),
            search_positive: self.search.search_positive,
            search_negative: self.search.search_negative,
            case_sensitive: self.search.case_sensitive,
            exclude_patterns: self.search.exclude_patterns.clone(),
        }
    }

    pub fn to_plan(&self) -> ActionPlan {
        ActionPlan {
            copy_to: non_blank(&self.paths.copy_folder).map(PathBuf::from),
            move_to: non_blank(&self.paths.move_folder).map(PathBuf::from),
            preserve_structure: self.output.match_folder_structure,
            group_by_branch: self.output.create_or_subfolders,
        }
    }

    /// Directory for the per-scan match log, when logging is enabled.
    pub fn log_dir(&self) -> Option<PathBuf> {
        if self.output.enable_logging {
            non_blank(&self.output.log_dir).map(PathBuf::from)
        } else {
            None
        }
    }
}

fn non_blank(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}
