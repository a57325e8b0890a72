pub mod config;
pub mod destination;
pub mod engine;
pub mod error;
pub mod expression;
pub mod job;
pub mod metadata;
pub mod progress;
pub mod scanner;
pub mod sink;

pub use config::AppConfig;
pub use engine::{FileMatch, ScanSummary, SearchEngine};
pub use error::Error;
pub use expression::{normalize, FieldScope, MatchResult, SearchExpression};
pub use job::{ActionPlan, ScanJob};
pub use metadata::{MetadataField, ParsedMetadata};
pub use progress::{ProgressReporter, ScanPhase, SilentReporter};
