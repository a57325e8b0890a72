use crate::metadata::ParsedMetadata;
use regex::Regex;

/// Free-form regex applied to every metadata field, independent of the
/// search scope.
///
/// A pattern that fails to compile is kept as `Invalid` and rejects every
/// file rather than aborting the scan.
#[derive(Debug, Clone)]
pub enum CustomFilter {
    Valid(Regex),
    Invalid { pattern: String, reason: String },
}

impl CustomFilter {
    /// `None` for a missing or blank pattern.
    pub fn new(pattern: Option<&str>) -> Option<Self> {
        let pattern = pattern.map(str::trim).filter(|p| !p.is_empty())?;
        Some(match Regex::new(pattern) {
            Ok(re) => CustomFilter::Valid(re),
            Err(e) => CustomFilter::Invalid {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            },
        })
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, CustomFilter::Valid(_))
    }

    pub fn matches(&self, metadata: &ParsedMetadata) -> bool {
        match self {
            CustomFilter::Valid(re) => metadata.fields().any(|(_, value)| re.is_match(value)),
            CustomFilter::Invalid { .. } => false,
        }
    }
}
