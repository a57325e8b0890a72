//! Boolean OR-of-AND wildcard expressions.
//!
//! Grammar: `Expr := Branch ('||' Branch)*`, `Branch := Term ('&&' Term)*`.
//! A term is literal text where `*` matches any run and `?` one character.

pub mod compile;
pub mod filter;

use crate::metadata::{MetadataField, ParsedMetadata};
use regex::Regex;
use std::fmt;

pub use compile::{CompiledExpression, RejectedTerm};
pub use filter::CustomFilter;

pub const OR_OPERATOR: &str = "||";
pub const AND_OPERATOR: &str = "&&";

lazy_static::lazy_static! {
    static ref OR_RUN: Regex = Regex::new(r"\|{3,}").expect("static pattern is valid");
    static ref AND_RUN: Regex = Regex::new(r"&{3,}").expect("static pattern is valid");
}

/// One alternative of an expression: every term must match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branch {
    terms: Vec<String>,
}

impl Branch {
    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    /// Canonical branch text, terms joined with ` && `.
    pub fn text(&self) -> String {
        self.terms.join(" && ")
    }
}

/// Normalized search expression. An expression with no branches is the
/// canonical empty expression and never matches anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchExpression {
    branches: Vec<Branch>,
}

impl SearchExpression {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Normalize raw user input, discarding the warnings.
    pub fn parse(raw: &str) -> Self {
        normalize(raw).expression
    }

    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }

    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }
}

impl fmt::Display for SearchExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let texts: Vec<String> = self.branches.iter().map(Branch::text).collect();
        f.write_str(&texts.join(" || "))
    }
}

/// Something `normalize` had to repair in the raw input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizeWarning {
    CollapsedOr,
    CollapsedAnd,
    EmptyAndTerms,
    EmptyOrBranches,
    NoValidTerms,
}

impl fmt::Display for NormalizeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            NormalizeWarning::CollapsedOr => {
                "Multiple consecutive OR operators (|||) were simplified to single OR (||)"
            }
            NormalizeWarning::CollapsedAnd => {
                "Multiple consecutive AND operators (&&&) were simplified to single AND (&&)"
            }
            NormalizeWarning::EmptyAndTerms => "Empty AND terms were removed from search",
            NormalizeWarning::EmptyOrBranches => "Empty OR terms were removed from search",
            NormalizeWarning::NoValidTerms => "No valid search terms found after cleaning",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub expression: SearchExpression,
    pub warnings: Vec<NormalizeWarning>,
}

/// Repair and split raw expression text.
///
/// Runs of three or more `|` or `&` collapse to one operator, every term is
/// trimmed, empty terms and branches are dropped. Each warning kind is
/// reported at most once. Only the empty string is the empty expression
/// with no warnings; whitespace alone is reported as empty terms. The result
/// is deterministic and re-normalizing its `Display` text yields the same
/// expression with no warnings.
pub fn normalize(raw: &str) -> Normalized {
    let mut warnings = Vec::new();

    if raw.is_empty() {
        return Normalized {
            expression: SearchExpression::empty(),
            warnings,
        };
    }

    let collapsed_or = OR_RUN.replace_all(raw, OR_OPERATOR);
    if collapsed_or != raw {
        warnings.push(NormalizeWarning::CollapsedOr);
    }
    let collapsed = AND_RUN.replace_all(&collapsed_or, AND_OPERATOR);
    if collapsed != collapsed_or {
        warnings.push(NormalizeWarning::CollapsedAnd);
    }

    let mut branches = Vec::new();
    let mut dropped_terms = false;
    let mut dropped_branches = false;

    for raw_branch in collapsed.split(OR_OPERATOR) {
        let terms: Vec<String> = raw_branch
            .split(AND_OPERATOR)
            .map(str::trim)
            .filter(|term| {
                let keep = !term.is_empty();
                dropped_terms |= !keep;
                keep
            })
            .map(str::to_string)
            .collect();

        if terms.is_empty() {
            dropped_branches = true;
        } else {
            branches.push(Branch { terms });
        }
    }

    if dropped_terms {
        warnings.push(NormalizeWarning::EmptyAndTerms);
    }
    if dropped_branches {
        warnings.push(NormalizeWarning::EmptyOrBranches);
    }
    if branches.is_empty() {
        warnings.push(NormalizeWarning::NoValidTerms);
    }

    Normalized {
        expression: SearchExpression { branches },
        warnings,
    }
}

/// Which metadata fields a term may match in.
///
/// With neither flag set every present field is searched; otherwise only the
/// selected prompts are.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldScope {
    pub positive: bool,
    pub negative: bool,
}

impl FieldScope {
    pub fn new(positive: bool, negative: bool) -> Self {
        Self { positive, negative }
    }

    pub fn all() -> Self {
        Self::default()
    }

    pub fn texts<'a>(&self, metadata: &'a ParsedMetadata) -> Vec<&'a str> {
        if !self.positive && !self.negative {
            return metadata.fields().map(|(_, value)| value).collect();
        }

        let mut texts = Vec::with_capacity(2);
        if self.positive {
            texts.extend(metadata.get(MetadataField::Positive));
        }
        if self.negative {
            texts.extend(metadata.get(MetadataField::Negative));
        }
        texts
    }
}

/// The first satisfied OR-branch of an expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pub branch_index: usize,
    pub branch_text: String,
}

/// Compile and evaluate in one step. Scans compile once and reuse
/// [`CompiledExpression`] instead.
pub fn evaluate(
    expression: &SearchExpression,
    metadata: &ParsedMetadata,
    scope: FieldScope,
    case_sensitive: bool,
) -> Option<MatchResult> {
    CompiledExpression::compile(expression, case_sensitive).evaluate(metadata, scope)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(positive: &str, negative: &str) -> ParsedMetadata {
        ParsedMetadata {
            positive: Some(positive.to_string()),
            negative: Some(negative.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_normalize_well_formed() {
        let result = normalize("cat && dog || fox");
        assert!(result.warnings.is_empty());
        assert_eq!(result.expression.branches().len(), 2);
        assert_eq!(result.expression.branches()[0].terms(), ["cat", "dog"]);
        assert_eq!(result.expression.to_string(), "cat && dog || fox");
    }

    #[test]
    fn test_normalize_collapses_operator_runs() {
        let result = normalize("cat &&&& dog ||||| fox");
        assert_eq!(result.expression.to_string(), "cat && dog || fox");
        assert_eq!(
            result.warnings,
            vec![NormalizeWarning::CollapsedOr, NormalizeWarning::CollapsedAnd]
        );
    }

    #[test]
    fn test_normalize_drops_empty_terms_and_branches() {
        let result = normalize(" && cat &&  || || fox ");
        assert_eq!(result.expression.to_string(), "cat || fox");
        assert!(result.warnings.contains(&NormalizeWarning::EmptyAndTerms));
        assert!(result.warnings.contains(&NormalizeWarning::EmptyOrBranches));
        assert!(!result.warnings.contains(&NormalizeWarning::NoValidTerms));
    }

    #[test]
    fn test_normalize_nothing_survives() {
        let result = normalize(" || && ||| ");
        assert_eq!(result.expression, SearchExpression::empty());
        assert!(result.warnings.contains(&NormalizeWarning::NoValidTerms));
    }

    #[test]
    fn test_normalize_empty_string_has_no_warnings() {
        let result = normalize("");
        assert!(result.expression.is_empty());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_normalize_whitespace_only_warns() {
        let result = normalize("   ");
        assert!(result.expression.is_empty());
        assert_eq!(
            result.warnings,
            vec![
                NormalizeWarning::EmptyAndTerms,
                NormalizeWarning::EmptyOrBranches,
                NormalizeWarning::NoValidTerms,
            ]
        );
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let inputs = [
            "cat && dog || fox",
            "a|||b&&&c",
            " x &&  && y ||  || z ",
            "||",
            "a| || &b",
            "single",
            "* && ?",
        ];
        for input in inputs {
            let once = normalize(input).expression;
            let twice = normalize(&once.to_string());
            assert_eq!(twice.expression, once, "input: {:?}", input);
            if !once.is_empty() {
                assert!(twice.warnings.is_empty(), "input: {:?}", input);
            }
        }
    }

    #[test]
    fn test_every_branch_has_terms() {
        let result = normalize("a && || && b || c &&");
        for branch in result.expression.branches() {
            assert!(!branch.terms().is_empty());
            assert!(branch.terms().iter().all(|t| !t.is_empty()));
        }
    }

    #[test]
    fn test_scope_selection() {
        let mut md = metadata("pos", "neg");
        md.model = Some("model".to_string());

        assert_eq!(FieldScope::all().texts(&md), vec!["pos", "neg", "model"]);
        assert_eq!(FieldScope::new(true, false).texts(&md), vec!["pos"]);
        assert_eq!(FieldScope::new(false, true).texts(&md), vec!["neg"]);
        assert_eq!(FieldScope::new(true, true).texts(&md), vec!["pos", "neg"]);
    }

    #[test]
    fn test_evaluate_convenience() {
        let expr = SearchExpression::parse("cat && dog || fox");
        let md = metadata("a fox in the snow", "");
        let result = evaluate(&expr, &md, FieldScope::new(true, false), false);
        assert_eq!(
            result,
            Some(MatchResult {
                branch_index: 1,
                branch_text: "fox".to_string(),
            })
        );
    }
}
