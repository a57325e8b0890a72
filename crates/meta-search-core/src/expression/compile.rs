use super::{FieldScope, MatchResult, SearchExpression};
use crate::metadata::ParsedMetadata;
use regex::{Regex, RegexBuilder};

struct CompiledBranch {
    text: String,
    /// `None` when a term failed to compile; the branch then never matches.
    terms: Option<Vec<Regex>>,
}

/// A term whose wildcard pattern could not be compiled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedTerm {
    pub branch_index: usize,
    pub term: String,
    pub reason: String,
}

/// A [`SearchExpression`] with every term turned into a regex, built once per
/// scan and shared read-only across workers.
pub struct CompiledExpression {
    branches: Vec<CompiledBranch>,
    rejected: Vec<RejectedTerm>,
}

impl CompiledExpression {
    /// Never fails. A term the regex engine refuses (e.g. over its size
    /// limit) disables its own branch and is listed in [`Self::rejected`];
    /// the other branches keep their declaration indices.
    pub fn compile(expression: &SearchExpression, case_sensitive: bool) -> Self {
        let mut rejected = Vec::new();

        let branches = expression
            .branches()
            .iter()
            .enumerate()
            .map(|(branch_index, branch)| {
                let mut terms = Some(Vec::with_capacity(branch.terms().len()));
                for term in branch.terms() {
                    match term_regex(term, case_sensitive) {
                        Ok(re) => {
                            if let Some(compiled) = terms.as_mut() {
                                compiled.push(re);
                            }
                        }
                        Err(e) => {
                            rejected.push(RejectedTerm {
                                branch_index,
                                term: term.clone(),
                                reason: e.to_string(),
                            });
                            terms = None;
                        }
                    }
                }
                CompiledBranch {
                    text: branch.text(),
                    terms,
                }
            })
            .collect();

        Self { branches, rejected }
    }

    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }

    pub fn rejected(&self) -> &[RejectedTerm] {
        &self.rejected
    }

    /// First OR-branch, in declaration order, whose every term occurs in at
    /// least one in-scope field. Terms of one branch may match different
    /// fields.
    pub fn evaluate(&self, metadata: &ParsedMetadata, scope: FieldScope) -> Option<MatchResult> {
        if self.branches.is_empty() {
            return None;
        }

        let texts = scope.texts(metadata);
        if texts.is_empty() {
            return None;
        }

        self.branches
            .iter()
            .enumerate()
            .find(|(_, branch)| match &branch.terms {
                Some(terms) => terms
                    .iter()
                    .all(|term| texts.iter().any(|text| term.is_match(text))),
                None => false,
            })
            .map(|(index, branch)| MatchResult {
                branch_index: index,
                branch_text: branch.text.clone(),
            })
    }
}

/// Translate a wildcard term into an unanchored regex. `*` and `?` may span
/// line breaks since prompts are often multi-line.
fn term_regex(term: &str, case_sensitive: bool) -> Result<Regex, regex::Error> {
    let pattern = regex::escape(term)
        .replace(r"\*", ".*")
        .replace(r"\?", ".");

    RegexBuilder::new(&pattern)
        .case_insensitive(!case_sensitive)
        .dot_matches_new_line(true)
        .build()
}
