//! Label matchers and the matcher merge algorithm.
//!
//! This module provides the types used to select time series by label:
//! - [`MatchOp`]: The comparison operator of a matcher
//! - [`LabelMatcher`]: A single `name <op> "value"` predicate
//! - [`merge_matchers`]: Merge an incoming matcher list into an existing one

use serde::{Deserialize, Serialize};

use crate::error::{ExprError, Result};

/// The comparison operator of a label matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchOp {
    /// Exact equality (`=`).
    Equal,
    /// Exact inequality (`!=`).
    NotEqual,
    /// Regular expression match (`=~`).
    RegexMatch,
    /// Negated regular expression match (`!~`).
    RegexNoMatch,
}

impl MatchOp {
    /// Returns the PromQL token for this operator.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Equal => "=",
            Self::NotEqual => "!=",
            Self::RegexMatch => "=~",
            Self::RegexNoMatch => "!~",
        }
    }
}

impl std::fmt::Display for MatchOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single label-selection predicate.
///
/// Matchers are immutable value types. Their identity for merge purposes is
/// the label name alone: when a later matcher shares a name with an earlier
/// one, the operator and value are replaced wholesale.
///
/// An empty value with [`MatchOp::Equal`] is legal PromQL (it selects series
/// where the label is absent) and is never filtered out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelMatcher {
    /// The label name being matched.
    pub name: String,
    /// The value to compare against.
    pub value: String,
    /// The comparison operator.
    pub op: MatchOp,
}

impl LabelMatcher {
    /// Creates a new matcher with the given operator.
    ///
    /// # Errors
    ///
    /// Returns `ExprError::InvalidLabelName` if the label name is not a
    /// valid PromQL label name.
    pub fn new(name: impl Into<String>, value: impl Into<String>, op: MatchOp) -> Result<Self> {
        let name = name.into();
        if !is_valid_label_name(&name) {
            return Err(ExprError::InvalidLabelName { name });
        }
        Ok(Self {
            name,
            value: value.into(),
            op,
        })
    }

    /// Creates an equality matcher (`name="value"`).
    ///
    /// # Errors
    ///
    /// Returns `ExprError::InvalidLabelName` if the label name is invalid.
    pub fn eq(name: impl Into<String>, value: impl Into<String>) -> Result<Self> {
        Self::new(name, value, MatchOp::Equal)
    }

    /// Creates an inequality matcher (`name!="value"`).
    ///
    /// # Errors
    ///
    /// Returns `ExprError::InvalidLabelName` if the label name is invalid.
    pub fn neq(name: impl Into<String>, value: impl Into<String>) -> Result<Self> {
        Self::new(name, value, MatchOp::NotEqual)
    }

    /// Creates a regex matcher (`name=~"value"`).
    ///
    /// # Errors
    ///
    /// Returns `ExprError::InvalidLabelName` if the label name is invalid.
    pub fn regex(name: impl Into<String>, value: impl Into<String>) -> Result<Self> {
        Self::new(name, value, MatchOp::RegexMatch)
    }

    /// Creates a negated regex matcher (`name!~"value"`).
    ///
    /// # Errors
    ///
    /// Returns `ExprError::InvalidLabelName` if the label name is invalid.
    pub fn not_regex(name: impl Into<String>, value: impl Into<String>) -> Result<Self> {
        Self::new(name, value, MatchOp::RegexNoMatch)
    }
}

impl std::fmt::Display for LabelMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}{}\"{}\"",
            self.name,
            self.op,
            escape_label_value(&self.value)
        )
    }
}

/// Checks whether a string is a valid PromQL label name.
///
/// Label names must be non-empty, start with a letter or underscore, and
/// contain only alphanumeric characters and underscores.
#[must_use]
pub fn is_valid_label_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Escapes a label value for embedding in a double-quoted PromQL string.
#[must_use]
pub fn escape_label_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Merges an incoming matcher list into an existing one.
///
/// For each incoming matcher, an existing matcher with the same name is
/// replaced in place (preserving its position for deterministic rendering);
/// otherwise the incoming matcher is appended at the end. Duplicate names
/// within `incoming` collapse last-wins.
///
/// Neither input is mutated; the result is a new, independently owned list.
#[must_use]
pub fn merge_matchers(existing: &[LabelMatcher], incoming: &[LabelMatcher]) -> Vec<LabelMatcher> {
    let mut merged = existing.to_vec();
    for matcher in incoming {
        match merged.iter_mut().find(|m| m.name == matcher.name) {
            Some(slot) => *slot = matcher.clone(),
            None => merged.push(matcher.clone()),
        }
    }
    merged
}
