//! The PromQL expression model.
//!
//! This module provides a minimal PromQL AST sufficient to express the
//! rate/sum/histogram_quantile/binary-op compositions used by dashboard
//! query templates:
//! - [`MetricName`]: A validated metric name
//! - [`VectorSelector`] / [`MatrixSelector`]: Series selectors
//! - [`Expr`]: The expression tree itself
//!
//! Expressions are logically immutable: every constructor returns a new
//! node owning the children passed in, and the matcher merge
//! ([`Expr::with_matchers`]) always produces a new tree. Structural sharing
//! of subtrees is safe until a merge rewrites them.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ExprError, Result};
use crate::matcher::{LabelMatcher, is_valid_label_name, merge_matchers};

/// A validated metric name.
///
/// Metric names must:
/// - Be non-empty
/// - Contain only alphanumeric characters, underscores, and colons
/// - Start with a letter, underscore, or colon
/// - Be at most 256 characters long
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MetricName(String);

impl MetricName {
    /// Maximum allowed length for a metric name.
    pub const MAX_LENGTH: usize = 256;

    /// Creates a new validated metric name.
    ///
    /// # Errors
    ///
    /// Returns `ExprError::InvalidMetricName` if the name is invalid.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();

        if name.is_empty() {
            return Err(ExprError::InvalidMetricName {
                reason: "metric name cannot be empty".to_string(),
            });
        }

        if name.len() > Self::MAX_LENGTH {
            return Err(ExprError::InvalidMetricName {
                reason: format!(
                    "metric name exceeds maximum length of {} characters",
                    Self::MAX_LENGTH
                ),
            });
        }

        let first_char = name.chars().next();
        if let Some(c) = first_char {
            if !c.is_ascii_alphabetic() && c != '_' && c != ':' {
                return Err(ExprError::InvalidMetricName {
                    reason: "metric name must start with a letter, underscore, or colon"
                        .to_string(),
                });
            }
        }

        for c in name.chars() {
            if !c.is_ascii_alphanumeric() && c != '_' && c != ':' {
                return Err(ExprError::InvalidMetricName {
                    reason: format!("invalid character '{c}' in metric name"),
                });
            }
        }

        Ok(Self(name))
    }

    /// Returns the metric name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MetricName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for MetricName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// An instant-vector selector: a metric name plus its label matchers.
///
/// Invariant: no two matchers share a name. Construction merges duplicate
/// names last-wins, so the invariant holds for any input list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorSelector {
    metric: MetricName,
    matchers: Vec<LabelMatcher>,
}

impl VectorSelector {
    /// Creates a new vector selector.
    ///
    /// Duplicate matcher names in the input collapse last-wins.
    #[must_use]
    pub fn new(metric: MetricName, matchers: impl IntoIterator<Item = LabelMatcher>) -> Self {
        let matchers: Vec<LabelMatcher> = matchers.into_iter().collect();
        Self {
            metric,
            matchers: merge_matchers(&[], &matchers),
        }
    }

    /// Returns the metric name.
    #[must_use]
    pub const fn metric(&self) -> &MetricName {
        &self.metric
    }

    /// Returns the matcher list, in rendering order.
    #[must_use]
    pub fn matchers(&self) -> &[LabelMatcher] {
        &self.matchers
    }

    /// Returns a new selector with `incoming` merged into the matcher set.
    #[must_use]
    pub fn merged(&self, incoming: &[LabelMatcher]) -> Self {
        Self {
            metric: self.metric.clone(),
            matchers: merge_matchers(&self.matchers, incoming),
        }
    }
}

/// A range-vector selector: a vector selector plus a time range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixSelector {
    /// The underlying vector selector.
    pub vector: VectorSelector,
    /// The lookback range (`[5m]`, `[1h]`, ...).
    pub range: Duration,
}

impl MatrixSelector {
    /// Creates a new matrix selector.
    #[must_use]
    pub const fn new(vector: VectorSelector, range: Duration) -> Self {
        Self { vector, range }
    }
}

/// Aggregation operators over instant vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateOp {
    /// Sum over dimensions.
    Sum,
    /// Average over dimensions.
    Avg,
    /// Minimum over dimensions.
    Min,
    /// Maximum over dimensions.
    Max,
    /// Count of series.
    Count,
}

impl AggregateOp {
    /// Returns the PromQL keyword for this operator.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Avg => "avg",
            Self::Min => "min",
            Self::Max => "max",
            Self::Count => "count",
        }
    }
}

/// Binary operators between expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinOp {
    /// Addition (`+`).
    Add,
    /// Subtraction (`-`).
    Sub,
    /// Multiplication (`*`).
    Mul,
    /// Division (`/`).
    Div,
    /// Greater-than comparison (`>`).
    GreaterThan,
    /// Less-than comparison (`<`).
    LessThan,
}

impl BinOp {
    /// Returns the PromQL token for this operator.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::GreaterThan => ">",
            Self::LessThan => "<",
        }
    }

    /// Returns the binding strength of this operator, higher binds tighter.
    ///
    /// Mirrors PromQL: `* /` bind tighter than `+ -`, which bind tighter
    /// than comparisons. All of these operators are left-associative.
    #[must_use]
    pub const fn precedence(&self) -> u8 {
        match self {
            Self::Mul | Self::Div => 3,
            Self::Add | Self::Sub => 2,
            Self::GreaterThan | Self::LessThan => 1,
        }
    }
}

/// PromQL functions supported by the expression model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Function {
    /// Per-second rate of a counter over a range vector.
    Rate,
    /// Instantaneous rate based on the last two samples.
    Irate,
    /// Total increase of a counter over a range vector.
    Increase,
    /// Quantile estimation from histogram buckets.
    HistogramQuantile,
    /// Clamp sample values to a lower bound.
    ClampMin,
    /// Clamp sample values to an upper bound.
    ClampMax,
}

impl Function {
    /// Returns the PromQL function name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Rate => "rate",
            Self::Irate => "irate",
            Self::Increase => "increase",
            Self::HistogramQuantile => "histogram_quantile",
            Self::ClampMin => "clamp_min",
            Self::ClampMax => "clamp_max",
        }
    }

    /// Returns the number of arguments this function takes.
    #[must_use]
    pub const fn arity(&self) -> usize {
        match self {
            Self::Rate | Self::Irate | Self::Increase => 1,
            Self::HistogramQuantile | Self::ClampMin | Self::ClampMax => 2,
        }
    }
}

/// An aggregation over a child expression, with optional `by (...)` grouping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateExpr {
    /// The aggregation operator.
    pub op: AggregateOp,
    /// Grouping labels for the `by (...)` clause; empty means no clause.
    pub grouping: Vec<String>,
    /// The aggregated expression.
    pub body: Box<Expr>,
}

/// A binary operation between two expressions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryExpr {
    /// The operator.
    pub op: BinOp,
    /// The left operand.
    pub lhs: Box<Expr>,
    /// The right operand.
    pub rhs: Box<Expr>,
}

/// A function call with its arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallExpr {
    /// The function being called.
    pub func: Function,
    /// The call arguments, in order.
    pub args: Vec<Expr>,
}

/// A PromQL expression tree.
///
/// The variants cover the shapes used by dashboard query templates. The
/// tree is recursive; aggregate, binary, and call nodes own child
/// expressions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    /// An instant-vector selector.
    Vector(VectorSelector),
    /// A range-vector selector.
    Matrix(MatrixSelector),
    /// An aggregation such as `sum by (...) (...)`.
    Aggregate(AggregateExpr),
    /// A binary operation between two expressions.
    Binary(BinaryExpr),
    /// A function call such as `rate(...)`.
    Call(CallExpr),
    /// A number literal.
    Number(f64),
    /// An explicitly parenthesized expression.
    Paren(Box<Expr>),
}

impl Expr {
    /// Wraps a vector selector.
    #[must_use]
    pub const fn vector(selector: VectorSelector) -> Self {
        Self::Vector(selector)
    }

    /// Wraps a vector selector with a lookback range.
    #[must_use]
    pub const fn matrix(selector: VectorSelector, range: Duration) -> Self {
        Self::Matrix(MatrixSelector::new(selector, range))
    }

    /// A number literal.
    #[must_use]
    pub const fn number(value: f64) -> Self {
        Self::Number(value)
    }

    /// Explicit parentheses around an expression.
    #[must_use]
    pub fn paren(expr: Self) -> Self {
        Self::Paren(Box::new(expr))
    }

    /// An aggregation with a `by (...)` grouping clause.
    ///
    /// An empty grouping list produces a bare aggregation with no clause.
    ///
    /// # Errors
    ///
    /// Returns `ExprError::InvalidLabelName` if a grouping label is not a
    /// valid PromQL label name.
    pub fn aggregate(op: AggregateOp, grouping: &[&str], body: Self) -> Result<Self> {
        for label in grouping {
            if !is_valid_label_name(label) {
                return Err(ExprError::InvalidLabelName {
                    name: (*label).to_string(),
                });
            }
        }
        Ok(Self::Aggregate(AggregateExpr {
            op,
            grouping: grouping.iter().map(|s| (*s).to_string()).collect(),
            body: Box::new(body),
        }))
    }

    /// `sum by (grouping) (body)`.
    ///
    /// # Errors
    ///
    /// Returns `ExprError::InvalidLabelName` if a grouping label is invalid.
    pub fn sum_by(grouping: &[&str], body: Self) -> Result<Self> {
        Self::aggregate(AggregateOp::Sum, grouping, body)
    }

    /// A function call, checked against the function's arity table.
    ///
    /// Arity mismatches fail here, at construction time, rather than
    /// surfacing as malformed text at render time.
    ///
    /// # Errors
    ///
    /// Returns `ExprError::WrongArity` if the argument count does not match
    /// the function's arity.
    pub fn call(func: Function, args: Vec<Self>) -> Result<Self> {
        if args.len() != func.arity() {
            return Err(ExprError::WrongArity {
                func: func.name(),
                expected: func.arity(),
                got: args.len(),
            });
        }
        Ok(Self::Call(CallExpr { func, args }))
    }

    /// `rate(selector[range])`. Infallible by signature.
    #[must_use]
    pub fn rate(selector: VectorSelector, range: Duration) -> Self {
        Self::Call(CallExpr {
            func: Function::Rate,
            args: vec![Self::matrix(selector, range)],
        })
    }

    /// `increase(selector[range])`. Infallible by signature.
    #[must_use]
    pub fn increase(selector: VectorSelector, range: Duration) -> Self {
        Self::Call(CallExpr {
            func: Function::Increase,
            args: vec![Self::matrix(selector, range)],
        })
    }

    /// `histogram_quantile(quantile, body)`. Infallible by signature.
    #[must_use]
    pub fn histogram_quantile(quantile: f64, body: Self) -> Self {
        Self::Call(CallExpr {
            func: Function::HistogramQuantile,
            args: vec![Self::Number(quantile), body],
        })
    }

    /// A binary operation.
    #[must_use]
    pub fn binary(op: BinOp, lhs: Self, rhs: Self) -> Self {
        Self::Binary(BinaryExpr {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    /// `lhs / rhs`.
    #[must_use]
    pub fn div(lhs: Self, rhs: Self) -> Self {
        Self::binary(BinOp::Div, lhs, rhs)
    }

    /// `lhs * rhs`.
    #[must_use]
    pub fn mul(lhs: Self, rhs: Self) -> Self {
        Self::binary(BinOp::Mul, lhs, rhs)
    }

    /// Returns a new tree with `incoming` merged into the matcher set of
    /// every vector and matrix selector reachable from this node.
    ///
    /// The traversal recurses into aggregate bodies, both binary operands,
    /// every call argument, and parenthesized children, so a caller-supplied
    /// matcher such as `namespace="foo"` applies to all selectors in a
    /// multi-selector template (e.g. a ratio of two `rate(...)` calls).
    ///
    /// The receiver is never mutated. An empty `incoming` list returns a
    /// structurally equal but independently owned copy.
    #[must_use]
    pub fn with_matchers(&self, incoming: &[LabelMatcher]) -> Self {
        match self {
            Self::Vector(v) => Self::Vector(v.merged(incoming)),
            Self::Matrix(m) => Self::Matrix(MatrixSelector {
                vector: m.vector.merged(incoming),
                range: m.range,
            }),
            Self::Aggregate(a) => Self::Aggregate(AggregateExpr {
                op: a.op,
                grouping: a.grouping.clone(),
                body: Box::new(a.body.with_matchers(incoming)),
            }),
            Self::Binary(b) => Self::Binary(BinaryExpr {
                op: b.op,
                lhs: Box::new(b.lhs.with_matchers(incoming)),
                rhs: Box::new(b.rhs.with_matchers(incoming)),
            }),
            Self::Call(c) => Self::Call(CallExpr {
                func: c.func,
                args: c.args.iter().map(|a| a.with_matchers(incoming)).collect(),
            }),
            Self::Number(n) => Self::Number(*n),
            Self::Paren(e) => Self::Paren(Box::new(e.with_matchers(incoming))),
        }
    }

    /// Adapter for callers holding plain `(name, value)` equality pairs.
    ///
    /// Normalizes the pairs into [`LabelMatcher`]s and delegates to
    /// [`Expr::with_matchers`]; both entry points share one merge algorithm.
    ///
    /// # Errors
    ///
    /// Returns `ExprError::InvalidLabelName` if a pair's name is invalid.
    pub fn with_matcher_pairs(&self, pairs: &[(&str, &str)]) -> Result<Self> {
        let matchers: Vec<LabelMatcher> = pairs
            .iter()
            .map(|(name, value)| LabelMatcher::eq(*name, *value))
            .collect::<Result<_>>()?;
        Ok(self.with_matchers(&matchers))
    }

    /// Counts the vector and matrix selectors in the tree.
    #[must_use]
    pub fn selector_count(&self) -> usize {
        match self {
            Self::Vector(_) | Self::Matrix(_) => 1,
            Self::Aggregate(a) => a.body.selector_count(),
            Self::Binary(b) => b.lhs.selector_count() + b.rhs.selector_count(),
            Self::Call(c) => c.args.iter().map(Self::selector_count).sum(),
            Self::Number(_) => 0,
            Self::Paren(e) => e.selector_count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::MatchOp;

    fn metric(name: &str) -> MetricName {
        MetricName::new(name).unwrap()
    }

    fn requests_template() -> Expr {
        // sum by (job) (rate(http_requests_total{code="500"}[5m]))
        let selector = VectorSelector::new(
            metric("http_requests_total"),
            [LabelMatcher::eq("code", "500").unwrap()],
        );
        Expr::sum_by(&["job"], Expr::rate(selector, Duration::from_secs(300))).unwrap()
    }

    mod metric_name_tests {
        use super::*;

        #[test]
        fn valid_metric_name() {
            let name = MetricName::new("objstore_bucket_operations_total");
            assert!(name.is_ok());
        }

        #[test]
        fn valid_metric_name_with_colons() {
            let name = MetricName::new("cluster:request_rate:sum");
            assert!(name.is_ok());
        }

        #[test]
        fn empty_metric_name_fails() {
            let name = MetricName::new("");
            assert!(name.is_err());
            match name {
                Err(ExprError::InvalidMetricName { reason }) => {
                    assert!(reason.contains("empty"));
                }
                _ => panic!("expected InvalidMetricName error"),
            }
        }

        #[test]
        fn metric_name_starting_with_number_fails() {
            assert!(MetricName::new("0_invalid").is_err());
        }

        #[test]
        fn metric_name_with_dash_fails() {
            assert!(MetricName::new("invalid-name").is_err());
        }

        #[test]
        fn metric_name_too_long_fails() {
            let long_name = "a".repeat(MetricName::MAX_LENGTH + 1);
            assert!(MetricName::new(long_name).is_err());
        }
    }

    mod constructor_tests {
        use super::*;

        #[test]
        fn vector_selector_collapses_duplicate_matcher_names() {
            let selector = VectorSelector::new(
                metric("up"),
                [
                    LabelMatcher::eq("job", "old").unwrap(),
                    LabelMatcher::eq("job", "new").unwrap(),
                ],
            );
            assert_eq!(selector.matchers().len(), 1);
            assert_eq!(selector.matchers()[0].value, "new");
        }

        #[test]
        fn call_with_correct_arity_succeeds() {
            let arg = Expr::matrix(
                VectorSelector::new(metric("up"), []),
                Duration::from_secs(300),
            );
            let call = Expr::call(Function::Rate, vec![arg]).unwrap();
            assert_eq!(call.to_string(), "rate(up[5m])");
        }

        #[test]
        fn call_with_wrong_arity_fails_at_construction() {
            let err = Expr::call(Function::HistogramQuantile, vec![Expr::number(0.99)]);
            match err {
                Err(ExprError::WrongArity {
                    func,
                    expected,
                    got,
                }) => {
                    assert_eq!(func, "histogram_quantile");
                    assert_eq!(expected, 2);
                    assert_eq!(got, 1);
                }
                _ => panic!("expected WrongArity error"),
            }
        }

        #[test]
        fn aggregate_rejects_invalid_grouping_label() {
            let body = Expr::vector(VectorSelector::new(metric("up"), []));
            let result = Expr::sum_by(&["job", "bad-label"], body);
            assert!(matches!(
                result,
                Err(ExprError::InvalidLabelName { name }) if name == "bad-label"
            ));
        }
    }

    mod with_matchers_tests {
        use super::*;

        #[test]
        fn replaces_existing_and_appends_new() {
            let template = requests_template();
            let merged = template
                .with_matchers(&[
                    LabelMatcher::eq("namespace", "prod").unwrap(),
                    LabelMatcher::regex("code", "4..").unwrap(),
                ])
                .to_string();

            assert_eq!(
                merged,
                "sum by (job) (rate(http_requests_total{code=~\"4..\", namespace=\"prod\"}[5m]))"
            );
        }

        #[test]
        fn template_is_not_mutated_by_merges() {
            let template = requests_template();
            let before = template.to_string();

            let first = template.with_matchers(&[LabelMatcher::eq("namespace", "a").unwrap()]);
            let second = template.with_matchers(&[LabelMatcher::eq("namespace", "b").unwrap()]);

            assert_eq!(template.to_string(), before);
            assert!(first.to_string().contains("namespace=\"a\""));
            assert!(second.to_string().contains("namespace=\"b\""));
        }

        #[test]
        fn empty_list_returns_equal_but_independent_copy() {
            let template = requests_template();
            let copy = template.with_matchers(&[]);
            assert_eq!(copy, template);
        }

        #[test]
        fn merge_reaches_every_selector_in_a_ratio() {
            let errors = VectorSelector::new(metric("foo_errors_total"), []);
            let total = VectorSelector::new(metric("foo_total"), []);
            let range = Duration::from_secs(300);
            let ratio = Expr::div(
                Expr::sum_by(&["job"], Expr::rate(errors, range)).unwrap(),
                Expr::sum_by(&["job"], Expr::rate(total, range)).unwrap(),
            );

            let merged = ratio
                .with_matchers(&[LabelMatcher::eq("namespace", "ns1").unwrap()])
                .to_string();

            assert_eq!(merged.matches("namespace=\"ns1\"").count(), 2);
        }

        #[test]
        fn merge_reaches_selectors_behind_parens_and_calls() {
            let buckets = VectorSelector::new(metric("req_duration_seconds_bucket"), []);
            let expr = Expr::paren(Expr::histogram_quantile(
                0.99,
                Expr::sum_by(
                    &["le"],
                    Expr::rate(buckets, Duration::from_secs(300)),
                )
                .unwrap(),
            ));

            let merged = expr.with_matchers(&[LabelMatcher::eq("job", "api").unwrap()]);
            assert!(merged.to_string().contains("job=\"api\""));
        }

        #[test]
        fn pair_adapter_matches_typed_entry_point() {
            let template = requests_template();
            let via_pairs = template
                .with_matcher_pairs(&[("namespace", "prod")])
                .unwrap();
            let via_typed =
                template.with_matchers(&[LabelMatcher::eq("namespace", "prod").unwrap()]);
            assert_eq!(via_pairs, via_typed);
        }

        #[test]
        fn pair_adapter_rejects_invalid_name() {
            let template = requests_template();
            assert!(template.with_matcher_pairs(&[("bad-name", "x")]).is_err());
        }

        #[test]
        fn selector_count_sees_the_whole_tree() {
            let errors = VectorSelector::new(metric("a_total"), []);
            let total = VectorSelector::new(metric("b_total"), []);
            let range = Duration::from_secs(60);
            let ratio = Expr::div(
                Expr::rate(errors, range),
                Expr::rate(total, range),
            );
            assert_eq!(ratio.selector_count(), 2);
            assert_eq!(Expr::number(1.0).selector_count(), 0);
        }
    }

    mod serde_tests {
        use super::*;

        #[test]
        fn expr_serialization_roundtrip() {
            let original = requests_template();

            let json = serde_json::to_string(&original).unwrap();
            let parsed: Expr = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed, original);
        }
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn fresh_matchers(names: &[String]) -> Vec<LabelMatcher> {
            names
                .iter()
                .map(|n| LabelMatcher::new(n.clone(), "v", MatchOp::Equal).unwrap())
                .collect()
        }

        proptest! {
            // Labels that do not collide with the template's own matchers
            // ("code") or grouping ("job") leave the template's matchers in
            // place and append at the end.
            #[test]
            fn disjoint_merge_appends_and_preserves(
                names in prop::collection::hash_set("[a-m_][a-z0-9_]{2,8}", 1..5),
            ) {
                let names: Vec<String> = names
                    .into_iter()
                    .filter(|n| n != "code" && n != "job")
                    .collect();
                let template = requests_template();
                let merged = template.with_matchers(&fresh_matchers(&names));

                let rendered = merged.to_string();
                prop_assert!(rendered.contains("code=\"500\""));
                for name in &names {
                    let expected = format!("{name}=\"v\"");
                    prop_assert!(rendered.contains(&expected));
                }
                // Original template untouched.
                prop_assert!(!template.to_string().contains("=\"v\""));
            }

            #[test]
            fn merge_is_idempotent(
                names in prop::collection::hash_set("[a-m_][a-z0-9_]{2,8}", 1..5),
            ) {
                let names: Vec<String> = names.into_iter().collect();
                let matchers = fresh_matchers(&names);
                let template = requests_template();

                let once = template.with_matchers(&matchers);
                let twice = once.with_matchers(&matchers);
                prop_assert_eq!(once, twice);
            }
        }
    }
}
