//! The error-case percentage helper.
//!
//! Builds the `100 * sum(rate(failures)) / sum(rate(total))` ratio idiom
//! with one grouping list driving both sides. Numerator and denominator
//! must carry identical `by (...)` clauses or the division silently
//! produces many-to-many match errors at PromQL evaluation time; taking a
//! single grouping argument makes that mismatch unrepresentable.

use std::time::Duration;

use promforge_expr::{Expr, LabelMatcher, MetricName, VectorSelector};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One side of a counter ratio: a metric, its matchers, and a rate window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounterSpec {
    /// The counter metric name.
    pub metric: MetricName,
    /// Label matchers applied to the selector.
    pub matchers: Vec<LabelMatcher>,
    /// The `rate(...)` lookback window.
    pub range: Duration,
}

impl CounterSpec {
    /// Creates a spec with no matchers.
    #[must_use]
    pub const fn new(metric: MetricName, range: Duration) -> Self {
        Self {
            metric,
            matchers: Vec::new(),
            range,
        }
    }

    /// Adds a matcher and returns self for chaining.
    #[must_use]
    pub fn matcher(mut self, matcher: LabelMatcher) -> Self {
        self.matchers.push(matcher);
        self
    }

    /// `sum by (grouping) (rate(metric{matchers}[range]))`.
    fn rate_sum(&self, grouping: &[&str]) -> Result<Expr> {
        let selector = VectorSelector::new(self.metric.clone(), self.matchers.iter().cloned());
        Ok(Expr::sum_by(grouping, Expr::rate(selector, self.range))?)
    }
}

/// Builds `100 * sum by (g) (rate(failure)) / sum by (g) (rate(total))`.
///
/// The single `grouping` argument is applied to both sides, so the two
/// `by (...)` clauses are identical by construction.
///
/// # Errors
///
/// Returns an error if a grouping label name is invalid.
pub fn error_case_percentage(
    failure: &CounterSpec,
    total: &CounterSpec,
    grouping: &[&str],
) -> Result<Expr> {
    let numerator = failure.rate_sum(grouping)?;
    let denominator = total.rate_sum(grouping)?;
    Ok(Expr::div(
        Expr::mul(Expr::number(100.0), numerator),
        denominator,
    ))
}
