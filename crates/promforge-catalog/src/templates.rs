//! The canonical named query templates.
//!
//! Each template is a parameterized expression over the dashboard variables
//! `$namespace` and `$job`, carried as ordinary matcher values and resolved
//! by the dashboarding layer at render time, not here. The vocabulary is a
//! closed, compile-time-known set; dashboards reference templates by the
//! name constants below.

use std::time::Duration;

use promforge_expr::{Expr, LabelMatcher, MetricName, VectorSelector};

use crate::error::Result;
use crate::percentage::{CounterSpec, error_case_percentage};

/// Per-second object storage operation rate, by job and operation.
pub const BUCKET_OPERATION_RATE: &str = "BucketOperationRate";
/// Percentage of failed object storage operations, by job and operation.
pub const BUCKET_OPERATION_ERRORS: &str = "BucketOperationErrors";
/// p99 object storage operation latency, by job and operation.
pub const BUCKET_OPERATION_DURATION_QUANTILE: &str = "BucketOperationDurationQuantile";
/// Per-second HTTP request rate, by job, handler, and code.
pub const REQUEST_RATE: &str = "RequestRate";
/// Percentage of HTTP requests answered with a 5xx code, by job and handler.
pub const REQUEST_ERRORS: &str = "RequestErrors";
/// p99 HTTP request latency, by job and handler.
pub const REQUEST_DURATION_QUANTILE: &str = "RequestDurationQuantile";

/// The default rate window used by the canonical templates.
const RATE_WINDOW: Duration = Duration::from_secs(300);

/// Matchers binding a selector to the dashboard's namespace and job
/// variables.
fn variable_matchers() -> Result<Vec<LabelMatcher>> {
    Ok(vec![
        LabelMatcher::eq("namespace", "$namespace")?,
        LabelMatcher::regex("job", "$job")?,
    ])
}

fn selector(metric: &str) -> Result<VectorSelector> {
    Ok(VectorSelector::new(
        MetricName::new(metric)?,
        variable_matchers()?,
    ))
}

fn rate_sum(metric: &str, grouping: &[&str]) -> Result<Expr> {
    Ok(Expr::sum_by(
        grouping,
        Expr::rate(selector(metric)?, RATE_WINDOW),
    )?)
}

fn duration_quantile(bucket_metric: &str, grouping: &[&str]) -> Result<Expr> {
    Ok(Expr::histogram_quantile(
        0.99,
        rate_sum(bucket_metric, grouping)?,
    ))
}

fn counter_spec(metric: &str) -> Result<CounterSpec> {
    let mut spec = CounterSpec::new(MetricName::new(metric)?, RATE_WINDOW);
    for matcher in variable_matchers()? {
        spec = spec.matcher(matcher);
    }
    Ok(spec)
}

fn bucket_operation_errors() -> Result<Expr> {
    error_case_percentage(
        &counter_spec("objstore_bucket_operation_failures_total")?,
        &counter_spec("objstore_bucket_operations_total")?,
        &["job", "operation"],
    )
}

fn request_errors() -> Result<Expr> {
    let failure =
        counter_spec("http_requests_total")?.matcher(LabelMatcher::regex("code", "5..")?);
    error_case_percentage(&failure, &counter_spec("http_requests_total")?, &["job", "handler"])
}

/// Builds the default template set.
pub(crate) fn defaults() -> Result<Vec<(String, Expr)>> {
    Ok(vec![
        (
            BUCKET_OPERATION_RATE.to_string(),
            rate_sum("objstore_bucket_operations_total", &["job", "operation"])?,
        ),
        (
            BUCKET_OPERATION_ERRORS.to_string(),
            bucket_operation_errors()?,
        ),
        (
            BUCKET_OPERATION_DURATION_QUANTILE.to_string(),
            duration_quantile(
                "objstore_bucket_operation_duration_seconds_bucket",
                &["job", "operation", "le"],
            )?,
        ),
        (
            REQUEST_RATE.to_string(),
            rate_sum("http_requests_total", &["job", "handler", "code"])?,
        ),
        (REQUEST_ERRORS.to_string(), request_errors()?),
        (
            REQUEST_DURATION_QUANTILE.to_string(),
            duration_quantile("http_request_duration_seconds_bucket", &["job", "handler", "le"])?,
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_the_full_vocabulary() {
        let templates = defaults().unwrap();
        let names: Vec<&str> = templates.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(
            names,
            vec![
                BUCKET_OPERATION_RATE,
                BUCKET_OPERATION_ERRORS,
                BUCKET_OPERATION_DURATION_QUANTILE,
                REQUEST_RATE,
                REQUEST_ERRORS,
                REQUEST_DURATION_QUANTILE,
            ]
        );
    }

    #[test]
    fn bucket_operation_rate_renders_expected_query() {
        let templates = defaults().unwrap();
        let (_, expr) = &templates[0];
        assert_eq!(
            expr.to_string(),
            "sum by (job, operation) (rate(objstore_bucket_operations_total\
             {namespace=\"$namespace\", job=~\"$job\"}[5m]))"
        );
    }

    #[test]
    fn every_template_carries_the_dashboard_variables() {
        for (name, expr) in defaults().unwrap() {
            let rendered = expr.to_string();
            assert!(
                rendered.contains("namespace=\"$namespace\""),
                "{name} missing namespace variable: {rendered}"
            );
            assert!(
                rendered.contains("job=~\"$job\""),
                "{name} missing job variable: {rendered}"
            );
        }
    }

    mod shape_tests {
        use super::*;
        use test_case::test_case;

        #[test_case(BUCKET_OPERATION_RATE, "sum by (job, operation) (" ; "bucket rate")]
        #[test_case(BUCKET_OPERATION_ERRORS, "100 * sum by (job, operation) (" ; "bucket errors")]
        #[test_case(BUCKET_OPERATION_DURATION_QUANTILE, "histogram_quantile(0.99, " ; "bucket quantile")]
        #[test_case(REQUEST_RATE, "sum by (job, handler, code) (" ; "request rate")]
        #[test_case(REQUEST_ERRORS, "100 * sum by (job, handler) (" ; "request errors")]
        #[test_case(REQUEST_DURATION_QUANTILE, "histogram_quantile(0.99, " ; "request quantile")]
        fn template_renders_expected_shape(name: &str, prefix: &str) {
            let templates = defaults().unwrap();
            let (_, expr) = templates.iter().find(|(n, _)| n.as_str() == name).unwrap();
            assert!(
                expr.to_string().starts_with(prefix),
                "{name} does not start with {prefix:?}: {expr}"
            );
        }
    }

    #[test]
    fn request_errors_keeps_the_code_matcher_on_the_numerator_only() {
        let templates = defaults().unwrap();
        let (_, expr) = templates
            .iter()
            .find(|(n, _)| n.as_str() == REQUEST_ERRORS)
            .unwrap();
        assert_eq!(expr.to_string().matches("code=~\"5..\"").count(), 1);
    }

    #[test]
    fn quantile_groupings_include_le() {
        let templates = defaults().unwrap();
        for name in [BUCKET_OPERATION_DURATION_QUANTILE, REQUEST_DURATION_QUANTILE] {
            let (_, expr) = templates.iter().find(|(n, _)| n.as_str() == name).unwrap();
            assert!(expr.to_string().contains("le"));
            assert!(expr.to_string().starts_with("histogram_quantile(0.99, "));
        }
    }
}
