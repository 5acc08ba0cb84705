//! Error types for the promforge-expr crate.

use thiserror::Error;

/// Errors that can occur while constructing PromQL expressions.
#[derive(Debug, Error)]
pub enum ExprError {
    /// The metric name is invalid (empty or contains invalid characters).
    #[error("invalid metric name: {reason}")]
    InvalidMetricName {
        /// The reason the name is invalid.
        reason: String,
    },

    /// The label name is invalid (empty or contains invalid characters).
    #[error("invalid label name: {name:?}")]
    InvalidLabelName {
        /// The label name that was rejected.
        name: String,
    },

    /// A function call was built with the wrong number of arguments.
    #[error("wrong arity for {func}: expected {expected}, got {got}")]
    WrongArity {
        /// The PromQL function name.
        func: &'static str,
        /// The number of arguments the function takes.
        expected: usize,
        /// The number of arguments that were supplied.
        got: usize,
    },
}

/// Result type for expression operations.
pub type Result<T> = std::result::Result<T, ExprError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_invalid_metric_name() {
        let err = ExprError::InvalidMetricName {
            reason: "empty name".to_string(),
        };
        assert_eq!(err.to_string(), "invalid metric name: empty name");
    }

    #[test]
    fn error_display_invalid_label_name() {
        let err = ExprError::InvalidLabelName {
            name: "bad-label".to_string(),
        };
        assert_eq!(err.to_string(), "invalid label name: \"bad-label\"");
    }

    #[test]
    fn error_display_wrong_arity() {
        let err = ExprError::WrongArity {
            func: "histogram_quantile",
            expected: 2,
            got: 1,
        };
        assert_eq!(
            err.to_string(),
            "wrong arity for histogram_quantile: expected 2, got 1"
        );
    }
}
