//! PromQL expression model, label matcher merging, and rendering.
//!
//! `promforge-expr` is the query layer of a monitoring-as-code pipeline:
//! dashboard and rule builders construct expression trees (or take them
//! from a template catalog), inject caller-supplied label matchers into
//! every selector, and render the result to PromQL text for embedding into
//! panel queries and alert rule `expr` fields.
//!
//! # Features
//!
//! - **Immutable expression trees**: Constructors return new nodes; the
//!   matcher merge is copy-on-write, so shared templates are never corrupted
//! - **Matcher merging**: Replace-by-name in place, append otherwise, with
//!   one unified algorithm behind both the typed and the pair-based entry
//!   points
//! - **Deterministic rendering**: Compact single-line output or multi-line
//!   indented output, both re-parseable by a standard PromQL parser
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use promforge_expr::{Expr, LabelMatcher, MetricName, VectorSelector};
//!
//! // sum by (job) (rate(http_requests_total{code="500"}[5m]))
//! let selector = VectorSelector::new(
//!     MetricName::new("http_requests_total").unwrap(),
//!     [LabelMatcher::eq("code", "500").unwrap()],
//! );
//! let template = Expr::sum_by(&["job"], Expr::rate(selector, Duration::from_secs(300))).unwrap();
//!
//! // Inject caller matchers: code is replaced in place, namespace appended.
//! let query = template.with_matchers(&[
//!     LabelMatcher::eq("namespace", "prod").unwrap(),
//!     LabelMatcher::regex("code", "4..").unwrap(),
//! ]);
//!
//! assert_eq!(
//!     query.to_string(),
//!     "sum by (job) (rate(http_requests_total{code=~\"4..\", namespace=\"prod\"}[5m]))"
//! );
//! ```

pub mod error;
pub mod expr;
pub mod matcher;
pub mod render;

// Re-export main types at crate root
pub use error::{ExprError, Result};
pub use expr::{
    AggregateExpr, AggregateOp, BinOp, BinaryExpr, CallExpr, Expr, Function, MatrixSelector,
    MetricName, VectorSelector,
};
pub use matcher::{LabelMatcher, MatchOp, merge_matchers};
pub use render::format_duration;
