//! Named PromQL query templates and ratio helpers for dashboards.
//!
//! `promforge-catalog` holds the canonical, named query fragments that
//! dashboards reference by symbolic key, plus the error-case percentage
//! helper that builds `100 * sum(rate(failures)) / sum(rate(total))`
//! ratios with consistent grouping on both sides.
//!
//! # Features
//!
//! - **Template registry**: An explicit owned object with lookup, expand,
//!   and last-write-wins override; missing keys fail fast instead of
//!   rendering a silently wrong panel
//! - **Canonical templates**: Object storage operation rate/errors/latency
//!   and HTTP request rate/errors/latency, parameterized over the
//!   `$namespace`/`$job` dashboard variables
//! - **Ratio helper**: One grouping argument drives both sides of the
//!   error-percentage division, so mismatched `by (...)` clauses are
//!   unrepresentable
//!
//! # Example
//!
//! ```rust
//! use promforge_catalog::{TemplateRegistry, templates};
//! use promforge_expr::LabelMatcher;
//!
//! let registry = TemplateRegistry::with_defaults().unwrap();
//!
//! // Expand a template for one dashboard panel.
//! let query = registry
//!     .expand(
//!         templates::REQUEST_RATE,
//!         &[LabelMatcher::eq("namespace", "prod").unwrap()],
//!     )
//!     .unwrap();
//!
//! assert!(query.to_string().contains("namespace=\"prod\""));
//! ```

pub mod error;
pub mod percentage;
pub mod registry;
pub mod templates;

// Re-export main types at crate root
pub use error::{CatalogError, Result};
pub use percentage::{CounterSpec, error_case_percentage};
pub use registry::TemplateRegistry;
