//! Error types for the promforge-catalog crate.

use thiserror::Error;

/// Errors that can occur while working with the template catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// No template is registered under the given name.
    ///
    /// The template vocabulary is a closed, compile-time-known set, so a
    /// missing key is a programmer error. Callers should fail fast rather
    /// than fall back to an empty query, which would render a silently
    /// wrong dashboard panel.
    #[error("template not found: {name}")]
    TemplateNotFound {
        /// The template name that was not found.
        name: String,
    },

    /// An underlying expression could not be constructed.
    #[error(transparent)]
    Expr(#[from] promforge_expr::ExprError),
}

/// Result type for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;
