//! The template registry.
//!
//! Dashboards look templates up by symbolic name and merge caller matchers
//! into an independent copy of the stored expression. The registry is an
//! explicit owned object so tests and callers can construct isolated
//! registries instead of mutating shared package state.
//!
//! Not concurrency-safe: mutation takes `&mut self` with no interior
//! locking. Initialize (and apply any overrides) once before concurrent
//! dashboard generation begins, or guard with external synchronization if
//! hot-reloading at runtime. The supported caller pattern is a
//! single-threaded batch CLI.

use std::collections::HashMap;

use promforge_expr::{Expr, LabelMatcher};
use tracing::debug;

use crate::error::{CatalogError, Result};
use crate::templates;

/// A registry of named query templates.
#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    templates: HashMap<String, Expr>,
}

impl TemplateRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry pre-populated with the canonical template set.
    ///
    /// # Errors
    ///
    /// Returns an error if a default template fails to build; the defaults
    /// are compile-time-known, so this only fires on a bug in the catalog
    /// itself.
    pub fn with_defaults() -> Result<Self> {
        let mut registry = Self::new();
        for (name, expr) in templates::defaults()? {
            registry.templates.insert(name, expr);
        }
        Ok(registry)
    }

    /// Returns the template registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::TemplateNotFound` if the key is absent. The
    /// vocabulary is closed, so callers treat this as a programmer error
    /// and fail fast; falling back to an empty query would render a
    /// silently wrong panel.
    pub fn lookup(&self, name: &str) -> Result<&Expr> {
        self.templates
            .get(name)
            .ok_or_else(|| CatalogError::TemplateNotFound {
                name: name.to_string(),
            })
    }

    /// Looks up a template and merges `matchers` into an independent copy.
    ///
    /// The stored template is never mutated; repeated expansions with
    /// different matcher lists are independent of each other.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::TemplateNotFound` if the key is absent.
    pub fn expand(&self, name: &str, matchers: &[LabelMatcher]) -> Result<Expr> {
        Ok(self.lookup(name)?.with_matchers(matchers))
    }

    /// Registers a template under `name`, replacing any existing entry.
    pub fn insert(&mut self, name: impl Into<String>, expr: Expr) {
        let name = name.into();
        if self.templates.contains_key(&name) {
            debug!(template = %name, "replacing registered template");
        }
        self.templates.insert(name, expr);
    }

    /// Replaces entries by key, last-write-wins.
    pub fn override_with(&mut self, entries: impl IntoIterator<Item = (String, Expr)>) {
        for (name, expr) in entries {
            self.insert(name, expr);
        }
    }

    /// Returns the registered template names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.templates.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Returns the number of registered templates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Returns `true` if no templates are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
