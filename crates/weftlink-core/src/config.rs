use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Linking configuration for one invocation.
///
/// Loading and merging configuration files is the caller's concern; the CLI
/// builds this struct from flags.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinkerConfig {
    /// Directory roots to scan for packages.
    pub roots: Vec<PathBuf>,

    /// Convention-based fallback sources: scope prefix -> directory holding
    /// that scope's package checkouts (absolute, or relative to the
    /// invocation root). Consulted when a package is not already globally
    /// registered.
    pub scope_roots: BTreeMap<String, PathBuf>,

    /// Dependency-name patterns (literal, or `prefix*`) that are link
    /// candidates even though they are not under the package's own scope.
    pub externals: Vec<String>,
}

impl LinkerConfig {
    /// Create a config scanning the given roots.
    #[must_use]
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self {
            roots,
            ..Default::default()
        }
    }

    /// Add a scope-root fallback mapping.
    #[must_use]
    pub fn with_scope_root(mut self, scope: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        self.scope_roots.insert(scope.into(), dir.into());
        self
    }

    /// Add an external link-candidate pattern.
    #[must_use]
    pub fn with_external(mut self, pattern: impl Into<String>) -> Self {
        self.externals.push(pattern.into());
        self
    }

    /// Whether `name` matches one of the configured external patterns.
    ///
    /// A pattern ending in `*` matches any name with that prefix; any other
    /// pattern matches literally.
    #[must_use]
    pub fn matches_external(&self, name: &str) -> bool {
        self.externals.iter().any(|pattern| {
            pattern
                .strip_suffix('*')
                .map_or(pattern == name, |prefix| name.starts_with(prefix))
        })
    }
}
