//! On-demand queries over the scanned package tree.
//!
//! There is no materialized dependency graph: the workspace is rescanned
//! fresh on every invocation, and consumer relationships are answered by
//! inspecting dependency maps at query time. Manifests that fail to parse
//! are logged and skipped; they never abort a query.

use crate::manifest::read_manifest;
use crate::scan::scan_roots;
use std::path::{Path, PathBuf};
use tracing::warn;

/// A package matched by a scope query.
#[derive(Debug, Clone)]
pub struct ScopeMatch {
    pub name: String,
    pub dir: PathBuf,
    /// Whether this is the exact requested package, as opposed to an
    /// incidental member of the same scope.
    pub is_source_match: bool,
}

/// A package whose manifest declares a dependency on the query target.
#[derive(Debug, Clone)]
pub struct Consumer {
    /// Manifest name, or the directory name for nameless manifests.
    pub name: String,
    pub dir: PathBuf,
}

/// Find packages under `scope`, or exactly `exact` when given.
///
/// Nameless manifests are excluded from results (but not from the scan).
/// Result order is scan order.
#[must_use]
pub fn find_by_scope(roots: &[PathBuf], scope: &str, exact: Option<&str>) -> Vec<ScopeMatch> {
    let prefix = format!("{scope}/");
    let mut matches = Vec::new();

    for location in scan_roots(roots) {
        let manifest = match read_manifest(&location.manifest_path) {
            Ok(manifest) => manifest,
            Err(err) => {
                warn!("skipping manifest: {err}");
                continue;
            }
        };
        let Some(name) = manifest.name else {
            continue;
        };

        let in_scope = name.starts_with(&prefix);
        let is_source_match = match exact {
            Some(exact) => name == exact,
            None => in_scope,
        };

        if in_scope || is_source_match {
            matches.push(ScopeMatch {
                name,
                dir: location.dir,
                is_source_match,
            });
        }
    }

    matches
}

/// Find every package whose manifest declares a dependency (of any kind) on
/// `target`. A package literally named `target` is never its own consumer.
#[must_use]
pub fn find_consumers(roots: &[PathBuf], target: &str) -> Vec<Consumer> {
    let mut consumers = Vec::new();

    for location in scan_roots(roots) {
        let manifest = match read_manifest(&location.manifest_path) {
            Ok(manifest) => manifest,
            Err(err) => {
                warn!("skipping manifest: {err}");
                continue;
            }
        };

        if manifest.name.as_deref() == Some(target) {
            continue;
        }

        if manifest.depends_on(target) {
            let name = manifest
                .name
                .unwrap_or_else(|| display_name(&location.dir));
            consumers.push(Consumer {
                name,
                dir: location.dir,
            });
        }
    }

    consumers
}

pub(crate) fn display_name(dir: &Path) -> String {
    dir.file_name()
        .map_or_else(|| dir.display().to_string(), |n| n.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn put_package(root: &Path, rel: &str, manifest: &str) {
        let dir = root.join(rel);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("package.json"), manifest).unwrap();
    }

    #[test]
    fn test_find_by_scope_matches_scope_members_only() {
        let root = tempdir().unwrap();
        put_package(root.path(), "core", r#"{"name": "@acme/core"}"#);
        put_package(root.path(), "ui", r#"{"name": "@acme/ui"}"#);
        put_package(root.path(), "other", r#"{"name": "@other/thing"}"#);
        put_package(root.path(), "plain", r#"{"name": "lodash"}"#);

        let roots = vec![root.path().to_path_buf()];
        let matches = find_by_scope(&roots, "@acme", None);

        let mut names: Vec<&str> = matches.iter().map(|m| m.name.as_str()).collect();
        names.sort_unstable();
        assert_eq!(names, ["@acme/core", "@acme/ui"]);
        assert!(matches.iter().all(|m| m.is_source_match));
    }

    #[test]
    fn test_find_by_scope_exact_flags_source_match() {
        let root = tempdir().unwrap();
        put_package(root.path(), "core", r#"{"name": "@acme/core"}"#);
        put_package(root.path(), "ui", r#"{"name": "@acme/ui"}"#);

        let roots = vec![root.path().to_path_buf()];
        let matches = find_by_scope(&roots, "@acme", Some("@acme/core"));

        assert_eq!(matches.len(), 2);
        for m in &matches {
            assert_eq!(m.is_source_match, m.name == "@acme/core");
        }
    }

    #[test]
    fn test_find_by_scope_excludes_nameless() {
        let root = tempdir().unwrap();
        put_package(root.path(), "anon", r#"{"dependencies": {"@acme/core": "*"}}"#);
        put_package(root.path(), "core", r#"{"name": "@acme/core"}"#);

        let roots = vec![root.path().to_path_buf()];
        let matches = find_by_scope(&roots, "@acme", None);
        assert_eq!(matches.len(), 1);
    }

    #[test]
    fn test_find_by_scope_skips_unparseable() {
        let root = tempdir().unwrap();
        put_package(root.path(), "bad", "not json {{{");
        put_package(root.path(), "core", r#"{"name": "@acme/core"}"#);

        let roots = vec![root.path().to_path_buf()];
        let matches = find_by_scope(&roots, "@acme", None);
        assert_eq!(matches.len(), 1);
    }

    #[test]
    fn test_find_consumers_across_dependency_kinds() {
        let root = tempdir().unwrap();
        put_package(
            root.path(),
            "app",
            r#"{"name": "@acme/app", "dependencies": {"@acme/core": "^1.0"}}"#,
        );
        put_package(
            root.path(),
            "plugin",
            r#"{"name": "@acme/plugin", "peerDependencies": {"@acme/core": "^1.0"}}"#,
        );
        put_package(
            root.path(),
            "unrelated",
            r#"{"name": "@acme/unrelated", "dependencies": {"react": "^18"}}"#,
        );
        put_package(root.path(), "core", r#"{"name": "@acme/core"}"#);

        let roots = vec![root.path().to_path_buf()];
        let consumers = find_consumers(&roots, "@acme/core");

        let mut names: Vec<&str> = consumers.iter().map(|c| c.name.as_str()).collect();
        names.sort_unstable();
        assert_eq!(names, ["@acme/app", "@acme/plugin"]);
    }

    #[test]
    fn test_find_consumers_reports_once_for_multiple_kinds() {
        let root = tempdir().unwrap();
        put_package(
            root.path(),
            "app",
            r#"{
                "name": "@acme/app",
                "dependencies": {"@acme/core": "^1.0"},
                "devDependencies": {"@acme/core": "^1.0"}
            }"#,
        );

        let roots = vec![root.path().to_path_buf()];
        let consumers = find_consumers(&roots, "@acme/core");
        assert_eq!(consumers.len(), 1);
    }

    #[test]
    fn test_find_consumers_includes_nameless_manifest() {
        let root = tempdir().unwrap();
        put_package(root.path(), "anon", r#"{"dependencies": {"@acme/core": "*"}}"#);

        let roots = vec![root.path().to_path_buf()];
        let consumers = find_consumers(&roots, "@acme/core");
        assert_eq!(consumers.len(), 1);
        assert_eq!(consumers[0].name, "anon");
    }
}
