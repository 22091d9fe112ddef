//! The linking entry points: self-link, targeted link, and status.
//!
//! Self-link is a low-stakes convenience and favors availability: one
//! dependency failing to link never aborts the batch, and the result is a
//! best-effort summary. A targeted link is an explicit request to propagate
//! a source package across its consumers and favors correctness: any failure
//! anywhere in the chain aborts the whole request with a named cause. The
//! asymmetry is deliberate and load-bearing; do not unify the two paths.

use crate::compat::find_compatibility_problems;
use crate::config::LinkerConfig;
use crate::error::CoreError;
use crate::index::{display_name, find_by_scope, find_consumers};
use crate::manifest::{package_scope, read_manifest, Manifest, MANIFEST_FILE};
use crate::pm;
use crate::reconcile::{reconcile, ReconcileOutcome};
use crate::registry::list_global_links;
use crate::scan::scan_roots;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use weftlink_util::fs::{absolutize, atomic_write, relative_from};

/// Workspace-override file written after a self-link, recording each linked
/// dependency as a `link:` specifier so other tooling can see the overrides.
pub const OVERRIDES_FILE: &str = "weft-links.json";

/// Best-effort result of a self-link run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelfLinkSummary {
    /// The package that was registered and had its dependencies linked.
    pub package: String,
    /// Every link candidate, sorted by name.
    pub requested: Vec<String>,
    pub linked: Vec<LinkedCandidate>,
    pub skipped: Vec<SkippedCandidate>,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedCandidate {
    pub name: String,
    pub source: PathBuf,
    pub outcome: ReconcileOutcome,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedCandidate {
    pub name: String,
    pub reason: String,
}

/// Result of a targeted link run. Only produced when every step succeeded.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetLinkReport {
    pub target: String,
    pub sources: Vec<SourceLink>,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceLink {
    pub name: String,
    pub dir: PathBuf,
    pub consumers: Vec<ConsumerLink>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumerLink {
    pub name: String,
    pub dir: PathBuf,
    pub outcome: ReconcileOutcome,
}

/// Read-only status report over the configured roots.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub packages: Vec<PackageStatus>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageStatus {
    pub name: String,
    pub dir: PathBuf,
    pub links: Vec<LinkedDep>,
    /// Linked dependencies whose version fails the declared range.
    pub incompatible: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedDep {
    pub name: String,
    /// The symlink target exactly as stored in the slot.
    pub target: PathBuf,
    /// Absolute resolution of the target.
    pub resolved: PathBuf,
    /// Whether the link escapes the configured workspace roots.
    pub external: bool,
}

/// Register the current package and link its same-scope and configured
/// external dependencies.
///
/// Hard-fails only when the manifest cannot be read, lacks a name, or
/// self-registration fails; everything after that is per-dependency
/// best-effort.
pub fn self_link(
    cwd: &Path,
    config: &LinkerConfig,
    dry_run: bool,
) -> Result<SelfLinkSummary, CoreError> {
    let manifest_path = cwd.join(MANIFEST_FILE);
    let manifest = read_manifest(&manifest_path)?;
    let package = manifest.name.clone().ok_or(CoreError::ManifestUnnamed {
        path: manifest_path,
    })?;

    if !dry_run {
        pm::register_link(cwd).map_err(|e| CoreError::Register {
            package: package.clone(),
            reason: e.to_string(),
        })?;
    }

    // Dry run never talks to the package manager: the registry reads as
    // empty, and only the conventional scope-root fallback (plain filesystem
    // lookups) can resolve candidates for the report.
    let registry = if dry_run {
        BTreeMap::new()
    } else {
        list_global_links()
    };

    let requested = link_candidates(&manifest, config);
    let mut linked = Vec::new();
    let mut skipped = Vec::new();

    for name in &requested {
        let Some(source) = resolve_source(name, &registry, config, cwd, dry_run) else {
            skipped.push(SkippedCandidate {
                name: name.clone(),
                reason: "not registered and no scope-root candidate".into(),
            });
            continue;
        };

        match reconcile(name, &source, cwd, dry_run) {
            Ok(outcome) => linked.push(LinkedCandidate {
                name: name.clone(),
                source,
                outcome,
            }),
            Err(err) => {
                warn!(dependency = name.as_str(), "link failed: {err}");
                skipped.push(SkippedCandidate {
                    name: name.clone(),
                    reason: err.to_string(),
                });
            }
        }
    }

    if !dry_run {
        if let Err(err) = write_overrides(cwd, &linked) {
            warn!("failed to write {OVERRIDES_FILE}: {err}");
        }
        if let Err(err) = pm::refresh_lockfile(cwd) {
            warn!(package = package.as_str(), "lockfile refresh failed: {err}");
        }
    }

    info!(
        package = package.as_str(),
        linked = linked.len(),
        requested = requested.len(),
        "self-link finished"
    );

    Ok(SelfLinkSummary {
        package,
        requested,
        linked,
        skipped,
        dry_run,
    })
}

/// Link every source package matching `target` into every one of its
/// consumers. Fail-fast: the first registration or consumer-link failure
/// aborts the run.
pub fn link_target(
    config: &LinkerConfig,
    target: &str,
    dry_run: bool,
) -> Result<TargetLinkReport, CoreError> {
    if !target.starts_with('@') {
        return Err(CoreError::TargetNotScoped {
            target: target.to_string(),
        });
    }

    let (scope, exact) = match target.split_once('/') {
        Some((scope, _)) => (scope, Some(target)),
        None => (target, None),
    };

    let matches = find_by_scope(&config.roots, scope, exact);
    let mut sources = Vec::new();

    for source in matches.into_iter().filter(|m| m.is_source_match) {
        if !dry_run {
            pm::register_link(&source.dir).map_err(|e| CoreError::Register {
                package: source.name.clone(),
                reason: e.to_string(),
            })?;
        }

        let mut consumers = Vec::new();
        for consumer in find_consumers(&config.roots, &source.name) {
            let outcome = reconcile(&source.name, &source.dir, &consumer.dir, dry_run).map_err(
                |err| CoreError::ConsumerLink {
                    source_pkg: source.name.clone(),
                    consumer: consumer.name.clone(),
                    reason: err.to_string(),
                },
            )?;
            consumers.push(ConsumerLink {
                name: consumer.name,
                dir: consumer.dir,
                outcome,
            });
        }

        info!(
            source = source.name.as_str(),
            consumers = consumers.len(),
            "propagated link"
        );
        sources.push(SourceLink {
            name: source.name,
            dir: source.dir,
            consumers,
        });
    }

    Ok(TargetLinkReport {
        target: target.to_string(),
        sources,
        dry_run,
    })
}

/// Walk the configured roots and report every dependency slot that is
/// currently a symlink, plus the compatibility audit for linked versions.
/// Performs no mutation.
#[must_use]
pub fn status(config: &LinkerConfig) -> StatusReport {
    let roots: Vec<PathBuf> = config
        .roots
        .iter()
        .map(|root| dunce::canonicalize(root).unwrap_or_else(|_| absolutize(root)))
        .collect();

    let mut packages = Vec::new();
    for location in scan_roots(&config.roots) {
        let manifest = match read_manifest(&location.manifest_path) {
            Ok(manifest) => manifest,
            Err(err) => {
                warn!("skipping manifest: {err}");
                continue;
            }
        };

        let links = collect_links(&location.dir, &roots);

        let mut linked_versions = BTreeMap::new();
        for link in &links {
            if let Ok(target_manifest) = read_manifest(&link.resolved.join(MANIFEST_FILE)) {
                if let Some(version) = target_manifest.version {
                    linked_versions.insert(link.name.clone(), version);
                }
            }
        }
        let incompatible = find_compatibility_problems(&manifest, &linked_versions);

        let name = manifest
            .name
            .unwrap_or_else(|| display_name(&location.dir));
        packages.push(PackageStatus {
            name,
            dir: location.dir,
            links,
            incompatible,
        });
    }

    StatusReport { packages }
}

/// Compute the link candidates of `manifest`: dependencies under its own
/// scope plus configured external patterns, deduplicated and sorted.
#[must_use]
pub fn link_candidates(manifest: &Manifest, config: &LinkerConfig) -> Vec<String> {
    let own_scope = manifest.scope();

    let mut candidates: Vec<String> = manifest
        .iter_all()
        .filter_map(|(_, name, _)| {
            if Some(name) == manifest.name.as_deref() {
                return None;
            }
            let same_scope = own_scope.is_some() && package_scope(name) == own_scope;
            (same_scope || config.matches_external(name)).then(|| name.to_string())
        })
        .collect();

    candidates.sort();
    candidates.dedup();
    candidates
}

/// Resolve a candidate to its source directory: the global registry first,
/// then the conventional location under the configured scope root, which is
/// registered on the fly when found.
fn resolve_source(
    name: &str,
    registry: &BTreeMap<String, PathBuf>,
    config: &LinkerConfig,
    invocation_root: &Path,
    dry_run: bool,
) -> Option<PathBuf> {
    if let Some(dir) = registry.get(name) {
        return Some(dir.clone());
    }

    let scope = package_scope(name)?;
    let bare = &name[scope.len() + 1..];
    let base = config.scope_roots.get(scope)?;
    let base = if base.is_absolute() {
        base.clone()
    } else {
        invocation_root.join(base)
    };
    let candidate = base.join(bare);

    let manifest = read_manifest(&candidate.join(MANIFEST_FILE)).ok()?;
    if manifest.name.as_deref() != Some(name) {
        warn!(
            dependency = name,
            "scope-root candidate at {} is named {:?}; ignoring",
            candidate.display(),
            manifest.name
        );
        return None;
    }

    if !dry_run {
        if let Err(err) = pm::register_link(&candidate) {
            warn!(dependency = name, "failed to register scope-root candidate: {err}");
            return None;
        }
    }
    Some(candidate)
}

fn write_overrides(cwd: &Path, linked: &[LinkedCandidate]) -> std::io::Result<()> {
    if linked.is_empty() {
        return Ok(());
    }

    let cwd = absolutize(cwd);
    let overrides: BTreeMap<&str, String> = linked
        .iter()
        .map(|link| {
            let rel = relative_from(&cwd, &absolutize(&link.source));
            (link.name.as_str(), format!("link:{}", rel.display()))
        })
        .collect();

    let mut out = serde_json::to_string_pretty(&overrides).map_err(std::io::Error::other)?;
    out.push('\n');
    atomic_write(&cwd.join(OVERRIDES_FILE), out.as_bytes())
}

fn collect_links(pkg_dir: &Path, roots: &[PathBuf]) -> Vec<LinkedDep> {
    let node_modules = pkg_dir.join("node_modules");
    let Ok(entries) = fs::read_dir(&node_modules) else {
        return Vec::new();
    };

    let mut links = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        let file_name = entry.file_name().to_string_lossy().into_owned();
        let Ok(meta) = fs::symlink_metadata(&path) else {
            continue;
        };

        if meta.file_type().is_symlink() {
            push_link(&mut links, &file_name, &path, roots);
        } else if meta.is_dir() && file_name.starts_with('@') {
            // Scope directory: the actual slots are one level down.
            let Ok(scoped) = fs::read_dir(&path) else {
                continue;
            };
            for scoped_entry in scoped.flatten() {
                let scoped_path = scoped_entry.path();
                let Ok(scoped_meta) = fs::symlink_metadata(&scoped_path) else {
                    continue;
                };
                if scoped_meta.file_type().is_symlink() {
                    let dep = format!(
                        "{file_name}/{}",
                        scoped_entry.file_name().to_string_lossy()
                    );
                    push_link(&mut links, &dep, &scoped_path, roots);
                }
            }
        }
    }

    links
}

fn push_link(links: &mut Vec<LinkedDep>, name: &str, slot: &Path, roots: &[PathBuf]) {
    let Ok(target) = fs::read_link(slot) else {
        return;
    };

    let raw = if target.is_absolute() {
        target.clone()
    } else {
        slot.parent()
            .map_or_else(|| target.clone(), |parent| parent.join(&target))
    };
    // Canonicalize when the target exists; fall back to a lexical resolution
    // so dangling links still classify.
    let resolved = dunce::canonicalize(&raw).unwrap_or_else(|_| absolutize(&raw));

    let external =
        target.is_absolute() || !roots.iter().any(|root| resolved.starts_with(root));

    links.push(LinkedDep {
        name: name.to_string(),
        target,
        resolved,
        external,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn put_package(root: &Path, rel: &str, manifest: &str) -> PathBuf {
        let dir = root.join(rel);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(MANIFEST_FILE), manifest).unwrap();
        dir
    }

    fn manifest_from(json: &str) -> Manifest {
        let dir = tempdir().unwrap();
        let path = dir.path().join(MANIFEST_FILE);
        fs::write(&path, json).unwrap();
        read_manifest(&path).unwrap()
    }

    #[test]
    fn test_link_candidates_same_scope_and_externals() {
        let manifest = manifest_from(
            r#"{
                "name": "@acme/app",
                "dependencies": {"@acme/core": "^1.0", "react": "^18"},
                "devDependencies": {"@acme/testkit": "^1.0"},
                "peerDependencies": {"@other/thing": "^1.0"},
                "optionalDependencies": {"@tooling/lint": "^2.0"}
            }"#,
        );

        let config = LinkerConfig::default().with_external("@tooling/*");
        let candidates = link_candidates(&manifest, &config);
        assert_eq!(candidates, ["@acme/core", "@acme/testkit", "@tooling/lint"]);
    }

    #[test]
    fn test_link_candidates_nameless_manifest_uses_externals_only() {
        let manifest = manifest_from(
            r#"{"dependencies": {"@acme/core": "^1.0", "left-pad": "^1.0"}}"#,
        );

        let config = LinkerConfig::default().with_external("left-pad");
        assert_eq!(link_candidates(&manifest, &config), ["left-pad"]);
    }

    #[test]
    fn test_link_target_rejects_unscoped_before_io() {
        let config = LinkerConfig::new(vec![PathBuf::from("/nonexistent")]);
        let err = link_target(&config, "lodash", true).unwrap_err();
        assert_eq!(err.code(), "TARGET_NOT_SCOPED");
    }

    #[test]
    fn test_link_target_dry_run_propagates_to_consumers() {
        let ws = tempdir().unwrap();
        put_package(ws.path(), "packages/core", r#"{"name": "@acme/core"}"#);
        put_package(
            ws.path(),
            "packages/app",
            r#"{"name": "@acme/app", "dependencies": {"@acme/core": "^1.0"}}"#,
        );
        put_package(
            ws.path(),
            "packages/plugin",
            r#"{"name": "@acme/plugin", "peerDependencies": {"@acme/core": "^1.0"}}"#,
        );

        let config = LinkerConfig::new(vec![ws.path().to_path_buf()]);
        let report = link_target(&config, "@acme/core", true).unwrap();

        assert_eq!(report.sources.len(), 1);
        assert_eq!(report.sources[0].name, "@acme/core");
        assert_eq!(report.sources[0].consumers.len(), 2);
        // Dry run: nothing written.
        assert!(!ws.path().join("packages/app/node_modules").exists());
        assert!(!ws.path().join("packages/plugin/node_modules").exists());
    }

    #[test]
    fn test_link_target_scope_wide_matches_all_members() {
        let ws = tempdir().unwrap();
        put_package(ws.path(), "core", r#"{"name": "@acme/core"}"#);
        put_package(ws.path(), "ui", r#"{"name": "@acme/ui"}"#);
        put_package(ws.path(), "other", r#"{"name": "@other/lib"}"#);

        let config = LinkerConfig::new(vec![ws.path().to_path_buf()]);
        let report = link_target(&config, "@acme", true).unwrap();

        let mut names: Vec<&str> = report.sources.iter().map(|s| s.name.as_str()).collect();
        names.sort_unstable();
        assert_eq!(names, ["@acme/core", "@acme/ui"]);
    }

    #[test]
    fn test_self_link_dry_run_names_candidates_without_side_effects() {
        let ws = tempdir().unwrap();
        let app = put_package(
            ws.path(),
            "packages/app",
            r#"{
                "name": "@acme/app",
                "dependencies": {"@acme/core": "^1.0", "react": "^18"},
                "devDependencies": {"@acme/ui": "^1.0"}
            }"#,
        );

        let config = LinkerConfig::new(vec![ws.path().to_path_buf()]);
        let summary = self_link(&app, &config, true).unwrap();

        assert_eq!(summary.package, "@acme/app");
        assert_eq!(summary.requested, ["@acme/core", "@acme/ui"]);
        assert!(summary.dry_run);
        // No symlinks, no override file, no node_modules.
        assert!(!app.join("node_modules").exists());
        assert!(!app.join(OVERRIDES_FILE).exists());
    }

    #[test]
    fn test_self_link_dry_run_resolves_via_scope_root() {
        let ws = tempdir().unwrap();
        put_package(ws.path(), "packages/core", r#"{"name": "@acme/core"}"#);
        let app = put_package(
            ws.path(),
            "packages/app",
            r#"{"name": "@acme/app", "dependencies": {"@acme/core": "^1.0"}}"#,
        );

        let config = LinkerConfig::new(vec![ws.path().to_path_buf()])
            .with_scope_root("@acme", ws.path().join("packages"));
        let summary = self_link(&app, &config, true).unwrap();

        assert_eq!(summary.linked.len(), 1);
        assert_eq!(summary.linked[0].name, "@acme/core");
        assert_eq!(summary.linked[0].outcome, ReconcileOutcome::Created);
        assert!(summary.skipped.is_empty());
        assert!(!app.join("node_modules").exists());
    }

    #[test]
    fn test_self_link_dry_run_skips_mismatched_scope_root_candidate() {
        let ws = tempdir().unwrap();
        // Folder exists at the conventional location but holds a different package.
        put_package(ws.path(), "packages/core", r#"{"name": "@acme/renamed"}"#);
        let app = put_package(
            ws.path(),
            "packages/app",
            r#"{"name": "@acme/app", "dependencies": {"@acme/core": "^1.0"}}"#,
        );

        let config = LinkerConfig::new(vec![ws.path().to_path_buf()])
            .with_scope_root("@acme", ws.path().join("packages"));
        let summary = self_link(&app, &config, true).unwrap();

        assert!(summary.linked.is_empty());
        assert_eq!(summary.skipped.len(), 1);
    }

    #[test]
    fn test_self_link_unnamed_manifest_is_fatal() {
        let ws = tempdir().unwrap();
        let app = put_package(ws.path(), "app", r#"{"dependencies": {"@acme/core": "*"}}"#);

        let config = LinkerConfig::default();
        let err = self_link(&app, &config, true).unwrap_err();
        assert_eq!(err.code(), "MANIFEST_UNNAMED");
    }

    #[test]
    fn test_status_reports_links_and_classification() {
        let ws = tempdir().unwrap();
        let core = put_package(
            ws.path(),
            "packages/core",
            r#"{"name": "@acme/core", "version": "1.2.0"}"#,
        );
        let app = put_package(
            ws.path(),
            "packages/app",
            r#"{"name": "@acme/app", "dependencies": {"@acme/core": "^1.2", "left-pad": "^1.0"}}"#,
        );

        // Internal link via the reconciler; external link by hand.
        reconcile("@acme/core", &core, &app, false).unwrap();
        let elsewhere = tempdir().unwrap();
        let outside = elsewhere.path().join("left-pad");
        fs::create_dir_all(&outside).unwrap();
        #[cfg(unix)]
        std::os::unix::fs::symlink(&outside, app.join("node_modules/left-pad")).unwrap();
        #[cfg(windows)]
        std::os::windows::fs::symlink_dir(&outside, app.join("node_modules/left-pad")).unwrap();

        let config = LinkerConfig::new(vec![ws.path().to_path_buf()]);
        let report = status(&config);

        let app_status = report
            .packages
            .iter()
            .find(|p| p.name == "@acme/app")
            .unwrap();
        assert_eq!(app_status.links.len(), 2);

        let core_link = app_status
            .links
            .iter()
            .find(|l| l.name == "@acme/core")
            .unwrap();
        assert!(!core_link.external);
        assert_eq!(
            core_link.resolved,
            dunce::canonicalize(&core).unwrap()
        );

        let pad_link = app_status
            .links
            .iter()
            .find(|l| l.name == "left-pad")
            .unwrap();
        assert!(pad_link.external);
    }

    #[test]
    fn test_status_flags_incompatible_linked_version() {
        let ws = tempdir().unwrap();
        let core = put_package(
            ws.path(),
            "packages/core",
            r#"{"name": "@acme/core", "version": "4.5.0"}"#,
        );
        let app = put_package(
            ws.path(),
            "packages/app",
            r#"{"name": "@acme/app", "dependencies": {"@acme/core": "^4.4"}}"#,
        );
        reconcile("@acme/core", &core, &app, false).unwrap();

        let config = LinkerConfig::new(vec![ws.path().to_path_buf()]);
        let report = status(&config);

        let app_status = report
            .packages
            .iter()
            .find(|p| p.name == "@acme/app")
            .unwrap();
        assert_eq!(app_status.incompatible, ["@acme/core"]);
    }

    #[test]
    fn test_status_accepts_prerelease_on_declared_minor() {
        let ws = tempdir().unwrap();
        let core = put_package(
            ws.path(),
            "packages/core",
            r#"{"name": "@acme/core", "version": "4.4.53-dev.0"}"#,
        );
        let app = put_package(
            ws.path(),
            "packages/app",
            r#"{"name": "@acme/app", "dependencies": {"@acme/core": "^4.4"}}"#,
        );
        reconcile("@acme/core", &core, &app, false).unwrap();

        let config = LinkerConfig::new(vec![ws.path().to_path_buf()]);
        let report = status(&config);

        let app_status = report
            .packages
            .iter()
            .find(|p| p.name == "@acme/app")
            .unwrap();
        assert!(app_status.incompatible.is_empty());
    }
}
