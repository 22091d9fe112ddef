#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

//! Core engine for weft, a monorepo dependency linker.
//!
//! Provides:
//! - Reading and writing package manifests with strict validation
//! - Scanning directory trees for packages, with exclusion rules
//! - Scope- and consumer-queries over the discovered packages
//! - Reading the host package manager's global link registry
//! - Idempotent symlink reconciliation for dependency slots
//! - Prerelease-aware version compatibility checks for linked dependencies
//! - The self-link and targeted-link orchestration flows

pub mod compat;
pub mod config;
pub mod error;
pub mod index;
pub mod manifest;
pub mod orchestrate;
pub mod pm;
pub mod reconcile;
pub mod registry;
pub mod scan;
pub mod version;

pub use compat::{find_compatibility_problems, is_compatible};
pub use config::LinkerConfig;
pub use error::CoreError;
pub use index::{find_by_scope, find_consumers, Consumer, ScopeMatch};
pub use manifest::{read_manifest, write_manifest, DependencyKind, Manifest};
pub use orchestrate::{
    link_candidates, link_target, self_link, status, LinkedDep, PackageStatus, SelfLinkSummary,
    SourceLink, StatusReport, TargetLinkReport, OVERRIDES_FILE,
};
pub use reconcile::{reconcile, slot_path, ReconcileOutcome, SlotState};
pub use registry::list_global_links;
pub use scan::{scan_root, scan_roots, PackageLocation, EXCLUDED_DIRS, MAX_SCAN_DEPTH};
pub use version::VERSION;
