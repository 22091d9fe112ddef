use std::path::PathBuf;
use thiserror::Error;

/// Core error type for weft operations.
///
/// Every orchestrator-level failure names the offending package or dependency
/// so the CLI can report a specific cause; `code` gives the stable
/// machine-readable identifier used in JSON output.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read manifest at {path}: {source}")]
    ManifestRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse manifest at {path}: {reason}")]
    ManifestParse { path: PathBuf, reason: String },

    #[error("Failed to write manifest at {path}: {source}")]
    ManifestWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Manifest at {path} has no name; it cannot participate in linking")]
    ManifestUnnamed { path: PathBuf },

    #[error("Link target '{target}' is not scope-shaped (expected '@scope' or '@scope/name')")]
    TargetNotScoped { target: String },

    #[error("Failed to register {package} in the global link registry: {reason}")]
    Register { package: String, reason: String },

    #[error("Failed to link dependency {dependency}: {reason}")]
    Link { dependency: String, reason: String },

    #[error("Failed to link consumer {consumer} to {source_pkg}: {reason}")]
    ConsumerLink {
        source_pkg: String,
        consumer: String,
        reason: String,
    },
}

impl CoreError {
    /// Stable error code for machine-readable output.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Io(_) => "IO_ERROR",
            Self::ManifestRead { .. } => "MANIFEST_READ_FAILED",
            Self::ManifestParse { .. } => "MANIFEST_INVALID",
            Self::ManifestWrite { .. } => "MANIFEST_WRITE_FAILED",
            Self::ManifestUnnamed { .. } => "MANIFEST_UNNAMED",
            Self::TargetNotScoped { .. } => "TARGET_NOT_SCOPED",
            Self::Register { .. } => "REGISTER_FAILED",
            Self::Link { .. } => "LINK_FAILED",
            Self::ConsumerLink { .. } => "CONSUMER_LINK_FAILED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_screaming_snake() {
        let errors = [
            CoreError::ManifestUnnamed {
                path: PathBuf::from("p"),
            },
            CoreError::TargetNotScoped {
                target: "lodash".into(),
            },
            CoreError::Register {
                package: "@acme/core".into(),
                reason: "npm exited 1".into(),
            },
        ];

        for err in errors {
            assert!(
                err.code().chars().all(|c| c.is_uppercase() || c == '_'),
                "code '{}' should be SCREAMING_SNAKE_CASE",
                err.code()
            );
        }
    }

    #[test]
    fn test_consumer_link_names_both_sides() {
        let err = CoreError::ConsumerLink {
            source_pkg: "@acme/core".into(),
            consumer: "@acme/app".into(),
            reason: "permission denied".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("@acme/core"));
        assert!(msg.contains("@acme/app"));
    }
}
