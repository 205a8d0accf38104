//! RCV-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, RcvError>;

/// Top-level error type for the repository cache verifier.
#[derive(Debug, Error)]
pub enum RcvError {
    #[error("[RCV-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[RCV-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[RCV-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[RCV-2001] traversal failure under {root}: {details}")]
    Traversal { root: PathBuf, details: String },

    #[error("[RCV-2002] checksum file rejected {path}: {reason}")]
    SidecarFormat { path: PathBuf, reason: String },

    #[error("[RCV-2003] checksum mismatch for {path}: {reason}")]
    ChecksumMismatch { path: PathBuf, reason: String },

    #[error("[RCV-2004] corrupt archive {path}: {reason}")]
    CorruptArchive { path: PathBuf, reason: String },

    #[error("[RCV-3002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[RCV-3003] channel closed in component {component}")]
    ChannelClosed { component: &'static str },

    #[error("[RCV-3900] runtime failure: {details}")]
    Runtime { details: String },
}

impl RcvError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "RCV-1001",
            Self::MissingConfig { .. } => "RCV-1002",
            Self::ConfigParse { .. } => "RCV-1003",
            Self::Traversal { .. } => "RCV-2001",
            Self::SidecarFormat { .. } => "RCV-2002",
            Self::ChecksumMismatch { .. } => "RCV-2003",
            Self::CorruptArchive { .. } => "RCV-2004",
            Self::Io { .. } => "RCV-3002",
            Self::ChannelClosed { .. } => "RCV-3003",
            Self::Runtime { .. } => "RCV-3900",
        }
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<toml::de::Error> for RcvError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_variants() -> Vec<RcvError> {
        vec![
            RcvError::InvalidConfig {
                details: String::new(),
            },
            RcvError::MissingConfig {
                path: PathBuf::new(),
            },
            RcvError::ConfigParse {
                context: "",
                details: String::new(),
            },
            RcvError::Traversal {
                root: PathBuf::new(),
                details: String::new(),
            },
            RcvError::SidecarFormat {
                path: PathBuf::new(),
                reason: String::new(),
            },
            RcvError::ChecksumMismatch {
                path: PathBuf::new(),
                reason: String::new(),
            },
            RcvError::CorruptArchive {
                path: PathBuf::new(),
                reason: String::new(),
            },
            RcvError::Io {
                path: PathBuf::new(),
                source: std::io::Error::other("test"),
            },
            RcvError::ChannelClosed { component: "" },
            RcvError::Runtime {
                details: String::new(),
            },
        ]
    }

    #[test]
    fn error_codes_are_unique() {
        let errors = all_variants();
        let codes: Vec<&str> = errors.iter().map(RcvError::code).collect();
        let unique: std::collections::HashSet<&&str> = codes.iter().collect();
        assert_eq!(
            codes.len(),
            unique.len(),
            "error codes must be unique: {codes:?}"
        );
    }

    #[test]
    fn display_includes_code() {
        for err in all_variants() {
            let msg = err.to_string();
            assert!(
                msg.contains(err.code()),
                "display should contain error code {}: {msg}",
                err.code()
            );
        }
    }

    #[test]
    fn io_convenience_constructor() {
        let err = RcvError::io(
            "/tmp/lib.jar",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert_eq!(err.code(), "RCV-3002");
        assert!(err.to_string().contains("/tmp/lib.jar"));
    }

    #[test]
    fn from_toml_error() {
        let toml_err = toml::from_str::<toml::Value>("= invalid").unwrap_err();
        let err: RcvError = toml_err.into();
        assert_eq!(err.code(), "RCV-1003");
    }
}
