//! Configuration system: TOML file + env var overrides + smart defaults.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{RcvError, Result};
use crate::core::paths::{self, SIDECAR_EXTENSION};
use crate::scanner::digest::DEFAULT_CHUNK_SIZE;

/// Full verifier configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Config {
    pub verify: VerifyConfig,
    pub report: ReportConfig,
    pub logging: LoggingConfig,
    pub paths: PathsConfig,
}

/// Traversal and per-file checking behavior.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct VerifyConfig {
    /// Roots scanned when no directories are given on the command line.
    pub root_paths: Vec<PathBuf>,
    /// File extensions (without the dot) treated as archives.
    pub archive_extensions: Vec<String>,
    /// Read size used when hashing files.
    pub chunk_size_bytes: usize,
    /// Verifier worker threads.
    pub parallelism: usize,
    /// Directory walker threads.
    pub walk_parallelism: usize,
    pub follow_symlinks: bool,
    /// Reject checksum lines with trailing text after the 40th hex digit.
    pub strict_checksum_format: bool,
}

/// Console reporting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReportConfig {
    /// Emit the `o`/`x`/`.` progress stream on stderr.
    pub progress: bool,
    /// Column at which the progress stream wraps.
    pub progress_width: usize,
}

/// JSONL activity log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    pub jsonl_enabled: bool,
    /// Maximum file size before rotation (bytes).
    pub max_size_bytes: u64,
    /// Number of rotated files to keep.
    pub max_rotated_files: u32,
}

/// Filesystem paths used by rcv.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    pub config_file: PathBuf,
    pub jsonl_log: PathBuf,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            root_paths: vec![paths::default_repository_root()],
            archive_extensions: vec!["jar".to_string()],
            chunk_size_bytes: DEFAULT_CHUNK_SIZE,
            parallelism: std::thread::available_parallelism()
                .map_or(2, |n| n.get().saturating_div(2).max(1)),
            walk_parallelism: 2,
            follow_symlinks: true,
            strict_checksum_format: false,
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            progress: true,
            progress_width: 80,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            jsonl_enabled: true,
            max_size_bytes: 10 * 1024 * 1024,
            max_rotated_files: 3,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        let home = paths::home_dir();
        Self {
            config_file: home.join(".config").join("rcv").join("config.toml"),
            jsonl_log: home
                .join(".local")
                .join("share")
                .join("rcv")
                .join("activity.jsonl"),
        }
    }
}

impl Config {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        PathsConfig::default().config_file
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from default path; defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, env_var)
    }

    fn load_with_env<F>(path: Option<&Path>, lookup: F) -> Result<Self>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);
        let is_explicit_path = path.is_some();

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|source| RcvError::Io {
                path: path_buf.clone(),
                source,
            })?;
            let parsed: Self = toml::from_str(&raw)?;
            parsed
        } else if is_explicit_path {
            return Err(RcvError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.paths.config_file = path_buf;
        cfg.apply_env_overrides_from(lookup)?;
        cfg.normalize();
        cfg.validate()?;
        Ok(cfg)
    }

    fn apply_env_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut env = |name: &str| lookup(name).filter(|raw| !raw.trim().is_empty());

        if let Some(raw) = env("RCV_VERIFY_PARALLELISM") {
            self.verify.parallelism = parse_env("RCV_VERIFY_PARALLELISM", &raw)?;
        }
        if let Some(raw) = env("RCV_VERIFY_CHUNK_SIZE_BYTES") {
            self.verify.chunk_size_bytes = parse_env("RCV_VERIFY_CHUNK_SIZE_BYTES", &raw)?;
        }
        if let Some(raw) = env("RCV_VERIFY_STRICT_CHECKSUM_FORMAT") {
            self.verify.strict_checksum_format =
                parse_env("RCV_VERIFY_STRICT_CHECKSUM_FORMAT", &raw)?;
        }
        if let Some(raw) = env("RCV_VERIFY_FOLLOW_SYMLINKS") {
            self.verify.follow_symlinks = parse_env("RCV_VERIFY_FOLLOW_SYMLINKS", &raw)?;
        }
        if let Some(raw) = env("RCV_REPORT_PROGRESS") {
            self.report.progress = parse_env("RCV_REPORT_PROGRESS", &raw)?;
        }
        if let Some(raw) = env("RCV_REPORT_PROGRESS_WIDTH") {
            self.report.progress_width = parse_env("RCV_REPORT_PROGRESS_WIDTH", &raw)?;
        }
        if let Some(raw) = env("RCV_JSONL_ENABLED") {
            self.logging.jsonl_enabled = parse_env("RCV_JSONL_ENABLED", &raw)?;
        }
        if let Some(raw) = env("RCV_JSONL_LOG") {
            self.paths.jsonl_log = PathBuf::from(raw);
        }
        Ok(())
    }

    /// Normalize extensions and root paths for consistent comparison.
    fn normalize(&mut self) {
        for ext in &mut self.verify.archive_extensions {
            *ext = ext.trim().to_string();
        }

        for path in &mut self.verify.root_paths {
            let s = path.to_string_lossy();
            if s.len() > 1
                && let Some(stripped) = s.strip_suffix('/')
            {
                *path = PathBuf::from(stripped);
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if self.verify.parallelism == 0 {
            return Err(RcvError::InvalidConfig {
                details: "verify.parallelism must be >= 1".to_string(),
            });
        }
        if self.verify.walk_parallelism == 0 {
            return Err(RcvError::InvalidConfig {
                details: "verify.walk_parallelism must be >= 1".to_string(),
            });
        }
        if self.verify.chunk_size_bytes == 0 {
            return Err(RcvError::InvalidConfig {
                details: "verify.chunk_size_bytes must be >= 1".to_string(),
            });
        }
        if self.verify.archive_extensions.is_empty() {
            return Err(RcvError::InvalidConfig {
                details: "verify.archive_extensions must not be empty".to_string(),
            });
        }
        for ext in &self.verify.archive_extensions {
            if ext.is_empty() || ext.contains('.') || ext.contains('/') {
                return Err(RcvError::InvalidConfig {
                    details: format!(
                        "verify.archive_extensions entries must be bare extensions, got {ext:?}"
                    ),
                });
            }
            if ext == SIDECAR_EXTENSION {
                return Err(RcvError::InvalidConfig {
                    details: format!(
                        "verify.archive_extensions must not contain the checksum extension {SIDECAR_EXTENSION:?}"
                    ),
                });
            }
        }
        if self.report.progress_width == 0 {
            return Err(RcvError::InvalidConfig {
                details: "report.progress_width must be >= 1".to_string(),
            });
        }
        if self.logging.jsonl_enabled && self.logging.max_rotated_files == 0 {
            return Err(RcvError::InvalidConfig {
                details: "logging.max_rotated_files must be >= 1".to_string(),
            });
        }
        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok()
}

fn parse_env<T>(name: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse::<T>().map_err(|error| RcvError::ConfigParse {
        context: "env",
        details: format!("{name}={raw:?}: {error}"),
    })
}
