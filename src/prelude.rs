//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use repo_cache_verifier::prelude::*;
//! ```

// Core
pub use crate::core::config::Config;
pub use crate::core::errors::{RcvError, Result};

// Scanner
pub use crate::scanner::classify::{Classifier, FileRole};
pub use crate::scanner::cleaner::{CleanAction, Cleaner, ReportOnlyCleaner};
pub use crate::scanner::digest::{Digest, compute_file_digest};
pub use crate::scanner::engine::{RunMode, Verifier, VerifierOptions};
pub use crate::scanner::ledger::Outcome;
pub use crate::scanner::progress::Progress;
pub use crate::scanner::report::RunSummary;
pub use crate::scanner::walker::{DirectoryWalker, WalkerConfig};
