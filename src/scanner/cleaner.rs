//! Hook for acting on failing paths in `--clean` mode.

#![allow(missing_docs)]

use std::path::Path;

use crate::core::errors::Result;

/// What a cleaner did with one failing path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanAction {
    Removed,
    Skipped,
}

/// Receives every failing path once the run has finished.
pub trait Cleaner: Send + Sync {
    fn remove(&self, path: &Path) -> Result<CleanAction>;
}

/// Leaves every file in place.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportOnlyCleaner;

impl Cleaner for ReportOnlyCleaner {
    fn remove(&self, _path: &Path) -> Result<CleanAction> {
        Ok(CleanAction::Skipped)
    }
}
