//! Per-path outcome store shared by verifier workers.
//!
//! A path moves through `absent -> claimed -> done` exactly once. Claiming is
//! the atomic check-and-skip: whoever claims a path is the only producer of
//! its outcome, and a path that is claimed or done is never processed again.

#![allow(missing_docs)]

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::Serialize;

/// Verdict for one checked path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum Outcome {
    Pass,
    Fail(String),
}

impl Outcome {
    #[must_use]
    pub const fn is_fail(&self) -> bool {
        matches!(self, Self::Fail(_))
    }

    /// Failure reason, if any.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Pass => None,
            Self::Fail(reason) => Some(reason),
        }
    }
}

#[derive(Debug)]
enum Slot {
    Claimed,
    Done(Outcome),
}

/// Concurrent outcome map keyed by path.
#[derive(Debug, Default)]
pub struct Ledger {
    slots: Mutex<HashMap<PathBuf, Slot>>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve `path` for the caller. Returns `None` if it is already claimed or done.
    pub fn claim(&self, path: &Path) -> Option<Claim<'_>> {
        let mut slots = self.slots.lock();
        if slots.contains_key(path) {
            return None;
        }
        slots.insert(path.to_path_buf(), Slot::Claimed);
        drop(slots);
        Some(Claim {
            ledger: self,
            path: path.to_path_buf(),
            resolved: false,
        })
    }

    /// Whether `path` is claimed or has an outcome.
    pub fn contains(&self, path: &Path) -> bool {
        self.slots.lock().contains_key(path)
    }

    /// Consume the ledger into a path-sorted map of finished outcomes.
    ///
    /// Only call once every worker has stopped; unresolved claims are dropped.
    pub fn into_sorted(self) -> BTreeMap<PathBuf, Outcome> {
        self.slots
            .into_inner()
            .into_iter()
            .filter_map(|(path, slot)| match slot {
                Slot::Done(outcome) => Some((path, outcome)),
                Slot::Claimed => None,
            })
            .collect()
    }
}

/// Exclusive right to produce the outcome of one path.
///
/// Dropping an unresolved claim releases the path again.
#[derive(Debug)]
pub struct Claim<'a> {
    ledger: &'a Ledger,
    path: PathBuf,
    resolved: bool,
}

impl Claim<'_> {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record the outcome and return it for progress/log reporting.
    pub fn resolve(mut self, outcome: Outcome) -> Outcome {
        self.resolved = true;
        self.ledger
            .slots
            .lock()
            .insert(self.path.clone(), Slot::Done(outcome.clone()));
        outcome
    }
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        if !self.resolved {
            let mut slots = self.ledger.slots.lock();
            if matches!(slots.get(&self.path), Some(Slot::Claimed)) {
                slots.remove(&self.path);
            }
        }
    }
}
