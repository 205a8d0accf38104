//! End-of-run summary: failure count plus sorted failure list.

#![allow(missing_docs)]

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::scanner::ledger::Outcome;

/// Immutable result of one verification run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    outcomes: BTreeMap<PathBuf, Outcome>,
    visited: u64,
    skipped: u64,
    traversal_errors: Vec<String>,
}

/// One failing path in the JSON report.
#[derive(Debug, Serialize)]
struct FailureRecord<'a> {
    path: String,
    reason: &'a str,
}

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    errors: usize,
    passed: usize,
    visited: u64,
    skipped: u64,
    traversal_errors: &'a [String],
    failures: Vec<FailureRecord<'a>>,
}

impl RunSummary {
    pub fn new(
        outcomes: BTreeMap<PathBuf, Outcome>,
        visited: u64,
        skipped: u64,
        traversal_errors: Vec<String>,
    ) -> Self {
        Self {
            outcomes,
            visited,
            skipped,
            traversal_errors,
        }
    }

    /// Every recorded outcome in lexicographic path order.
    pub const fn outcomes(&self) -> &BTreeMap<PathBuf, Outcome> {
        &self.outcomes
    }

    pub fn outcome(&self, path: &Path) -> Option<&Outcome> {
        self.outcomes.get(path)
    }

    /// Failing paths and reasons in lexicographic path order.
    pub fn failures(&self) -> impl Iterator<Item = (&Path, &str)> {
        self.outcomes
            .iter()
            .filter_map(|(path, outcome)| outcome.reason().map(|reason| (path.as_path(), reason)))
    }

    pub fn failure_count(&self) -> usize {
        self.outcomes.values().filter(|o| o.is_fail()).count()
    }

    pub fn pass_count(&self) -> usize {
        self.outcomes.len() - self.failure_count()
    }

    /// Files the walker yielded, whatever their role.
    pub const fn visited(&self) -> u64 {
        self.visited
    }

    /// Files that were neither a checksum nor an archive.
    pub const fn skipped(&self) -> u64 {
        self.skipped
    }

    pub fn traversal_errors(&self) -> &[String] {
        &self.traversal_errors
    }

    /// Whether the run found anything worth a nonzero exit.
    pub fn has_problems(&self) -> bool {
        self.failure_count() > 0 || !self.traversal_errors.is_empty()
    }

    /// `Errors: N` followed by one `path: reason` line per failure.
    pub fn write_text<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "Errors: {}", self.failure_count())?;
        for (path, reason) in self.failures() {
            writeln!(out, "{}: {reason}", path.display())?;
        }
        Ok(())
    }

    /// Render the text report into a string.
    pub fn to_text(&self) -> String {
        let mut buf = Vec::new();
        let _ = self.write_text(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// Machine-readable report.
    pub fn to_json(&self) -> serde_json::Value {
        let report = JsonReport {
            errors: self.failure_count(),
            passed: self.pass_count(),
            visited: self.visited,
            skipped: self.skipped,
            traversal_errors: &self.traversal_errors,
            failures: self
                .failures()
                .map(|(path, reason)| FailureRecord {
                    path: path.to_string_lossy().into_owned(),
                    reason,
                })
                .collect(),
        };
        serde_json::to_value(report).unwrap_or(serde_json::Value::Null)
    }
}
