//! Verification run: walker → worker pool → classify/dispatch → ledger → summary.
//!
//! Walker threads stream files into a shared channel drained by
//! `parallelism` verifier threads. Every outcome goes through a ledger
//! claim, so a path is checked at most once even when its archive and
//! sidecar are visited concurrently. The summary is only built after all
//! workers have been joined.

#![allow(missing_docs)]

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Instant;

use parking_lot::Mutex;
use thiserror::Error;

use crate::core::config::VerifyConfig;
use crate::core::errors::{RcvError, Result};
use crate::core::paths::absolutize;
use crate::logger::jsonl::{EventType, JsonlWriter, LogEntry, Severity};
use crate::scanner::archive::{ArchiveError, validate_archive};
use crate::scanner::classify::{Classifier, FileRole};
use crate::scanner::cleaner::{CleanAction, Cleaner};
use crate::scanner::digest::{Digest, compute_file_digest};
use crate::scanner::ledger::{Claim, Ledger, Outcome};
use crate::scanner::progress::{Mark, Progress};
use crate::scanner::report::RunSummary;
use crate::scanner::sidecar::{SidecarError, SidecarRules, read_sidecar};
use crate::scanner::walker::{DirectoryWalker, TraversalError, WalkEntry, WalkEvent, WalkerConfig};

/// `--test` only reports; `--clean` additionally hands failures to a [`Cleaner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Test,
    Clean,
}

impl RunMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Test => "test",
            Self::Clean => "clean",
        }
    }
}

/// Knobs for one run, usually derived from `VerifyConfig`.
#[derive(Debug, Clone)]
pub struct VerifierOptions {
    pub roots: Vec<PathBuf>,
    pub archive_extensions: Vec<String>,
    pub chunk_size: usize,
    pub parallelism: usize,
    pub walk_parallelism: usize,
    pub follow_symlinks: bool,
    pub strict_format: bool,
}

impl VerifierOptions {
    pub fn from_config(config: &VerifyConfig) -> Self {
        Self {
            roots: config.root_paths.clone(),
            archive_extensions: config.archive_extensions.clone(),
            chunk_size: config.chunk_size_bytes,
            parallelism: config.parallelism,
            walk_parallelism: config.walk_parallelism,
            follow_symlinks: config.follow_symlinks,
            strict_format: config.strict_checksum_format,
        }
    }

    /// Replace the configured roots, e.g. with directories from the command line.
    #[must_use]
    pub fn with_roots(mut self, roots: Vec<PathBuf>) -> Self {
        if !roots.is_empty() {
            self.roots = roots;
        }
        self
    }
}

/// Why a target failed checksum or structural verification.
#[derive(Debug, Error)]
pub enum VerifyFailure {
    #[error("SHA-1 mismatch: file={actual}, sha1={expected}")]
    Mismatch { actual: Digest, expected: Digest },

    #[error("{0}")]
    Io(#[from] io::Error),

    #[error("{0}")]
    Archive(#[from] ArchiveError),
}

impl VerifyFailure {
    fn into_error(self, path: &Path) -> RcvError {
        match self {
            Self::Mismatch { .. } => RcvError::ChecksumMismatch {
                path: path.to_path_buf(),
                reason: self.to_string(),
            },
            Self::Io(source) => RcvError::io(path, source),
            Self::Archive(err) => RcvError::CorruptArchive {
                path: path.to_path_buf(),
                reason: err.to_string(),
            },
        }
    }
}

fn sidecar_error(path: &Path, err: &SidecarError) -> RcvError {
    RcvError::SidecarFormat {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}

/// Whether a sidecar's target is present next to it.
#[derive(Debug, Clone, PartialEq, Eq)]
enum SidecarTarget {
    Present(PathBuf),
    /// Orphan checksum: the sidecar gets its own outcome and nothing else happens.
    Missing,
}

impl SidecarTarget {
    fn locate(target: PathBuf) -> Self {
        if target.exists() {
            Self::Present(target)
        } else {
            Self::Missing
        }
    }
}

/// Mutable state shared by the workers of a single run.
#[derive(Default)]
struct RunState {
    ledger: Ledger,
    visited: AtomicU64,
    skipped: AtomicU64,
    traversal_errors: Mutex<Vec<String>>,
}

/// Run context for verifying one or more repository roots.
pub struct Verifier {
    options: VerifierOptions,
    classifier: Classifier,
    progress: Progress,
    console: Mutex<Box<dyn Write + Send>>,
    log: Mutex<JsonlWriter>,
}

impl Verifier {
    /// Silent progress, `[ERROR]` lines on stdout, no activity log.
    pub fn new(options: VerifierOptions) -> Self {
        let classifier = Classifier::new(&options.archive_extensions);
        Self {
            options,
            classifier,
            progress: Progress::disabled(),
            console: Mutex::new(Box::new(io::stdout())),
            log: Mutex::new(JsonlWriter::discard()),
        }
    }

    #[must_use]
    pub fn with_progress(mut self, progress: Progress) -> Self {
        self.progress = progress;
        self
    }

    /// Where traversal errors are printed as they happen.
    #[must_use]
    pub fn with_console(mut self, console: Box<dyn Write + Send>) -> Self {
        self.console = Mutex::new(console);
        self
    }

    #[must_use]
    pub fn with_activity_log(mut self, log: JsonlWriter) -> Self {
        self.log = Mutex::new(log);
        self
    }

    pub const fn options(&self) -> &VerifierOptions {
        &self.options
    }

    /// Verify every root and return the summary once all work has drained.
    pub fn run(&self, mode: RunMode, cleaner: &dyn Cleaner) -> Result<RunSummary> {
        let started = Instant::now();
        let roots: Vec<PathBuf> = self.options.roots.iter().map(|r| absolutize(r)).collect();

        let mut start = LogEntry::new(EventType::RunStart, Severity::Info);
        start.mode = Some(mode.as_str().to_string());
        start.roots = Some(roots.iter().map(|r| r.to_string_lossy().into_owned()).collect());
        self.log_entry(&start);

        let walker = DirectoryWalker::new(WalkerConfig {
            root_paths: roots,
            follow_symlinks: self.options.follow_symlinks,
            parallelism: self.options.walk_parallelism,
        });
        let events = walker.stream()?;

        let state = RunState::default();
        thread::scope(|scope| {
            for _ in 0..self.options.parallelism.max(1) {
                let events = events.clone();
                let state = &state;
                scope.spawn(move || {
                    for event in &events {
                        match event {
                            WalkEvent::File(entry) => self.visit(state, &entry),
                            WalkEvent::Error(err) => self.traversal_error(state, err),
                        }
                    }
                });
            }
        });
        self.progress.finish();

        let summary = RunSummary::new(
            state.ledger.into_sorted(),
            state.visited.into_inner(),
            state.skipped.into_inner(),
            state.traversal_errors.into_inner(),
        );

        if mode == RunMode::Clean {
            self.clean(&summary, cleaner)?;
        }

        let mut complete = LogEntry::new(EventType::RunComplete, Severity::Info);
        complete.mode = Some(mode.as_str().to_string());
        complete.visited = Some(summary.visited());
        complete.passed = Some(summary.pass_count() as u64);
        complete.failed = Some(summary.failure_count() as u64);
        complete.duration_ms =
            Some(u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX));
        if !summary.traversal_errors().is_empty() {
            complete.details = Some(format!(
                "{} traversal error(s)",
                summary.traversal_errors().len()
            ));
        }
        self.log_entry(&complete);
        self.log.lock().flush();

        Ok(summary)
    }

    fn visit(&self, state: &RunState, entry: &WalkEntry) {
        state.visited.fetch_add(1, Ordering::Relaxed);
        if state.ledger.contains(&entry.path) {
            return;
        }
        match self.classifier.classify(&entry.path) {
            FileRole::Sidecar { target } => self.visit_sidecar(state, &entry.path, target),
            FileRole::Archive { sidecar } => self.visit_archive(state, &entry.path, &sidecar),
            FileRole::Ignored => {
                state.skipped.fetch_add(1, Ordering::Relaxed);
                self.progress.tick(Mark::Skip);
            }
        }
    }

    /// Parse the sidecar, then check its target against the parsed digest.
    fn visit_sidecar(&self, state: &RunState, sidecar: &Path, target: PathBuf) {
        let Some(claim) = state.ledger.claim(sidecar) else {
            return;
        };
        let Some(expected) = self.record_sidecar(claim) else {
            return;
        };

        match SidecarTarget::locate(target) {
            SidecarTarget::Present(target) => {
                if let Some(claim) = state.ledger.claim(&target) {
                    let result = self.check_digest(&target, expected);
                    self.record_check(claim, result);
                }
            }
            SidecarTarget::Missing => {}
        }
    }

    /// Checksum-verify the archive if its sidecar parses, else validate its structure.
    fn visit_archive(&self, state: &RunState, archive: &Path, sidecar: &Path) {
        let Some(claim) = state.ledger.claim(archive) else {
            return;
        };

        let expected = if sidecar.exists() {
            match state.ledger.claim(sidecar) {
                Some(sidecar_claim) => self.record_sidecar(sidecar_claim),
                // Another worker owns the sidecar's outcome; parsing again is side-effect free.
                None => read_sidecar(sidecar, self.sidecar_rules()).ok(),
            }
        } else {
            None
        };

        let result = match expected {
            Some(expected) => self.check_digest(archive, expected),
            None => validate_archive(archive).map_err(VerifyFailure::from),
        };
        self.record_check(claim, result);
    }

    fn record_sidecar(&self, claim: Claim<'_>) -> Option<Digest> {
        match read_sidecar(claim.path(), self.sidecar_rules()) {
            Ok(digest) => {
                self.record(claim, Ok(()));
                Some(digest)
            }
            Err(err) => {
                let err = sidecar_error(claim.path(), &err);
                self.record(claim, Err(err));
                None
            }
        }
    }

    fn record_check(&self, claim: Claim<'_>, result: std::result::Result<(), VerifyFailure>) {
        let result = result.map_err(|failure| failure.into_error(claim.path()));
        self.record(claim, result);
    }

    /// Resolve a claim, tick progress, and log failures.
    fn record(&self, claim: Claim<'_>, result: std::result::Result<(), RcvError>) {
        let outcome = match result {
            Ok(()) => Outcome::Pass,
            Err(err) => {
                let reason = failure_reason(&err);
                let entry = LogEntry::new(EventType::VerifyFailure, Severity::Warning)
                    .with_path(claim.path())
                    .with_error(err.code(), reason.clone());
                self.log_entry(&entry);
                Outcome::Fail(reason)
            }
        };
        let outcome = claim.resolve(outcome);
        self.progress.tick(Mark::from(&outcome));
    }

    fn check_digest(&self, path: &Path, expected: Digest) -> std::result::Result<(), VerifyFailure> {
        let actual = compute_file_digest(path, self.options.chunk_size)?;
        if actual == expected {
            Ok(())
        } else {
            Err(VerifyFailure::Mismatch { actual, expected })
        }
    }

    fn traversal_error(&self, state: &RunState, err: TraversalError) {
        {
            let mut console = self.console.lock();
            let _ = writeln!(console, "[ERROR] {}", err.message);
            let _ = console.flush();
        }
        let message = err.message.clone();
        let error = err.into_error();
        let entry = LogEntry::new(EventType::TraversalError, Severity::Warning)
            .with_error(error.code(), message.clone());
        self.log_entry(&entry);
        state.traversal_errors.lock().push(message);
    }

    fn clean(&self, summary: &RunSummary, cleaner: &dyn Cleaner) -> Result<()> {
        for (path, reason) in summary.failures() {
            match cleaner.remove(path)? {
                CleanAction::Removed => {}
                CleanAction::Skipped => {
                    let mut entry =
                        LogEntry::new(EventType::CleanSkipped, Severity::Info).with_path(path);
                    entry.details = Some(reason.to_string());
                    self.log_entry(&entry);
                }
            }
        }
        Ok(())
    }

    fn log_entry(&self, entry: &LogEntry) {
        self.log.lock().write_entry(entry);
    }

    const fn sidecar_rules(&self) -> SidecarRules {
        SidecarRules {
            strict: self.options.strict_format,
        }
    }
}

/// Reason text recorded in the ledger: the underlying message without code or path.
fn failure_reason(err: &RcvError) -> String {
    match err {
        RcvError::SidecarFormat { reason, .. }
        | RcvError::ChecksumMismatch { reason, .. }
        | RcvError::CorruptArchive { reason, .. } => reason.clone(),
        RcvError::Io { source, .. } => source.to_string(),
        other => other.to_string(),
    }
}
