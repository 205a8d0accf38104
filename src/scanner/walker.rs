//! Parallel directory walker that yields regular files under each root.
//!
//! Directories are expanded by a small pool of worker threads sharing one
//! work queue. Symlinks are followed when configured; a symlinked directory
//! that points back at one of its own ancestors is reported as a traversal
//! error instead of being walked forever. Top-level dot entries of a root
//! (`.cache`, `.index`, ...) are skipped along with everything below them.

#![allow(missing_docs)]

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use crossbeam_channel as channel;

use crate::core::errors::{RcvError, Result};
use crate::core::paths::is_hidden_relative;

/// Walker configuration derived from `VerifyConfig`.
#[derive(Debug, Clone)]
pub struct WalkerConfig {
    pub root_paths: Vec<PathBuf>,
    pub follow_symlinks: bool,
    pub parallelism: usize,
}

/// A regular (or unresolvable) file discovered during a walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry {
    /// Root joined with `relative`.
    pub path: PathBuf,
    /// Path relative to the root it was found under.
    pub relative: PathBuf,
    /// Index into `WalkerConfig::root_paths`.
    pub root_index: usize,
}

/// A traversal failure that is not attributed to a checked file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraversalError {
    pub root: PathBuf,
    pub message: String,
}

impl TraversalError {
    fn new(root: &Path, path: &Path, details: impl std::fmt::Display) -> Self {
        Self {
            root: root.to_path_buf(),
            message: format!("{}: {details}", path.display()),
        }
    }

    /// Convert into the crate error type.
    pub fn into_error(self) -> RcvError {
        RcvError::Traversal {
            root: self.root,
            details: self.message,
        }
    }
}

/// Item streamed out of the walker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkEvent {
    File(WalkEntry),
    Error(TraversalError),
}

/// (device, inode) identity of a directory, used for loop detection.
type DirKey = (u64, u64);

/// Queued directory expansion.
struct WorkItem {
    dir: PathBuf,
    relative: PathBuf,
    root_index: usize,
    ancestors: Arc<Vec<DirKey>>,
}

/// Parallel directory walker.
///
/// Invariants:
/// - every reachable non-directory entry is emitted exactly once per path
/// - directories are never emitted
/// - one bad directory or root never stops the rest of the walk
pub struct DirectoryWalker {
    config: WalkerConfig,
}

impl DirectoryWalker {
    pub fn new(config: WalkerConfig) -> Self {
        Self { config }
    }

    /// Collect every event of a full walk.
    pub fn walk(&self) -> Result<Vec<WalkEvent>> {
        Ok(self.stream()?.into_iter().collect())
    }

    /// Stream events as they are discovered.
    ///
    /// The walk runs on background threads; the receiver disconnects once
    /// every walker thread has finished.
    pub fn stream(&self) -> Result<channel::Receiver<WalkEvent>> {
        let parallelism = self.config.parallelism.max(1);

        let (work_tx, work_rx) = channel::unbounded::<WorkItem>();
        let (result_tx, result_rx) = channel::unbounded::<WalkEvent>();
        let in_flight = Arc::new(AtomicUsize::new(0));
        let roots: Arc<Vec<PathBuf>> = Arc::new(self.config.root_paths.clone());

        for (root_index, root) in roots.iter().enumerate() {
            let meta = match metadata_for_path(root, self.config.follow_symlinks) {
                Ok(meta) => meta,
                Err(err) => {
                    send(&result_tx, WalkEvent::Error(TraversalError::new(root, root, err)))?;
                    continue;
                }
            };
            if !meta.is_dir() {
                send(
                    &result_tx,
                    WalkEvent::Error(TraversalError::new(root, root, "not a directory")),
                )?;
                continue;
            }
            in_flight.fetch_add(1, Ordering::Release);
            work_tx
                .send(WorkItem {
                    dir: root.clone(),
                    relative: PathBuf::new(),
                    root_index,
                    ancestors: Arc::new(dir_key(&meta).into_iter().collect()),
                })
                .map_err(|_| RcvError::ChannelClosed { component: "walker" })?;
        }

        for _ in 0..parallelism {
            let work_rx = work_rx.clone();
            let work_tx = work_tx.clone();
            let result_tx = result_tx.clone();
            let in_flight = Arc::clone(&in_flight);
            let roots = Arc::clone(&roots);
            let follow_symlinks = self.config.follow_symlinks;

            thread::spawn(move || {
                walker_thread(
                    &work_rx,
                    &work_tx,
                    &result_tx,
                    &in_flight,
                    &roots,
                    follow_symlinks,
                );
            });
        }

        Ok(result_rx)
    }
}

fn send(tx: &channel::Sender<WalkEvent>, event: WalkEvent) -> Result<()> {
    tx.send(event)
        .map_err(|_| RcvError::ChannelClosed { component: "walker" })
}

/// Worker loop: pull directories, expand them, stop once nothing is in flight.
fn walker_thread(
    work_rx: &channel::Receiver<WorkItem>,
    work_tx: &channel::Sender<WorkItem>,
    result_tx: &channel::Sender<WalkEvent>,
    in_flight: &AtomicUsize,
    roots: &[PathBuf],
    follow_symlinks: bool,
) {
    loop {
        match work_rx.recv_timeout(Duration::from_millis(20)) {
            Ok(item) => {
                process_directory(&item, work_tx, result_tx, in_flight, roots, follow_symlinks);
                in_flight.fetch_sub(1, Ordering::AcqRel);
            }
            Err(channel::RecvTimeoutError::Timeout) => {
                if in_flight.load(Ordering::Acquire) == 0 {
                    return;
                }
            }
            Err(channel::RecvTimeoutError::Disconnected) => return,
        }
    }
}

/// Read one directory: emit files, queue subdirectories, report failures.
fn process_directory(
    item: &WorkItem,
    work_tx: &channel::Sender<WorkItem>,
    result_tx: &channel::Sender<WalkEvent>,
    in_flight: &AtomicUsize,
    roots: &[PathBuf],
    follow_symlinks: bool,
) {
    let root = &roots[item.root_index];
    let report = |path: &Path, details: &dyn std::fmt::Display| {
        let _ = result_tx.send(WalkEvent::Error(TraversalError::new(root, path, details)));
    };

    let entries = match fs::read_dir(&item.dir) {
        Ok(entries) => entries,
        Err(err) => {
            report(&item.dir, &err);
            return;
        }
    };

    for entry_result in entries {
        let entry = match entry_result {
            Ok(entry) => entry,
            Err(err) => {
                report(&item.dir, &err);
                continue;
            }
        };

        let child_path = entry.path();
        let relative = item.relative.join(entry.file_name());
        if is_hidden_relative(&relative) {
            continue;
        }

        let Ok(ft) = entry.file_type() else {
            report(&child_path, &"unable to read file type");
            continue;
        };

        // Resolve symlinks; a dangling link is handed on as a plain file.
        let dir_meta = if ft.is_dir() {
            match fs::metadata(&child_path) {
                Ok(meta) => Some(meta),
                Err(err) => {
                    report(&child_path, &err);
                    continue;
                }
            }
        } else if ft.is_symlink() {
            match fs::metadata(&child_path) {
                Ok(meta) if meta.is_dir() => {
                    if !follow_symlinks {
                        continue;
                    }
                    Some(meta)
                }
                Ok(_) => None,
                Err(err) if err.kind() == ErrorKind::NotFound => None,
                Err(err) => {
                    report(&child_path, &err);
                    continue;
                }
            }
        } else {
            None
        };

        let Some(meta) = dir_meta else {
            let _ = result_tx.send(WalkEvent::File(WalkEntry {
                path: child_path,
                relative,
                root_index: item.root_index,
            }));
            continue;
        };

        let key = dir_key(&meta);
        if let Some(key) = key
            && item.ancestors.contains(&key)
        {
            report(&child_path, &"file system loop detected");
            continue;
        }
        let mut ancestors = Vec::with_capacity(item.ancestors.len() + 1);
        ancestors.extend_from_slice(&item.ancestors);
        ancestors.extend(key);

        in_flight.fetch_add(1, Ordering::Release);
        let queued = work_tx.send(WorkItem {
            dir: child_path,
            relative,
            root_index: item.root_index,
            ancestors: Arc::new(ancestors),
        });
        if queued.is_err() {
            in_flight.fetch_sub(1, Ordering::Release);
        }
    }
}

fn metadata_for_path(path: &Path, follow_symlinks: bool) -> std::io::Result<fs::Metadata> {
    if follow_symlinks {
        fs::metadata(path)
    } else {
        fs::symlink_metadata(path)
    }
}

/// Directory identity for loop detection; unavailable off Unix.
fn dir_key(meta: &fs::Metadata) -> Option<DirKey> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        Some((meta.dev(), meta.ino()))
    }
    #[cfg(not(unix))]
    {
        let _ = meta;
        None
    }
}
