//! Repository scanner: walker, file classification, checksum and archive checks, outcome tracking.

pub mod archive;
pub mod classify;
pub mod cleaner;
pub mod digest;
pub mod engine;
pub mod ledger;
pub mod progress;
pub mod report;
pub mod sidecar;
pub mod walker;
