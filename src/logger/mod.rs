//! Activity logging: append-only JSONL run log.

pub mod jsonl;
