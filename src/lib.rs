#![forbid(unsafe_code)]

//! Repository cache verifier (rcv): integrity checks for a local package cache.
//!
//! Walks one or more repository roots (by default `~/.m2/repository`) and
//! checks every file that matters:
//! 1. **Checksum sidecars** (`*.sha1`) must be a single 40-hex-digit line
//! 2. **Targets of sidecars** must hash to the recorded SHA-1
//! 3. **Archives without a usable sidecar** must decompress cleanly entry by entry
//!
//! # Library usage
//!
//! ```rust,no_run
//! use repo_cache_verifier::prelude::*;
//!
//! let config = Config::load(None)?;
//! let summary = Verifier::new(VerifierOptions::from_config(&config.verify))
//!     .run(RunMode::Test, &ReportOnlyCleaner)?;
//! print!("{}", summary.to_text());
//! # Ok::<(), RcvError>(())
//! ```

pub mod prelude;

pub mod core;
pub mod logger;
pub mod scanner;
