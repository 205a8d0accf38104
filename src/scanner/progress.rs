//! Live `o`/`x`/`.` progress stream, wrapped at a fixed column width.

#![allow(missing_docs)]

use std::io::{self, Write};

use parking_lot::Mutex;

use crate::scanner::ledger::Outcome;

/// One processed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mark {
    Pass,
    Fail,
    Skip,
}

impl Mark {
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Self::Pass => 'o',
            Self::Fail => 'x',
            Self::Skip => '.',
        }
    }
}

impl From<&Outcome> for Mark {
    fn from(outcome: &Outcome) -> Self {
        if outcome.is_fail() { Self::Fail } else { Self::Pass }
    }
}

struct State {
    out: Box<dyn Write + Send>,
    count: u64,
}

/// Serialized progress writer; every tick is written under one lock.
pub struct Progress {
    width: u64,
    state: Option<Mutex<State>>,
}

impl Progress {
    /// Progress on stderr.
    pub fn stderr(width: usize) -> Self {
        Self::to_writer(Box::new(io::stderr()), width)
    }

    /// Progress into an arbitrary writer.
    pub fn to_writer(out: Box<dyn Write + Send>, width: usize) -> Self {
        Self {
            width: width.max(1) as u64,
            state: Some(Mutex::new(State { out, count: 0 })),
        }
    }

    /// A progress sink that prints nothing.
    pub fn disabled() -> Self {
        Self {
            width: 1,
            state: None,
        }
    }

    pub fn tick(&self, mark: Mark) {
        let Some(state) = &self.state else {
            return;
        };
        let mut state = state.lock();
        state.count += 1;
        let wrap = state.count % self.width == 0;
        let mut buf = [0u8; 2];
        buf[0] = mark.as_char() as u8;
        let len = if wrap {
            buf[1] = b'\n';
            2
        } else {
            1
        };
        let _ = state.out.write_all(&buf[..len]);
        if wrap {
            let _ = state.out.flush();
        }
    }

    /// Terminate an unfinished line and flush.
    pub fn finish(&self) {
        let Some(state) = &self.state else {
            return;
        };
        let mut state = state.lock();
        if state.count % self.width != 0 {
            let _ = state.out.write_all(b"\n");
        }
        let _ = state.out.flush();
    }
}
