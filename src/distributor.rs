//! Shared work queue
//!
//! Workers pop one target at a time from the remaining set. The lock is held
//! only for the pop; no I/O happens under it.
//!
//! The set is already deduplicated, so it is flattened into a `Vec` up front
//! and every claim is a constant-time `pop` from its end.

use crate::target::{Target, TargetSet};

use std::mem;
use std::sync::{Mutex, PoisonError};

/// Thread-safe, draining view over a [`TargetSet`]
#[derive(Debug)]
pub struct WorkQueue {
    remaining: Mutex<Vec<Target>>,
}

impl WorkQueue {
    pub fn new(targets: TargetSet) -> Self {
        Self {
            remaining: Mutex::new(targets.into_inner().into_iter().collect()),
        }
    }

    /// Remove and return an arbitrary remaining target, or `None` once drained
    pub fn take_next(&self) -> Option<Target> {
        self.remaining
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop()
    }

    /// Number of targets not yet claimed
    pub fn remaining(&self) -> usize {
        self.remaining
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Take everything still unclaimed
    pub fn drain(&self) -> Vec<Target> {
        mem::take(&mut *self.remaining.lock().unwrap_or_else(PoisonError::into_inner))
    }
}
