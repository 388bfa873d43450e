//! The process-wide registry of activated replacements.
//!
//! The registry outlives every pass. It maps each replaced function to its active
//! replacement, hands out the counter that makes replacement names unique and makes sure only
//! one pass runs at a time.
//!
//! The host creates one registry at startup and passes it by reference to every
//! [`crate::hotswap::HotSwap`] it builds; it is only mutated from inside a pass.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use dashmap::DashMap;

use crate::{
    runtime::{ExecutableHandle, MethodHandle},
    Error, Result,
};

/// An activated replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    /// Unique name of the replacement method
    pub name: String,
    /// The replacement method
    pub executable: ExecutableHandle,
    /// Canonical encoding of the disk body the replacement was built from
    pub baseline: Vec<u8>,
}

/// Maps original functions to their active replacements.
#[derive(Debug, Default)]
pub struct ReplacementRegistry {
    active: DashMap<MethodHandle, Replacement>,
    counter: AtomicU64,
    in_flight: AtomicBool,
}

impl ReplacementRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        ReplacementRegistry::default()
    }

    /// Returns the next replacement counter value, starting at 0.
    pub fn next_counter(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::Relaxed)
    }

    /// Records `replacement` as the active replacement of `original`, returning the previous one.
    pub fn record(&self, original: MethodHandle, replacement: Replacement) -> Option<Replacement> {
        self.active.insert(original, replacement)
    }

    /// Returns the active replacement of `original`.
    #[must_use]
    pub fn get(&self, original: MethodHandle) -> Option<Replacement> {
        self.active.get(&original).map(|entry| entry.value().clone())
    }

    /// Returns the canonical disk encoding the active replacement of `original` was built from.
    #[must_use]
    pub fn baseline(&self, original: MethodHandle) -> Option<Vec<u8>> {
        self.active
            .get(&original)
            .map(|entry| entry.value().baseline.clone())
    }

    /// Returns `true` if `original` has been replaced.
    #[must_use]
    pub fn contains(&self, original: MethodHandle) -> bool {
        self.active.contains_key(&original)
    }

    /// Returns the number of replaced functions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.active.len()
    }

    /// Returns `true` if nothing has been replaced yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Claims the registry for one pass.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PassInProgress`] while another [`PassGuard`] is alive.
    pub fn begin_pass(&self) -> Result<PassGuard<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .map_err(|_| Error::PassInProgress)?;

        Ok(PassGuard { registry: self })
    }

    /// Returns `true` while a pass holds the registry.
    #[must_use]
    pub fn is_pass_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}

/// Exclusive claim on a [`ReplacementRegistry`] for the duration of one pass.
///
/// Dropping the guard releases the claim.
#[derive(Debug)]
pub struct PassGuard<'a> {
    registry: &'a ReplacementRegistry,
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.registry.in_flight.store(false, Ordering::Release);
    }
}
