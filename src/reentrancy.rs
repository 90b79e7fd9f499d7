//! Re-entrancy tracking for single-threaded structures.
//!
//! Two flavours live here:
//! - `DebugReentrancy`: detects accidental nested entry into a hash table
//!   while user closures (key extraction, comparators) run. Panics in debug
//!   builds, compiles to nothing in release builds.
//! - `RecursionLimit`: a bounded depth counter for dispatch paths that are
//!   allowed to nest a little (a log hook that logs again) but must not
//!   recurse without bound. Always active.

use core::cell::Cell;
use core::marker::PhantomData;

/// Nested-entry detector for the hash table: a `RecursionLimit` of one
/// that panics instead of refusing. Release builds carry no state.
#[derive(Debug)]
pub struct DebugReentrancy {
    #[cfg(debug_assertions)]
    limit: RecursionLimit,
    _nosend: PhantomData<*mut ()>,
}

impl DebugReentrancy {
    pub const fn new() -> Self {
        Self {
            #[cfg(debug_assertions)]
            limit: RecursionLimit::new(1),
            _nosend: PhantomData,
        }
    }

    /// Hold the returned guard for the duration of a public method. A
    /// second `enter` while it is alive panics in debug builds.
    #[inline]
    pub fn enter(&self) -> ReentrancyGuard<'_> {
        #[cfg(debug_assertions)]
        {
            let Some(depth) = self.limit.enter() else {
                panic!("reentrancy detected: nested entry into hash table");
            };
            return ReentrancyGuard { _depth: depth };
        }

        #[cfg(not(debug_assertions))]
        {
            return ReentrancyGuard { _z: PhantomData };
        }
    }
}

impl Default for DebugReentrancy {
    fn default() -> Self {
        Self::new()
    }
}

#[must_use]
pub struct ReentrancyGuard<'a> {
    #[cfg(debug_assertions)]
    _depth: DepthGuard<'a>,
    #[cfg(not(debug_assertions))]
    _z: PhantomData<&'a ()>,
}

/// Bounded nesting counter. `enter` hands out a guard while the current
/// depth is below `max`, and `None` once the bound is reached.
#[derive(Debug)]
pub struct RecursionLimit {
    depth: Cell<u32>,
    max: u32,
    _nosend: PhantomData<*mut ()>,
}

impl RecursionLimit {
    pub const fn new(max: u32) -> Self {
        Self {
            depth: Cell::new(0),
            max,
            _nosend: PhantomData,
        }
    }

    /// Current nesting depth (0 when nobody is inside).
    pub fn depth(&self) -> u32 {
        self.depth.get()
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    #[inline]
    pub fn enter(&self) -> Option<DepthGuard<'_>> {
        let d = self.depth.get();
        if d >= self.max {
            return None;
        }
        self.depth.set(d + 1);
        Some(DepthGuard { owner: self })
    }
}

/// RAII guard returned by `RecursionLimit::enter`.
pub struct DepthGuard<'a> {
    owner: &'a RecursionLimit,
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        let d = self.owner.depth.get();
        debug_assert!(d > 0);
        self.owner.depth.set(d - 1);
    }
}
