//! daemon-core: the storage and configuration substrate of a modular chat
//! daemon.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: give the daemon's modules one keyed index type and one
//!   configuration representation, each small enough to reason about on
//!   its own.
//! - Pieces:
//!   - HashTable<R>: fixed-capacity chained table over caller-owned
//!     records. Keys are extracted from the record by a closure, bounded
//!     by a `KeyMode`, hashed with lookup2 and optionally case-folded.
//!   - ConfTree: arena of entries and sibling lists produced by the
//!     parser, with a `Query`-driven search API (first match, next match,
//!     section children, leaf values, typed values).
//!   - Logger: per-level hooks behind a bounded recursion counter, with
//!     every event also forwarded to `tracing`.
//!   - Context: the live tree plus the logger, reloaded all-or-nothing.
//!
//! Constraints
//! - Single-threaded: tables and the logger carry `Cell` state and are
//!   `!Sync`. A parsed tree is immutable and may be shared read-only.
//! - Tables never resize; callers size them up front.
//! - Tables never own records. They hold a reference type (`&T`, `Rc<T>`,
//!   ...) and deleting an entry hands that reference back.
//! - Lookup misses are `None`; malformed input is an `Err`; allocation
//!   failure aborts.
//!
//! Entry linkage
//! - Chain links live in a `SlotMap` owned by the table rather than inside
//!   the records, so one record can sit in several tables and no record
//!   type needs intrusive fields.
//! - Each link stores the full 32-bit hash of its key; lookups compare
//!   that before calling the comparator.
//! - Deletion is by identity (`ptr::eq` on the dereferenced record): two
//!   records with equal keys are still different entries.
//!
//! Reentrancy policy
//! - `HashTable` runs user closures (key extraction, comparators) while
//!   walking a chain. A debug-only guard panics if such a closure calls
//!   back into the same table.
//! - `Logger` hooks may log again. Nesting is allowed up to a fixed depth
//!   and events beyond it are dropped.
//!
//! Configuration trees
//! - Entries and lists are arena slots addressed by generational ids, so a
//!   stale id after `destroy_branch` resolves to `None`.
//! - Search order is document pre-order. A recursive search visits a
//!   matching section before that section's own children.
//! - Parsing never yields a partial tree: the caller receives either the
//!   whole tree or the first error with its origin and line.
//!
//! Notes and non-goals
//! - No table iteration guarantees beyond "each entry once".
//! - No concurrent access, no persistence, no network protocol handling.

pub mod conf_parse;
pub mod conf_tree;
pub mod context;
pub mod error;
pub mod hash;
pub mod hash_table;
mod hash_table_proptest;
pub mod log;
pub mod logging;
mod reentrancy;

// Public surface
pub use conf_tree::{ConfEntry, ConfList, ConfTree, EntryId, EntryKind, ListId, Query};
pub use context::Context;
pub use error::{ConfError, HashError};
pub use hash_table::{HashFlags, HashStats, HashTable, InsertOrder, KeyMode};
pub use log::{LogEvent, LogLevel, Logger};
