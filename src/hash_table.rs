//! HashTable: fixed-capacity chained hash table over caller-owned records.
//!
//! The table stores record *references* (`&T`, `Rc<T>`, `Arc<T>`, anything
//! that derefs to the record) and a key-extraction closure chosen at
//! creation. It never owns the records: dropping the table, or deleting an
//! entry, only releases the reference it held.
//!
//! Each chain link (`HashEntry`) keeps the full 32-bit hash of its key so
//! lookups reject most chain neighbours without calling the comparator.

use crate::error::HashError;
use crate::hash::lookup2;
use crate::reentrancy::DebugReentrancy;
use core::cmp::Ordering;
use core::fmt;
use core::ops::Deref;
use slotmap::{new_key_type, SlotMap};

new_key_type! {
    struct EntryKey;
}

/// How the key bytes returned by the extraction closure are bounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyMode {
    /// Exactly the first `n` bytes (fewer if the extracted slice is shorter).
    Fixed(usize),
    /// NUL-terminated string: bytes up to the first `\0`, at most `max_len`
    /// of them. `max_len == 0` means unbounded.
    Str { max_len: usize },
}

/// Where a new entry goes within its bucket's chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InsertOrder {
    /// Newest first: duplicates are found LIFO.
    #[default]
    Head,
    /// Oldest first: duplicates are found FIFO.
    Tail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HashFlags {
    /// Fold ASCII case before hashing and in the default comparator.
    pub nocase: bool,
    pub order: InsertOrder,
}

impl HashFlags {
    pub const fn case_insensitive(mut self) -> Self {
        self.nocase = true;
        self
    }

    pub const fn insert_tail(mut self) -> Self {
        self.order = InsertOrder::Tail;
        self
    }
}

type KeyFn<T> = Box<dyn Fn(&T) -> &[u8]>;
type CompareFn = Box<dyn Fn(&[u8], &[u8]) -> Ordering>;

#[derive(Debug)]
struct HashEntry<R> {
    record: R,
    hash: u32,
    next: Option<EntryKey>,
}

#[derive(Debug, Clone, Copy, Default)]
struct Bucket {
    head: Option<EntryKey>,
    tail: Option<EntryKey>,
}

/// Walks one bucket's chain in link order.
struct Chain<'a, R> {
    entries: &'a SlotMap<EntryKey, HashEntry<R>>,
    cur: Option<EntryKey>,
}

impl<'a, R> Iterator for Chain<'a, R> {
    type Item = &'a HashEntry<R>;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let e = self.entries.get(self.cur?)?;
        self.cur = e.next;
        Some(e)
    }
}

/// Occupancy figures for diagnostics and dumps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashStats {
    pub name: String,
    pub capacity: usize,
    pub entries: usize,
    pub empty_buckets: usize,
    pub longest_chain: usize,
}

impl fmt::Display for HashStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} entries in {} buckets ({} empty, longest chain {})",
            self.name, self.entries, self.capacity, self.empty_buckets, self.longest_chain
        )
    }
}

pub struct HashTable<R: Deref> {
    name: String,
    mode: KeyMode,
    flags: HashFlags,
    key_fn: KeyFn<R::Target>,
    compare: Option<CompareFn>,
    buckets: Vec<Bucket>,
    entries: SlotMap<EntryKey, HashEntry<R>>,
    reentrancy: DebugReentrancy,
}

impl<R: Deref> HashTable<R> {
    /// Create a table with `capacity` buckets. `name` only shows up in
    /// diagnostics. Keys compare bytewise (or ASCII-case-insensitively with
    /// `HashFlags::nocase`).
    pub fn new<F>(
        name: impl Into<String>,
        capacity: usize,
        mode: KeyMode,
        flags: HashFlags,
        key_fn: F,
    ) -> Result<Self, HashError>
    where
        F: Fn(&R::Target) -> &[u8] + 'static,
    {
        Self::build(name.into(), capacity, mode, flags, Box::new(key_fn), None)
    }

    /// Like `new`, with an injected comparator. `Ordering::Equal` means the
    /// keys match; the comparator sees keys already bounded by `mode` but
    /// not case-folded.
    pub fn with_comparator<F, C>(
        name: impl Into<String>,
        capacity: usize,
        mode: KeyMode,
        flags: HashFlags,
        key_fn: F,
        compare: C,
    ) -> Result<Self, HashError>
    where
        F: Fn(&R::Target) -> &[u8] + 'static,
        C: Fn(&[u8], &[u8]) -> Ordering + 'static,
    {
        Self::build(
            name.into(),
            capacity,
            mode,
            flags,
            Box::new(key_fn),
            Some(Box::new(compare)),
        )
    }

    fn build(
        name: String,
        capacity: usize,
        mode: KeyMode,
        flags: HashFlags,
        key_fn: KeyFn<R::Target>,
        compare: Option<CompareFn>,
    ) -> Result<Self, HashError> {
        if capacity == 0 {
            return Err(HashError::ZeroCapacity);
        }
        if mode == KeyMode::Fixed(0) {
            return Err(HashError::ZeroKeyLength);
        }
        tracing::debug!(table = %name, capacity, ?mode, "created hash table");
        Ok(Self {
            name,
            mode,
            flags,
            key_fn,
            compare,
            buckets: vec![Bucket::default(); capacity],
            entries: SlotMap::with_key(),
            reentrancy: DebugReentrancy::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> usize {
        self.buckets.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn flags(&self) -> HashFlags {
        self.flags
    }

    fn bound<'k>(&self, key: &'k [u8]) -> &'k [u8] {
        match self.mode {
            KeyMode::Fixed(n) => &key[..n.min(key.len())],
            KeyMode::Str { max_len } => {
                let mut end = key.iter().position(|&b| b == 0).unwrap_or(key.len());
                if max_len > 0 {
                    end = end.min(max_len);
                }
                &key[..end]
            }
        }
    }

    fn record_key<'r>(&self, record: &'r R::Target) -> &'r [u8] {
        self.bound((self.key_fn)(record))
    }

    #[inline]
    fn bucket_of(&self, hash: u32) -> usize {
        hash as usize % self.buckets.len()
    }

    fn keys_equal(&self, stored: &[u8], probe: &[u8]) -> bool {
        match &self.compare {
            Some(cmp) => cmp(stored, probe) == Ordering::Equal,
            None if self.flags.nocase => stored.eq_ignore_ascii_case(probe),
            None => stored == probe,
        }
    }

    fn chain(&self, bucket: usize) -> Chain<'_, R> {
        Chain {
            entries: &self.entries,
            cur: self.buckets[bucket].head,
        }
    }

    /// Matches for an already-bounded probe key, in chain order.
    fn matching<'a, 'p>(&'a self, probe: &'p [u8]) -> impl Iterator<Item = &'a R> + 'p
    where
        'a: 'p,
    {
        let hash = lookup2(probe, self.flags.nocase);
        self.chain(self.bucket_of(hash))
            .filter(move |e| {
                e.hash == hash && self.keys_equal(self.record_key(e.record.deref()), probe)
            })
            .map(|e| &e.record)
    }

    /// Index `record`. Duplicate keys are allowed; chain position follows
    /// the table's `InsertOrder`.
    pub fn insert(&mut self, record: R) {
        let _g = self.reentrancy.enter();
        let hash = lookup2(self.record_key(record.deref()), self.flags.nocase);
        let idx = self.bucket_of(hash);
        let key = self.entries.insert(HashEntry {
            record,
            hash,
            next: None,
        });

        let bucket = &mut self.buckets[idx];
        match self.flags.order {
            InsertOrder::Head => {
                self.entries[key].next = bucket.head;
                bucket.head = Some(key);
                if bucket.tail.is_none() {
                    bucket.tail = Some(key);
                }
            }
            InsertOrder::Tail => {
                match bucket.tail {
                    Some(t) => self.entries[t].next = Some(key),
                    None => bucket.head = Some(key),
                }
                bucket.tail = Some(key);
            }
        }
    }

    /// First record (in chain order) whose key equals `key`.
    pub fn find(&self, key: &[u8]) -> Option<&R> {
        let _g = self.reentrancy.enter();
        let probe = self.bound(key);
        let found = self.matching(probe).next();
        found
    }

    /// Look up using another record's key, e.g. a stack-built probe.
    pub fn find_record(&self, probe: &R::Target) -> Option<&R> {
        let _g = self.reentrancy.enter();
        let probe = self.record_key(probe);
        let found = self.matching(probe).next();
        found
    }

    /// Every record whose key equals `key`, in chain order.
    pub fn find_all(&self, key: &[u8]) -> Vec<&R> {
        let _g = self.reentrancy.enter();
        let probe = self.bound(key);
        let found = self.matching(probe).collect();
        found
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.find(key).is_some()
    }

    /// Unlink the entry that refers to `record` (by identity, not key
    /// equality) and hand back the reference the table held.
    pub fn delete(&mut self, record: &R::Target) -> Option<R> {
        let _g = self.reentrancy.enter();
        let hash = lookup2(self.record_key(record), self.flags.nocase);
        let idx = self.bucket_of(hash);

        let mut prev: Option<EntryKey> = None;
        let mut cur = self.buckets[idx].head;
        while let Some(k) = cur {
            let e = &self.entries[k];
            if core::ptr::eq(e.record.deref(), record) {
                break;
            }
            prev = cur;
            cur = e.next;
        }
        let k = cur?;

        let next = self.entries[k].next;
        let bucket = &mut self.buckets[idx];
        match prev {
            Some(p) => self.entries[p].next = next,
            None => bucket.head = next,
        }
        if bucket.tail == Some(k) {
            bucket.tail = prev;
        }
        // Unlinked before the reference is released.
        self.entries.remove(k).map(|e| e.record)
    }

    /// Drop every entry; the table stays usable at the same capacity.
    pub fn clear(&mut self) {
        let _g = self.reentrancy.enter();
        self.buckets.fill(Bucket::default());
        self.entries.clear();
    }

    /// All indexed records, bucket by bucket, each chain in link order.
    pub fn iter(&self) -> impl Iterator<Item = &R> + '_ {
        (0..self.buckets.len())
            .flat_map(move |b| self.chain(b))
            .map(|e| &e.record)
    }

    pub fn stats(&self) -> HashStats {
        let mut empty_buckets = 0;
        let mut longest_chain = 0;
        for b in 0..self.buckets.len() {
            let n = self.chain(b).count();
            if n == 0 {
                empty_buckets += 1;
            }
            longest_chain = longest_chain.max(n);
        }
        HashStats {
            name: self.name.clone(),
            capacity: self.buckets.len(),
            entries: self.entries.len(),
            empty_buckets,
            longest_chain,
        }
    }
}

impl<R: Deref> fmt::Debug for HashTable<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashTable")
            .field("name", &self.name)
            .field("capacity", &self.buckets.len())
            .field("entries", &self.entries.len())
            .field("mode", &self.mode)
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}
