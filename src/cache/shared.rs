//! Reference-Counted Shared Objects
//!
//! Layouts, samplers and format-conversion samplers are shared between many
//! higher-level objects. [`RefCountedCache`] stores each one once, in a slot
//! arena, together with an explicit reference count:
//!
//! - `get_or_create` returns a [`SharedHandle`] and bumps the count,
//! - `acquire` hands out a second handle to the same object,
//! - `release` consumes a handle; the last release removes the entry and
//!   returns the object so the owner can destroy it.
//!
//! Handles are deliberately not `Clone`: every handle is one reference, and
//! giving it back is the only way to drop that reference. Using a handle after
//! its entry is gone is a contract violation and panics.

use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;

use rustc_hash::FxHashMap;
use slotmap::{SlotMap, new_key_type};

use super::stats::{CacheKind, CacheStats, CacheStatsAccumulator, HasCacheStats};
use crate::errors::Result;
use crate::serial::{Serial, SerialFactory};

new_key_type! {
    /// Arena slot of a shared object.
    pub struct SharedKey;
}

/// One counted reference to a shared object of type `T`.
#[must_use = "shared handles hold a reference and must be released to their cache"]
pub struct SharedHandle<T> {
    key: SharedKey,
    serial: Serial,
    _marker: PhantomData<fn() -> T>,
}

impl<T> SharedHandle<T> {
    fn new(key: SharedKey, serial: Serial) -> Self {
        Self {
            key,
            serial,
            _marker: PhantomData,
        }
    }

    /// Identity of the referenced object. Stable for the object's lifetime.
    #[inline]
    #[must_use]
    pub fn serial(&self) -> Serial {
        self.serial
    }

    #[inline]
    #[must_use]
    pub fn key(&self) -> SharedKey {
        self.key
    }

    /// Whether both handles reference the same object.
    #[inline]
    #[must_use]
    pub fn same_object(&self, other: &Self) -> bool {
        self.key == other.key && self.serial == other.serial
    }
}

impl<T> fmt::Debug for SharedHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedHandle")
            .field("key", &self.key)
            .field("serial", &self.serial)
            .finish()
    }
}

struct SharedEntry<K, T> {
    key: K,
    object: T,
    ref_count: u32,
    serial: Serial,
}

/// Descriptor-keyed store of reference-counted objects.
pub struct RefCountedCache<K, T> {
    entries: SlotMap<SharedKey, SharedEntry<K, T>>,
    lookup: FxHashMap<K, SharedKey>,
    serials: SerialFactory,
    kind: CacheKind,
    stats: CacheStats,
}

impl<K, T> RefCountedCache<K, T>
where
    K: Eq + Hash + Clone,
{
    #[must_use]
    pub fn new(kind: CacheKind) -> Self {
        Self {
            entries: SlotMap::with_key(),
            lookup: FxHashMap::default(),
            serials: SerialFactory::new(),
            kind,
            stats: CacheStats::new(),
        }
    }

    /// Returns a new reference to the object for `key`, calling `create` on a
    /// miss. A failed `create` leaves the cache unchanged.
    pub fn get_or_create(&mut self, key: &K, create: impl FnOnce() -> Result<T>) -> Result<SharedHandle<T>> {
        if let Some(&slot) = self.lookup.get(key) {
            self.stats.hit();
            let entry = &mut self.entries[slot];
            entry.ref_count += 1;
            return Ok(SharedHandle::new(slot, entry.serial));
        }

        self.stats.miss();
        let object = create()?;
        let serial = self.serials.generate();
        let slot = self.entries.insert(SharedEntry {
            key: key.clone(),
            object,
            ref_count: 1,
            serial,
        });
        self.lookup.insert(key.clone(), slot);
        log::debug!("Created shared {:?} object #{}", self.kind, serial.value());
        Ok(SharedHandle::new(slot, serial))
    }

    fn entry(&self, handle: &SharedHandle<T>) -> &SharedEntry<K, T> {
        match self.entries.get(handle.key) {
            Some(entry) if entry.serial == handle.serial => entry,
            _ => panic!("stale {:?} handle {handle:?}", self.kind),
        }
    }

    fn entry_mut(&mut self, handle: &SharedHandle<T>) -> &mut SharedEntry<K, T> {
        let kind = self.kind;
        match self.entries.get_mut(handle.key) {
            Some(entry) if entry.serial == handle.serial => entry,
            _ => panic!("stale {kind:?} handle {handle:?}"),
        }
    }

    /// A second reference to the object behind `handle`.
    ///
    /// # Panics
    ///
    /// Panics if `handle` is stale.
    pub fn acquire(&mut self, handle: &SharedHandle<T>) -> SharedHandle<T> {
        let entry = self.entry_mut(handle);
        entry.ref_count += 1;
        SharedHandle::new(handle.key, handle.serial)
    }

    /// Gives back one reference. Returns the key and object once the last
    /// reference is gone; the caller destroys the object.
    ///
    /// # Panics
    ///
    /// Panics if `handle` is stale.
    pub fn release(&mut self, handle: SharedHandle<T>) -> Option<(K, T)> {
        let entry = self.entry_mut(&handle);
        assert!(entry.ref_count > 0, "reference count underflow");
        entry.ref_count -= 1;
        if entry.ref_count > 0 {
            return None;
        }

        let entry = self.entries.remove(handle.key)?;
        self.lookup.remove(&entry.key);
        log::debug!("Released last reference to shared {:?} object #{}", self.kind, entry.serial.value());
        Some((entry.key, entry.object))
    }

    /// # Panics
    ///
    /// Panics if `handle` is stale.
    #[must_use]
    pub fn get(&self, handle: &SharedHandle<T>) -> &T {
        &self.entry(handle).object
    }

    /// # Panics
    ///
    /// Panics if `handle` is stale.
    #[must_use]
    pub fn ref_count(&self, handle: &SharedHandle<T>) -> u32 {
        self.entry(handle).ref_count
    }

    /// The object for `key`, without taking a reference.
    #[must_use]
    pub fn lookup(&self, key: &K) -> Option<&T> {
        self.lookup.get(key).map(|&slot| &self.entries[slot].object)
    }

    #[must_use]
    pub fn contains(&self, key: &K) -> bool {
        self.lookup.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn kind(&self) -> CacheKind {
        self.kind
    }

    #[must_use]
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Removes every entry, referenced or not, passing each object to
    /// `destroy`. Outstanding handles become stale.
    pub fn destroy(&mut self, mut destroy: impl FnMut(T)) {
        let live = self.entries.values().filter(|entry| entry.ref_count > 0).count();
        if live > 0 {
            log::warn!("Destroying {:?} cache with {live} objects still referenced", self.kind);
        }
        self.lookup.clear();
        for (_, entry) in self.entries.drain() {
            destroy(entry.object);
        }
    }
}

impl<K, T> HasCacheStats for RefCountedCache<K, T> {
    fn accumulate_cache_stats(&mut self, accumulator: &mut dyn CacheStatsAccumulator) {
        accumulator.accumulate(self.kind, &self.stats);
        self.stats.reset();
    }
}
