// Copyright (c) 2026-present, mmap-flat-map contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

mod iter;

pub use iter::{Iter, IterMut};

use crate::{
    arrays::Arrays,
    config::max_load_for,
    geometry::ProbeSeq,
    group::GROUP_WIDTH,
    hash::{make_hash, reduced_tag},
    Checksum, DefaultHashBuilder, Geometry, Options,
};
use bytemuck::Pod;
use std::{
    borrow::Borrow,
    hash::{BuildHasher, Hash},
};

/// Occupancy snapshot of a table
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Stats {
    /// Number of stored elements
    pub len: usize,

    /// Number of slots backed by entry storage
    pub capacity: usize,

    /// Element count at which insertion of new keys panics
    pub max_load: usize,

    /// Number of groups
    pub group_count: usize,

    /// Number of groups with at least one overflow bit set
    ///
    /// Erasing never lowers this count, only [`RawTable::clear`] does. A
    /// table under long insert/erase churn accumulates overflow bits and
    /// probes further on lookups, so watch this value and rebuild the table
    /// (or `clear` it) when it approaches `group_count`.
    pub overflowed_groups: usize,
}

/// Open-addressing hash table living inside a caller-provided buffer
///
/// The table never grows. Geometry and the size control (`len`,
/// `max_load`) are not part of the buffer, the owner has to store them to
/// [`RawTable::attach`] again later.
///
/// Elements are addressed by slot index; see [`crate::MmapFlatMap`] for a
/// key/value API.
pub struct RawTable<K, V, B, S = DefaultHashBuilder, const N: usize = GROUP_WIDTH> {
    buffer: B,
    arrays: Arrays<K, V, N>,
    hash_builder: S,
    size: usize,
    max_load: usize,
}

impl<K, V, B, S, const N: usize> std::fmt::Debug for RawTable<K, V, B, S, N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawTable")
            .field("arrays", &self.arrays)
            .field("size", &self.size)
            .field("max_load", &self.max_load)
            .finish_non_exhaustive()
    }
}

impl<K, V, B, S, const N: usize> RawTable<K, V, B, S, N>
where
    K: Pod + Hash + Eq,
    V: Pod,
    B: AsRef<[u8]>,
    S: BuildHasher,
{
    /// Returns the number of bytes a buffer for the given mask needs.
    ///
    /// # Panics
    ///
    /// Panics if the size does not fit into `usize`.
    #[must_use]
    pub fn required_buffer_size(groups_size_mask: usize) -> usize {
        Arrays::<K, V, N>::mmap_buffer_size(groups_size_mask)
    }

    /// Returns the smallest geometry (at least two groups) that accepts
    /// `items` elements at the default load factor.
    #[must_use]
    pub fn geometry_for_items(items: usize) -> Geometry {
        Arrays::<K, V, N>::geometry_for_items(items, Options::default().max_load_factor)
    }

    /// Returns the largest geometry (at least two groups) whose buffer fits
    /// into `len` bytes.
    #[must_use]
    pub fn geometry_for_buffer_len(len: usize) -> Option<Geometry> {
        Arrays::<K, V, N>::geometry_for_buffer_len(len)
    }

    /// Binds to a buffer previously filled by a table of identical geometry,
    /// key/value types and group width.
    ///
    /// Nothing is written. `size` and `max_load` are trusted as long as
    /// `size <= max_load <= capacity` holds.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the geometry's layout does not fit into `usize`, the
    /// buffer is too small or misaligned, or the size control is inconsistent.
    pub fn attach(
        buffer: B,
        geometry: Geometry,
        size: usize,
        max_load: usize,
        hash_builder: S,
    ) -> crate::Result<Self> {
        let arrays = Arrays::from_buffer(buffer.as_ref(), geometry)?;
        let capacity = arrays.capacity();

        if size > max_load || max_load > capacity {
            return Err(crate::Error::InvalidSizeControl {
                size,
                max_load,
                capacity,
            });
        }

        log::trace!("Attached table {geometry:?} with {size}/{max_load} elements");

        Ok(Self {
            buffer,
            arrays,
            hash_builder,
            size,
            max_load,
        })
    }

    /// Returns the maximum number of elements the geometry could hold.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.arrays.capacity()
    }

    /// Returns the element count at which insertion of new keys panics.
    #[must_use]
    pub fn max_load(&self) -> usize {
        self.max_load
    }

    /// Returns the number of stored elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.size
    }

    /// Returns `true` if there are no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Returns `true` if another distinct key can be inserted.
    #[must_use]
    pub fn can_insert(&self) -> bool {
        self.size < self.max_load
    }

    /// Returns `len / capacity`.
    #[must_use]
    pub fn load_factor(&self) -> f32 {
        #[expect(
            clippy::cast_precision_loss,
            reason = "only an approximation is needed"
        )]
        let factor = self.size as f32 / self.capacity() as f32;

        factor
    }

    /// Returns the size class the buffer was laid out for.
    #[must_use]
    pub fn geometry(&self) -> Geometry {
        self.arrays.geometry()
    }

    /// Returns the hash shift selector.
    #[must_use]
    pub fn groups_size_index(&self) -> usize {
        self.geometry().groups_size_index()
    }

    /// Returns the group count minus one.
    #[must_use]
    pub fn groups_size_mask(&self) -> usize {
        self.geometry().groups_size_mask()
    }

    /// Returns the hasher factory.
    #[must_use]
    pub fn hasher(&self) -> &S {
        &self.hash_builder
    }

    /// Returns the bytes of the bound buffer covered by the table.
    #[must_use]
    pub fn buffer(&self) -> &[u8] {
        self.arrays.used(self.buffer.as_ref())
    }

    /// Releases the buffer.
    #[must_use]
    pub fn into_buffer(self) -> B {
        self.buffer
    }

    /// Computes the xxh3-128 checksum of the table's bytes.
    #[must_use]
    pub fn checksum(&self) -> Checksum {
        Checksum::of(self.buffer())
    }

    /// Scans the metadata and returns occupancy statistics.
    #[must_use]
    pub fn stats(&self) -> Stats {
        let bytes = self.buffer.as_ref();

        let overflowed_groups = (0..self.arrays.group_count())
            .filter(|&idx| self.arrays.group(bytes, idx).has_overflow())
            .count();

        Stats {
            len: self.size,
            capacity: self.capacity(),
            max_load: self.max_load,
            group_count: self.arrays.group_count(),
            overflowed_groups,
        }
    }

    pub(crate) fn hash<Q: Hash + ?Sized>(&self, key: &Q) -> u64 {
        make_hash(&self.hash_builder, key)
    }

    /// Returns the slot holding `key`.
    pub fn find<Q>(&self, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        if self.is_empty() {
            return None;
        }

        self.find_with_hash(self.hash(key), key)
    }

    /// Returns the slot holding `key`, which has to hash to `hash`.
    pub fn find_with_hash<Q>(&self, hash: u64, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
    {
        let bytes = self.buffer.as_ref();
        let geometry = self.geometry();
        let capacity = self.capacity();
        let tag = reduced_tag(hash);

        let mut probe = ProbeSeq::new(geometry.position(hash), geometry.groups_size_mask());

        loop {
            let pos = probe.pos();
            let group = self.arrays.group(bytes, pos);

            for idx in group.match_tag(tag) {
                let slot = pos * N + idx;

                // NOTE: A corrupt buffer may have overwritten the sentinel
                if slot < capacity && self.arrays.key(bytes, slot).borrow() == key {
                    return Some(slot);
                }
            }

            if !group.is_overflowed(hash) || !probe.next() {
                return None;
            }
        }
    }

    /// Returns the entry stored in a slot.
    ///
    /// # Panics
    ///
    /// Panics if the slot is out of range.
    #[must_use]
    pub fn entry(&self, slot: usize) -> (&K, &V) {
        debug_assert!(self.arrays.is_occupied(self.buffer.as_ref(), slot));
        self.arrays.entry(self.buffer.as_ref(), slot)
    }

    /// Iterates over all elements in buffer order.
    #[must_use]
    pub fn iter(&self) -> Iter<'_, K, V, N> {
        Iter::new(self.arrays, self.buffer.as_ref(), self.size)
    }
}

impl<K, V, B, S, const N: usize> RawTable<K, V, B, S, N>
where
    K: Pod + Hash + Eq,
    V: Pod,
    B: AsRef<[u8]> + AsMut<[u8]>,
    S: BuildHasher,
{
    /// Initializes an empty table in the given buffer.
    ///
    /// Only group metadata is written, entry storage is left as is.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the geometry's layout does not fit into `usize`, or
    /// the buffer is too small or misaligned.
    pub fn create(buffer: B, geometry: Geometry, hash_builder: S) -> crate::Result<Self> {
        Self::create_with_options(buffer, geometry, hash_builder, Options::default())
    }

    /// Initializes an empty table in the given buffer.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the geometry's layout does not fit into `usize`, or
    /// the buffer is too small or misaligned.
    pub fn create_with_options(
        mut buffer: B,
        geometry: Geometry,
        hash_builder: S,
        options: Options,
    ) -> crate::Result<Self> {
        let arrays = Arrays::from_buffer_init(buffer.as_mut(), geometry)?;
        let max_load = max_load_for(arrays.capacity(), options.max_load_factor);

        log::trace!(
            "Created table {geometry:?}, capacity={}, max_load={max_load}",
            arrays.capacity(),
        );

        Ok(Self {
            buffer,
            arrays,
            hash_builder,
            size: 0,
            max_load,
        })
    }

    /// Inserts an element if its key is not present yet.
    ///
    /// Returns the slot of the element with that key, and whether it was
    /// inserted. An existing element is not modified.
    ///
    /// # Panics
    ///
    /// Panics if the key is absent and the table already holds `max_load` elements.
    pub fn insert(&mut self, key: K, value: V) -> (usize, bool) {
        self.find_or_insert_with(key, || value)
    }

    /// Looks up `key`, inserting the value produced by `f` if it is absent.
    ///
    /// # Panics
    ///
    /// Panics if the key is absent and the table already holds `max_load` elements.
    pub fn find_or_insert_with<F: FnOnce() -> V>(&mut self, key: K, f: F) -> (usize, bool) {
        let hash = self.hash(&key);

        if let Some(slot) = self.find_with_hash(hash, &key) {
            return (slot, false);
        }

        if self.size >= self.max_load {
            log::error!(
                "Table {:?} is full ({}/{}), refusing to insert",
                self.geometry(),
                self.size,
                self.max_load,
            );
            panic!(
                "table is full ({} elements, max_load={}), rehashing is not supported",
                self.size, self.max_load,
            );
        }

        let slot = self.insert_unique(hash, key, f());
        self.size += 1;

        (slot, true)
    }

    fn insert_unique(&mut self, hash: u64, key: K, value: V) -> usize {
        let arrays = self.arrays;
        let geometry = arrays.geometry();
        let capacity = arrays.capacity();
        let bytes = self.buffer.as_mut();
        let tag = reduced_tag(hash);

        let mut probe = ProbeSeq::new(geometry.position(hash), geometry.groups_size_mask());

        loop {
            let pos = probe.pos();

            let free = arrays
                .group(bytes, pos)
                .match_empty()
                .find(|idx| pos * N + idx < capacity);

            if let Some(idx) = free {
                let slot = pos * N + idx;
                arrays.group_mut(bytes, pos).set(idx, tag);
                arrays.write(bytes, slot, key, value);
                return slot;
            }

            arrays.group_mut(bytes, pos).mark_overflow(hash);

            if !probe.next() {
                log::error!(
                    "No free slot in {geometry:?} with {}/{} elements, buffer is corrupt",
                    self.size,
                    self.max_load,
                );
                panic!("probe sequence exhausted below max_load, buffer does not match its size control");
            }
        }
    }

    /// Returns the entry stored in a slot, with a mutable value.
    ///
    /// # Panics
    ///
    /// Panics if the slot is out of range.
    pub fn entry_mut(&mut self, slot: usize) -> (&K, &mut V) {
        debug_assert!(self.arrays.is_occupied(self.buffer.as_ref(), slot));
        self.arrays.entry_mut(self.buffer.as_mut(), slot)
    }

    /// Removes the element in an occupied slot, returning a copy of it.
    pub fn remove_slot(&mut self, slot: usize) -> (K, V) {
        debug_assert!(self.arrays.is_occupied(self.buffer.as_ref(), slot));

        let arrays = self.arrays;
        let bytes = self.buffer.as_mut();

        let (key, value) = arrays.entry(bytes, slot);
        let entry = (*key, *value);

        // NOTE: Overflow bits stay, later keys may have probed past this group
        arrays.group_mut(bytes, slot / N).reset(slot % N);
        self.size -= 1;

        entry
    }

    /// Removes the element with the given key.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let slot = self.find(key)?;
        Some(self.remove_slot(slot))
    }

    /// Removes the element with the given key, returns `true` if there was one.
    pub fn erase<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.remove(key).is_some()
    }

    /// Keeps only the elements for which `f` returns `true`.
    pub fn retain<F: FnMut(&K, &mut V) -> bool>(&mut self, mut f: F) {
        let arrays = self.arrays;
        let bytes = self.buffer.as_mut();

        let mut removed = 0;

        for slot in 0..arrays.capacity() {
            if !arrays.is_occupied(bytes, slot) {
                continue;
            }

            let (key, value) = arrays.entry_mut(bytes, slot);

            if !f(key, value) {
                arrays.group_mut(bytes, slot / N).reset(slot % N);
                removed += 1;
            }
        }

        self.size -= removed;
    }

    /// Removes all elements, also resetting the probing history.
    ///
    /// `max_load` is kept.
    pub fn clear(&mut self) {
        self.arrays.initialize(self.buffer.as_mut());
        self.size = 0;

        log::trace!("Cleared table {:?}", self.geometry());
    }

    /// Iterates over all elements in buffer order, with mutable values.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V, N> {
        IterMut::new(self.arrays, self.buffer.as_mut(), self.size)
    }
}
