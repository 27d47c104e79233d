// Copyright (c) 2026-present, mmap-flat-map contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

mod iter;

pub use iter::{Keys, Values, ValuesMut};

use crate::{
    group::GROUP_WIDTH,
    raw_table::{Iter, IterMut, RawTable, Stats},
    Checksum, DefaultHashBuilder, Geometry, Options,
};
use bytemuck::Pod;
use std::{
    borrow::Borrow,
    hash::{BuildHasher, Hash},
};

/// A fixed-capacity hash map stored in a caller-provided buffer
///
/// The buffer is typically a memory-mapped file: the map can be
/// [created](MmapFlatMap::create) in it, dropped, and later
/// [attached](MmapFlatMap::attach) again, given the same geometry, size
/// control, key/value types, group width and hasher.
///
/// Keys and values are plain-old-data ([`bytemuck::Pod`]) and are stored in
/// native byte order.
///
/// The map never grows. Inserting a new key into a map holding
/// [`MmapFlatMap::max_load`] elements panics.
///
/// ```
/// use mmap_flat_map::{DefaultHashBuilder, MmapFlatMap};
///
/// type Map<'a> = MmapFlatMap<u64, u32, &'a mut [u8]>;
///
/// let geometry = Map::geometry_for_items(100);
/// let mut buf = vec![0u64; Map::required_buffer_size(geometry.groups_size_mask()).div_ceil(8)];
///
/// let (len, max_load) = {
///     let mut map = Map::create(bytemuck::cast_slice_mut(&mut buf), geometry, DefaultHashBuilder)?;
///     map.insert(1, 10);
///     map.insert(2, 20);
///     (map.len(), map.max_load())
/// };
///
/// let map = MmapFlatMap::<u64, u32, &[u8]>::attach(
///     bytemuck::cast_slice(&buf),
///     geometry,
///     len,
///     max_load,
///     DefaultHashBuilder,
/// )?;
///
/// assert_eq!(Some(&20), map.get(&2));
/// # Ok::<(), mmap_flat_map::Error>(())
/// ```
pub struct MmapFlatMap<K, V, B, S = DefaultHashBuilder, const N: usize = GROUP_WIDTH> {
    table: RawTable<K, V, B, S, N>,
}

impl<K, V, B, S, const N: usize> MmapFlatMap<K, V, B, S, N>
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
        RawTable::<K, V, B, S, N>::required_buffer_size(groups_size_mask)
    }

    /// Returns the smallest geometry (at least two groups) that accepts
    /// `items` elements at the default load factor.
    #[must_use]
    pub fn geometry_for_items(items: usize) -> Geometry {
        RawTable::<K, V, B, S, N>::geometry_for_items(items)
    }

    /// Returns the largest geometry (at least two groups) whose buffer fits
    /// into `len` bytes.
    #[must_use]
    pub fn geometry_for_buffer_len(len: usize) -> Option<Geometry> {
        RawTable::<K, V, B, S, N>::geometry_for_buffer_len(len)
    }

    /// Binds to a buffer previously filled by a map of identical geometry,
    /// key/value types, group width and hasher.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the buffer is too small or misaligned, or
    /// `size <= max_load <= capacity` does not hold.
    pub fn attach(
        buffer: B,
        geometry: Geometry,
        size: usize,
        max_load: usize,
        hash_builder: S,
    ) -> crate::Result<Self> {
        RawTable::attach(buffer, geometry, size, max_load, hash_builder).map(Self::from)
    }

    /// Returns the underlying slot table.
    #[must_use]
    pub fn raw_table(&self) -> &RawTable<K, V, B, S, N> {
        &self.table
    }

    /// Returns the maximum number of elements the geometry could hold.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Returns the element count at which insertion of new keys panics.
    #[must_use]
    pub fn max_load(&self) -> usize {
        self.table.max_load()
    }

    /// Returns the number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the map holds no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Returns `true` if another distinct key can be inserted.
    #[must_use]
    pub fn can_insert(&self) -> bool {
        self.table.can_insert()
    }

    /// Returns `len / capacity`.
    #[must_use]
    pub fn load_factor(&self) -> f32 {
        self.table.load_factor()
    }

    /// Returns the size class the buffer was laid out for.
    #[must_use]
    pub fn geometry(&self) -> Geometry {
        self.table.geometry()
    }

    /// Returns the hash shift selector.
    #[must_use]
    pub fn groups_size_index(&self) -> usize {
        self.table.groups_size_index()
    }

    /// Returns the group count minus one.
    #[must_use]
    pub fn groups_size_mask(&self) -> usize {
        self.table.groups_size_mask()
    }

    /// Returns the hasher factory.
    #[must_use]
    pub fn hasher(&self) -> &S {
        self.table.hasher()
    }

    /// Returns occupancy statistics.
    #[must_use]
    pub fn stats(&self) -> Stats {
        self.table.stats()
    }

    /// Returns the bytes of the bound buffer covered by the map.
    #[must_use]
    pub fn buffer(&self) -> &[u8] {
        self.table.buffer()
    }

    /// Releases the buffer.
    ///
    /// Store [`MmapFlatMap::len`] and [`MmapFlatMap::max_load`] first, they
    /// are needed to attach again.
    #[must_use]
    pub fn into_buffer(self) -> B {
        self.table.into_buffer()
    }

    /// Computes the xxh3-128 checksum of the map's bytes.
    #[must_use]
    pub fn checksum(&self) -> Checksum {
        self.table.checksum()
    }

    /// Returns a reference to the value of `key`.
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get_key_value(key).map(|(_, v)| v)
    }

    /// Returns the stored key and value of `key`.
    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.table.find(key).map(|slot| self.table.entry(slot))
    }

    /// Returns `true` if the map contains `key`.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.table.find(key).is_some()
    }

    /// Returns the value of `key`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::KeyNotFound`] if the key is absent.
    pub fn at<Q>(&self, key: &Q) -> crate::Result<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get(key).ok_or(crate::Error::KeyNotFound)
    }

    /// Iterates over all elements, in buffer order.
    #[must_use]
    pub fn iter(&self) -> Iter<'_, K, V, N> {
        self.table.iter()
    }

    /// Iterates over all keys, in buffer order.
    #[must_use]
    pub fn keys(&self) -> Keys<'_, K, V, N> {
        Keys(self.iter())
    }

    /// Iterates over all values, in buffer order.
    #[must_use]
    pub fn values(&self) -> Values<'_, K, V, N> {
        Values(self.iter())
    }
}

impl<K, V, B, S, const N: usize> MmapFlatMap<K, V, B, S, N>
where
    K: Pod + Hash + Eq,
    V: Pod,
    B: AsRef<[u8]> + AsMut<[u8]>,
    S: BuildHasher,
{
    /// Creates an empty map in the given buffer.
    ///
    /// Only group metadata is written.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the buffer is too small or misaligned.
    pub fn create(buffer: B, geometry: Geometry, hash_builder: S) -> crate::Result<Self> {
        RawTable::create(buffer, geometry, hash_builder).map(Self::from)
    }

    /// Creates an empty map in the given buffer.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the buffer is too small or misaligned.
    pub fn create_with_options(
        buffer: B,
        geometry: Geometry,
        hash_builder: S,
        options: Options,
    ) -> crate::Result<Self> {
        RawTable::create_with_options(buffer, geometry, hash_builder, options).map(Self::from)
    }

    /// Inserts `value` under `key` if the key is absent.
    ///
    /// Returns the stored value, and whether it was inserted. An existing
    /// value is left alone.
    ///
    /// # Panics
    ///
    /// Panics if the key is absent and the map is full.
    pub fn insert(&mut self, key: K, value: V) -> (&mut V, bool) {
        let (slot, inserted) = self.table.insert(key, value);
        (self.table.entry_mut(slot).1, inserted)
    }

    /// Inserts `value` under `key`, overwriting an existing value.
    ///
    /// Returns the stored value, and whether the key was new.
    ///
    /// # Panics
    ///
    /// Panics if the key is absent and the map is full.
    pub fn insert_or_assign(&mut self, key: K, value: V) -> (&mut V, bool) {
        let (slot, inserted) = self.table.insert(key, value);
        let stored = self.table.entry_mut(slot).1;

        if !inserted {
            *stored = value;
        }

        (stored, inserted)
    }

    /// Returns the value of `key`, inserting the result of `f` if absent.
    ///
    /// # Panics
    ///
    /// Panics if the key is absent and the map is full.
    pub fn get_or_insert_with<F: FnOnce() -> V>(&mut self, key: K, f: F) -> &mut V {
        let (slot, _) = self.table.find_or_insert_with(key, f);
        self.table.entry_mut(slot).1
    }

    /// Returns the value of `key`, inserting `V::default()` if absent.
    ///
    /// # Panics
    ///
    /// Panics if the key is absent and the map is full.
    pub fn get_or_insert_default(&mut self, key: K) -> &mut V
    where
        V: Default,
    {
        self.get_or_insert_with(key, V::default)
    }

    /// Returns a mutable reference to the value of `key`.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let slot = self.table.find(key)?;
        Some(self.table.entry_mut(slot).1)
    }

    /// Removes `key`, returning the number of removed elements (0 or 1).
    pub fn erase<Q>(&mut self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        usize::from(self.table.erase(key))
    }

    /// Removes `key`, returning its value.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.remove_entry(key).map(|(_, v)| v)
    }

    /// Removes `key`, returning the stored key and value.
    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.table.remove(key)
    }

    /// Keeps only the elements for which `f` returns `true`.
    pub fn retain<F: FnMut(&K, &mut V) -> bool>(&mut self, f: F) {
        self.table.retain(f);
    }

    /// Removes all elements. `max_load` is kept.
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Iterates over all elements with mutable values, in buffer order.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V, N> {
        self.table.iter_mut()
    }

    /// Iterates over all values mutably, in buffer order.
    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V, N> {
        ValuesMut(self.iter_mut())
    }
}

impl<K, V, B, S, const N: usize> From<RawTable<K, V, B, S, N>> for MmapFlatMap<K, V, B, S, N> {
    fn from(table: RawTable<K, V, B, S, N>) -> Self {
        Self { table }
    }
}

impl<K, V, B, S, const N: usize> std::fmt::Debug for MmapFlatMap<K, V, B, S, N>
where
    K: Pod + Hash + Eq + std::fmt::Debug,
    V: Pod + std::fmt::Debug,
    B: AsRef<[u8]>,
    S: BuildHasher,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, B1, B2, S1, S2, const N: usize> PartialEq<MmapFlatMap<K, V, B2, S2, N>>
    for MmapFlatMap<K, V, B1, S1, N>
where
    K: Pod + Hash + Eq,
    V: Pod + PartialEq,
    B1: AsRef<[u8]>,
    B2: AsRef<[u8]>,
    S1: BuildHasher,
    S2: BuildHasher,
{
    fn eq(&self, other: &MmapFlatMap<K, V, B2, S2, N>) -> bool {
        self.len() == other.len() && self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

/// Inserts every element like [`MmapFlatMap::insert`], keeping existing values.
impl<K, V, B, S, const N: usize> Extend<(K, V)> for MmapFlatMap<K, V, B, S, N>
where
    K: Pod + Hash + Eq,
    V: Pod,
    B: AsRef<[u8]> + AsMut<[u8]>,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<'a, K, V, B, S, const N: usize> IntoIterator for &'a MmapFlatMap<K, V, B, S, N>
where
    K: Pod + Hash + Eq,
    V: Pod,
    B: AsRef<[u8]>,
    S: BuildHasher,
{
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V, N>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, B, S, const N: usize> IntoIterator for &'a mut MmapFlatMap<K, V, B, S, N>
where
    K: Pod + Hash + Eq,
    V: Pod,
    B: AsRef<[u8]> + AsMut<[u8]>,
    S: BuildHasher,
{
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V, N>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}
