// Copyright (c) 2026-present, mmap-flat-map contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Physical buffer layout
//!
//! ## Format
//!
//! \[group 0\] ... \[group M\] \[padding to entry alignment\] \[entry 0\] ... \[entry C-1\]
//!
//! with `M = groups_size_mask` and `C = (M + 1) * N - 1`. The last slot of
//! the last group is the sentinel and has no entry storage. Entries are laid
//! out like `#[repr(C)] struct { key: K, value: V }`.
//!
//! This is the only module that computes buffer offsets.

use crate::{
    config::max_load_for,
    group::{Group, GroupMut, MARKER_SENTINEL},
    Geometry,
};
use bytemuck::Pod;
use std::{alloc::Layout, marker::PhantomData, ops::Range};

/// Size, alignment and value offset of one entry slot
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct EntryLayout {
    /// Slot size in bytes, including trailing padding
    pub size: usize,

    /// Slot alignment
    pub align: usize,

    /// Offset of the value within the slot (the key is at 0)
    pub value_offset: usize,
}

impl EntryLayout {
    /// Layout of a `#[repr(C)]` pair of the given key and value layouts.
    ///
    /// Returns `None` if the pair would overflow `isize::MAX`.
    #[must_use]
    pub fn from_layouts(key: Layout, value: Layout) -> Option<Self> {
        let (layout, value_offset) = key.extend(value).ok()?;
        let layout = layout.pad_to_align();

        Some(Self {
            size: layout.size(),
            align: layout.align(),
            value_offset,
        })
    }

    /// Layout of a `(K, V)` slot.
    #[must_use]
    pub fn of<K, V>() -> Self {
        #[expect(
            clippy::expect_used,
            reason = "two sized values can only overflow isize::MAX if either already does"
        )]
        Self::from_layouts(Layout::new::<K>(), Layout::new::<V>())
            .expect("entry layout should not overflow")
    }
}

/// Number of slots backed by entry storage.
///
/// Returns `None` if the count does not fit into `usize`.
#[must_use]
pub fn capacity_of(slots_per_group: usize, groups_size_mask: usize) -> Option<usize> {
    groups_size_mask
        .checked_add(1)?
        .checked_mul(slots_per_group)?
        .checked_sub(1)
}

fn groups_len_of(slots_per_group: usize, groups_size_mask: usize) -> Option<usize> {
    groups_size_mask
        .checked_add(1)?
        .checked_mul(slots_per_group.checked_add(1)?)
}

fn entries_offset_of(
    slots_per_group: usize,
    groups_size_mask: usize,
    entry: EntryLayout,
) -> Option<usize> {
    groups_len_of(slots_per_group, groups_size_mask)?.checked_next_multiple_of(entry.align)
}

/// Exact byte size of a table buffer of the given shape.
///
/// Returns `None` if the size does not fit into `usize`.
#[must_use]
pub fn buffer_size_of(
    slots_per_group: usize,
    groups_size_mask: usize,
    entry: EntryLayout,
) -> Option<usize> {
    let entries_len = capacity_of(slots_per_group, groups_size_mask)?.checked_mul(entry.size)?;
    entries_offset_of(slots_per_group, groups_size_mask, entry)?.checked_add(entries_len)
}

/// Layout view over a table buffer
///
/// Holds no pointer: every accessor takes the buffer, so the view stays
/// valid however the buffer handle is moved around.
pub struct Arrays<K, V, const N: usize> {
    geometry: Geometry,
    entry: EntryLayout,
    groups_len: usize,
    entries_offset: usize,
    capacity: usize,
    buffer_size: usize,
    _marker: PhantomData<fn() -> (K, V)>,
}

impl<K, V, const N: usize> Clone for Arrays<K, V, N> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, V, const N: usize> Copy for Arrays<K, V, N> {}

impl<K, V, const N: usize> std::fmt::Debug for Arrays<K, V, N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arrays")
            .field("geometry", &self.geometry)
            .field("slots_per_group", &N)
            .field("entry", &self.entry)
            .finish()
    }
}

impl<K: Pod, V: Pod, const N: usize> Arrays<K, V, N> {
    fn new(geometry: Geometry) -> crate::Result<Self> {
        let () = Group::<N>::VALID_WIDTH;

        assert!(
            std::mem::size_of::<K>() > 0,
            "zero-sized keys are not supported"
        );

        let mask = geometry.groups_size_mask();
        let entry = EntryLayout::of::<K, V>();

        let layout = groups_len_of(N, mask).zip(entries_offset_of(N, mask, entry));
        let sizes = capacity_of(N, mask).zip(buffer_size_of(N, mask, entry));

        let (Some((groups_len, entries_offset)), Some((capacity, buffer_size))) = (layout, sizes)
        else {
            return Err(crate::Error::InvalidGeometry {
                groups_size_mask: mask,
            });
        };

        Ok(Self {
            geometry,
            entry,
            groups_len,
            entries_offset,
            capacity,
            buffer_size,
            _marker: PhantomData,
        })
    }

    /// Maximum element count of a table with the given mask.
    ///
    /// # Panics
    ///
    /// Panics if the count does not fit into `usize`.
    #[must_use]
    pub fn capacity_for(groups_size_mask: usize) -> usize {
        #[expect(clippy::expect_used, reason = "size queries have no error channel")]
        capacity_of(N, groups_size_mask).expect("capacity should fit into usize")
    }

    /// Exact number of bytes a table with the given mask occupies.
    ///
    /// # Panics
    ///
    /// Panics if the size does not fit into `usize`, see
    /// [`Arrays::checked_mmap_buffer_size`].
    #[must_use]
    pub fn mmap_buffer_size(groups_size_mask: usize) -> usize {
        #[expect(clippy::expect_used, reason = "size queries have no error channel")]
        Self::checked_mmap_buffer_size(groups_size_mask).expect("buffer size should fit into usize")
    }

    /// Exact number of bytes a table with the given mask occupies, or
    /// `None` if that does not fit into `usize`.
    #[must_use]
    pub fn checked_mmap_buffer_size(groups_size_mask: usize) -> Option<usize> {
        buffer_size_of(N, groups_size_mask, EntryLayout::of::<K, V>())
    }

    /// Binds to an already initialized buffer without modifying it.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the geometry's layout does not fit into `usize`, or
    /// the buffer is too short or misaligned for the entry type.
    pub fn from_buffer(bytes: &[u8], geometry: Geometry) -> crate::Result<Self> {
        let arrays = Self::new(geometry)?;
        arrays.validate(bytes)?;
        Ok(arrays)
    }

    /// Binds to a fresh buffer, marking every slot empty and writing the sentinel.
    ///
    /// Entry storage is left untouched.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the geometry's layout does not fit into `usize`, or
    /// the buffer is too short or misaligned for the entry type.
    pub fn from_buffer_init(bytes: &mut [u8], geometry: Geometry) -> crate::Result<Self> {
        let arrays = Self::from_buffer(bytes, geometry)?;
        arrays.initialize(bytes);
        Ok(arrays)
    }

    fn validate(&self, bytes: &[u8]) -> crate::Result<()> {
        let required = self.buffer_size();

        if bytes.len() < required {
            return Err(crate::Error::BufferTooSmall {
                required,
                actual: bytes.len(),
            });
        }

        if (bytes.as_ptr() as usize) % self.entry.align != 0 {
            return Err(crate::Error::MisalignedBuffer {
                align: self.entry.align,
            });
        }

        Ok(())
    }

    /// Resets all group metadata to the empty state.
    pub fn initialize(&self, bytes: &mut [u8]) {
        let (groups, _) = self.split_mut(bytes);
        groups.fill(0);

        self.group_mut(bytes, self.geometry.groups_size_mask())
            .set_sentinel();
    }

    #[must_use]
    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    #[must_use]
    pub fn entry_layout(&self) -> EntryLayout {
        self.entry
    }

    #[must_use]
    pub fn group_count(&self) -> usize {
        self.geometry.group_count()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    #[must_use]
    pub fn entries_offset(&self) -> usize {
        self.entries_offset
    }

    fn groups_len(&self) -> usize {
        self.groups_len
    }

    /// Returns the bytes covered by the layout.
    #[must_use]
    pub fn used<'a>(&self, bytes: &'a [u8]) -> &'a [u8] {
        bytes
            .get(..self.buffer_size())
            .expect("buffer was validated at bind time")
    }

    /// Splits the buffer into the group region and the entry region.
    #[must_use]
    pub fn split<'a>(&self, bytes: &'a [u8]) -> (&'a [u8], &'a [u8]) {
        let groups_len = self.groups_len();

        let groups = bytes
            .get(..groups_len)
            .expect("buffer was validated at bind time");

        let entries = bytes
            .get(self.entries_offset()..self.buffer_size())
            .expect("buffer was validated at bind time");

        (groups, entries)
    }

    /// Splits the buffer into the group region and the entry region.
    pub fn split_mut<'a>(&self, bytes: &'a mut [u8]) -> (&'a mut [u8], &'a mut [u8]) {
        let groups_len = self.groups_len();
        let entries_offset = self.entries_offset();
        let buffer_size = self.buffer_size();

        let used = bytes
            .get_mut(..buffer_size)
            .expect("buffer was validated at bind time");

        let (groups, rest) = used.split_at_mut(groups_len);

        let entries = rest
            .get_mut((entries_offset - groups_len)..)
            .expect("buffer was validated at bind time");

        (groups, entries)
    }

    fn group_range(idx: usize) -> Range<usize> {
        let start = idx * Group::<N>::SIZE;
        start..(start + Group::<N>::SIZE)
    }

    #[must_use]
    pub fn group<'a>(&self, bytes: &'a [u8], idx: usize) -> Group<'a, N> {
        debug_assert!(idx < self.group_count());

        Group::new(
            bytes
                .get(Self::group_range(idx))
                .expect("group should be in bounds"),
        )
    }

    pub fn group_mut<'a>(&self, bytes: &'a mut [u8], idx: usize) -> GroupMut<'a, N> {
        debug_assert!(idx < self.group_count());

        GroupMut::new(
            bytes
                .get_mut(Self::group_range(idx))
                .expect("group should be in bounds"),
        )
    }

    fn entry_range(&self, slot: usize) -> Range<usize> {
        debug_assert!(slot < self.capacity(), "sentinel slot has no entry");

        let start = self.entries_offset() + slot * self.entry.size;
        start..(start + self.entry.size)
    }

    fn key_range() -> Range<usize> {
        0..std::mem::size_of::<K>()
    }

    fn value_range(&self) -> Range<usize> {
        self.entry.value_offset..(self.entry.value_offset + std::mem::size_of::<V>())
    }

    /// Interprets one entry's bytes as key and value.
    #[must_use]
    pub fn decode_entry<'a>(&self, entry: &'a [u8]) -> (&'a K, &'a V) {
        let key = entry.get(Self::key_range()).expect("key should be in bounds");
        let value = entry
            .get(self.value_range())
            .expect("value should be in bounds");

        (bytemuck::from_bytes(key), bytemuck::from_bytes(value))
    }

    /// Interprets one entry's bytes as key and mutable value.
    pub fn decode_entry_mut<'a>(&self, entry: &'a mut [u8]) -> (&'a K, &'a mut V) {
        let (key, value) = entry.split_at_mut(self.entry.value_offset);
        let key: &'a [u8] = key;

        let key = key.get(Self::key_range()).expect("key should be in bounds");
        let value = value
            .get_mut(..std::mem::size_of::<V>())
            .expect("value should be in bounds");

        (bytemuck::from_bytes(key), bytemuck::from_bytes_mut(value))
    }

    #[must_use]
    pub fn entry<'a>(&self, bytes: &'a [u8], slot: usize) -> (&'a K, &'a V) {
        self.decode_entry(
            bytes
                .get(self.entry_range(slot))
                .expect("entry should be in bounds"),
        )
    }

    pub fn entry_mut<'a>(&self, bytes: &'a mut [u8], slot: usize) -> (&'a K, &'a mut V) {
        self.decode_entry_mut(
            bytes
                .get_mut(self.entry_range(slot))
                .expect("entry should be in bounds"),
        )
    }

    #[must_use]
    pub fn key<'a>(&self, bytes: &'a [u8], slot: usize) -> &'a K {
        self.entry(bytes, slot).0
    }

    /// Returns `true` if the slot holds an entry.
    ///
    /// `bytes` only has to cover the group region.
    #[must_use]
    pub fn is_occupied(&self, bytes: &[u8], slot: usize) -> bool {
        self.group(bytes, slot / N).tag(slot % N) > MARKER_SENTINEL
    }

    /// Writes key and value into a slot, leaving padding bytes untouched.
    pub fn write(&self, bytes: &mut [u8], slot: usize, key: K, value: V) {
        let entry = bytes
            .get_mut(self.entry_range(slot))
            .expect("entry should be in bounds");

        let (key_bytes, value_bytes) = entry.split_at_mut(self.entry.value_offset);

        *bytemuck::from_bytes_mut::<K>(
            key_bytes
                .get_mut(Self::key_range())
                .expect("key should be in bounds"),
        ) = key;

        *bytemuck::from_bytes_mut::<V>(
            value_bytes
                .get_mut(..std::mem::size_of::<V>())
                .expect("value should be in bounds"),
        ) = value;
    }

    /// Smallest geometry (at least two groups) holding `items` elements.
    #[must_use]
    pub fn geometry_for_items(items: usize, max_load_factor: f32) -> Geometry {
        let mut group_count = Geometry::MIN_GROUP_COUNT;

        while max_load_for(Self::capacity_for(group_count - 1), max_load_factor) < items {
            group_count = group_count
                .checked_mul(2)
                .expect("item count should be addressable");
        }

        #[expect(clippy::expect_used, reason = "group count is a power of two")]
        Geometry::with_group_count(group_count).expect("should be a power of two")
    }

    /// Largest geometry (at least two groups) whose buffer fits into `len` bytes.
    #[must_use]
    pub fn geometry_for_buffer_len(len: usize) -> Option<Geometry> {
        let mut best = None;
        let mut group_count = Geometry::MIN_GROUP_COUNT;

        while Self::checked_mmap_buffer_size(group_count - 1).is_some_and(|size| size <= len) {
            best = Some(group_count);

            match group_count.checked_mul(2) {
                Some(next) if next <= len => group_count = next,
                _ => break,
            }
        }

        best.and_then(|count| Geometry::with_group_count(count).ok())
    }
}
