// Copyright (c) 2026-present, mmap-flat-map contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Group metadata
//!
//! ## Format
//!
//! \[tag 0\] ... \[tag N-1\] \[overflow\]
//!
//! A tag is `0` for an empty slot, `1` for the sentinel and a reduced hash
//! (`2..=255`) for an occupied slot. Bit `hash % 8` of the overflow byte is
//! set whenever an insertion had to move past this group because it was
//! full, so lookups for that hash have to keep probing.

use crate::hash::overflow_bit;

/// Default slots per group (16 bytes of metadata)
pub const GROUP_WIDTH: usize = 15;

pub const MARKER_EMPTY: u8 = 0;
pub const MARKER_SENTINEL: u8 = 1;

/// Set of slot positions within a group
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct BitMask(u16);

impl BitMask {
    /// Returns `true` if no slot is set.
    #[must_use]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns the lowest slot position.
    #[must_use]
    pub fn lowest(self) -> Option<usize> {
        if self.0 == 0 {
            None
        } else {
            Some(self.0.trailing_zeros() as usize)
        }
    }
}

impl Iterator for BitMask {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        let pos = self.lowest()?;
        self.0 &= self.0 - 1;
        Some(pos)
    }
}

/// Read-only view of one group's metadata
#[derive(Copy, Clone)]
pub struct Group<'a, const N: usize>(&'a [u8]);

impl<'a, const N: usize> Group<'a, N> {
    /// Size of a group's metadata block in bytes.
    pub const SIZE: usize = N + 1;

    pub(crate) const VALID_WIDTH: () = assert!(
        N >= 2 && N <= 15,
        "group width must be within 2..=15"
    );

    /// Wraps exactly [`Group::SIZE`] bytes.
    #[must_use]
    pub fn new(bytes: &'a [u8]) -> Self {
        debug_assert_eq!(Self::SIZE, bytes.len(), "group view has wrong size");
        Self(bytes)
    }

    fn tags(&self) -> &'a [u8] {
        self.0.get(..N).expect("group should have N tags")
    }

    /// Returns the metadata byte of a slot.
    #[must_use]
    pub fn tag(&self, slot: usize) -> u8 {
        *self.tags().get(slot).expect("slot should be within group")
    }

    fn overflow(&self) -> u8 {
        *self.0.get(N).expect("group should have overflow byte")
    }

    fn match_by(&self, pred: impl Fn(u8) -> bool) -> BitMask {
        let mut mask = 0u16;

        for (idx, &tag) in self.tags().iter().enumerate() {
            if pred(tag) {
                mask |= 1 << idx;
            }
        }

        BitMask(mask)
    }

    /// Returns `true` if the last slot holds the sentinel.
    #[must_use]
    pub fn is_sentinel(&self) -> bool {
        self.tag(N - 1) == MARKER_SENTINEL
    }

    /// Occupied slots whose tag equals `tag`.
    #[must_use]
    pub fn match_tag(&self, tag: u8) -> BitMask {
        debug_assert!(tag > MARKER_SENTINEL, "probe tag is reserved");
        self.match_by(|x| x == tag)
    }

    /// Slots available for insertion.
    #[must_use]
    pub fn match_empty(&self) -> BitMask {
        self.match_by(|x| x == MARKER_EMPTY)
    }

    /// Slots holding an entry.
    #[must_use]
    pub fn match_occupied(&self) -> BitMask {
        self.match_by(|x| x > MARKER_SENTINEL)
    }

    /// Returns `true` if some insertion of this hash probed past the group.
    #[must_use]
    pub fn is_overflowed(&self, hash: u64) -> bool {
        self.overflow() & overflow_bit(hash) != 0
    }

    /// Returns `true` if any overflow bit is set.
    #[must_use]
    pub fn has_overflow(&self) -> bool {
        self.overflow() != 0
    }
}

/// Mutable view of one group's metadata
pub struct GroupMut<'a, const N: usize>(&'a mut [u8]);

impl<'a, const N: usize> GroupMut<'a, N> {
    /// Wraps exactly [`Group::SIZE`] bytes.
    #[must_use]
    pub fn new(bytes: &'a mut [u8]) -> Self {
        debug_assert_eq!(Group::<N>::SIZE, bytes.len(), "group view has wrong size");
        Self(bytes)
    }

    #[must_use]
    pub fn as_group(&self) -> Group<'_, N> {
        Group(&*self.0)
    }

    fn byte_mut(&mut self, idx: usize) -> &mut u8 {
        self.0.get_mut(idx).expect("should be within group")
    }

    /// Marks a slot as occupied by an entry with the given tag.
    pub fn set(&mut self, slot: usize, tag: u8) {
        debug_assert!(slot < N);
        debug_assert!(tag > MARKER_SENTINEL, "tag is reserved");
        *self.byte_mut(slot) = tag;
    }

    /// Marks a slot as empty.
    pub fn reset(&mut self, slot: usize) {
        debug_assert!(slot < N);
        *self.byte_mut(slot) = MARKER_EMPTY;
    }

    /// Writes the sentinel into the last slot, leaving other slots alone.
    pub fn set_sentinel(&mut self) {
        *self.byte_mut(N - 1) = MARKER_SENTINEL;
    }

    pub fn mark_overflow(&mut self, hash: u64) {
        *self.byte_mut(N) |= overflow_bit(hash);
    }
}
