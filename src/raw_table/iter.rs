// Copyright (c) 2026-present, mmap-flat-map contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::arrays::Arrays;
use bytemuck::Pod;
use std::{
    iter::{Enumerate, FusedIterator},
    slice::{ChunksExact, ChunksExactMut},
};

/// Iterator over the elements of a table, in buffer order
pub struct Iter<'a, K, V, const N: usize> {
    arrays: Arrays<K, V, N>,
    groups: &'a [u8],
    entries: Enumerate<ChunksExact<'a, u8>>,
    remaining: usize,
}

impl<'a, K: Pod, V: Pod, const N: usize> Iter<'a, K, V, N> {
    pub(crate) fn new(arrays: Arrays<K, V, N>, bytes: &'a [u8], len: usize) -> Self {
        let (groups, entries) = arrays.split(bytes);

        Self {
            arrays,
            groups,
            entries: entries.chunks_exact(arrays.entry_layout().size).enumerate(),
            remaining: len,
        }
    }
}

impl<K, V, const N: usize> Clone for Iter<'_, K, V, N> {
    fn clone(&self) -> Self {
        Self {
            arrays: self.arrays,
            groups: self.groups,
            entries: self.entries.clone(),
            remaining: self.remaining,
        }
    }
}

impl<'a, K: Pod, V: Pod, const N: usize> Iterator for Iter<'a, K, V, N> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        for (slot, entry) in self.entries.by_ref() {
            if self.arrays.is_occupied(self.groups, slot) {
                self.remaining -= 1;
                return Some(self.arrays.decode_entry(entry));
            }
        }

        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K: Pod, V: Pod, const N: usize> ExactSizeIterator for Iter<'_, K, V, N> {}

impl<K: Pod, V: Pod, const N: usize> FusedIterator for Iter<'_, K, V, N> {}

/// Iterator over the elements of a table with mutable values, in buffer order
pub struct IterMut<'a, K, V, const N: usize> {
    arrays: Arrays<K, V, N>,
    groups: &'a [u8],
    entries: Enumerate<ChunksExactMut<'a, u8>>,
    remaining: usize,
}

impl<'a, K: Pod, V: Pod, const N: usize> IterMut<'a, K, V, N> {
    pub(crate) fn new(arrays: Arrays<K, V, N>, bytes: &'a mut [u8], len: usize) -> Self {
        let (groups, entries) = arrays.split_mut(bytes);

        Self {
            arrays,
            groups,
            entries: entries
                .chunks_exact_mut(arrays.entry_layout().size)
                .enumerate(),
            remaining: len,
        }
    }
}

impl<'a, K: Pod, V: Pod, const N: usize> Iterator for IterMut<'a, K, V, N> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        for (slot, entry) in self.entries.by_ref() {
            if self.arrays.is_occupied(self.groups, slot) {
                self.remaining -= 1;
                return Some(self.arrays.decode_entry_mut(entry));
            }
        }

        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K: Pod, V: Pod, const N: usize> ExactSizeIterator for IterMut<'_, K, V, N> {}

impl<K: Pod, V: Pod, const N: usize> FusedIterator for IterMut<'_, K, V, N> {}
