// Copyright (c) 2026-present, mmap-flat-map contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::raw_table::{Iter, IterMut};
use bytemuck::Pod;
use std::iter::FusedIterator;

macro_rules! projection {
    ($(#[$meta:meta])* $name:ident, $inner:ident, $item:ty, |$k:ident, $v:ident| $project:expr) => {
        $(#[$meta])*
        pub struct $name<'a, K, V, const N: usize>(pub(crate) $inner<'a, K, V, N>);

        impl<'a, K: Pod, V: Pod, const N: usize> Iterator for $name<'a, K, V, N> {
            type Item = $item;

            fn next(&mut self) -> Option<Self::Item> {
                self.0.next().map(|($k, $v)| $project)
            }

            fn size_hint(&self) -> (usize, Option<usize>) {
                self.0.size_hint()
            }
        }

        impl<K: Pod, V: Pod, const N: usize> ExactSizeIterator for $name<'_, K, V, N> {}

        impl<K: Pod, V: Pod, const N: usize> FusedIterator for $name<'_, K, V, N> {}
    };
}

projection!(
    /// Iterator over the keys of a map
    Keys,
    Iter,
    &'a K,
    |k, _v| k
);

projection!(
    /// Iterator over the values of a map
    Values,
    Iter,
    &'a V,
    |_k, v| v
);

projection!(
    /// Iterator over mutable references to the values of a map
    ValuesMut,
    IterMut,
    &'a mut V,
    |_k, v| v
);

impl<K, V, const N: usize> Clone for Keys<'_, K, V, N> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<K, V, const N: usize> Clone for Values<'_, K, V, N> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}
