// Copyright (c) 2026-present, mmap-flat-map contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use std::hash::{BuildHasher, Hash};

/// Deterministic xxh3 hasher factory (seed 0)
///
/// The hash of a key decides where it is stored in the buffer, so a table
/// can only be re-attached with a hasher producing the same values as the
/// one that built it. Randomly seeded hashers (like `std`'s `RandomState`)
/// must not be used for persisted tables.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct DefaultHashBuilder;

impl BuildHasher for DefaultHashBuilder {
    type Hasher = xxhash_rust::xxh3::Xxh3;

    fn build_hasher(&self) -> Self::Hasher {
        xxhash_rust::xxh3::Xxh3::new()
    }
}

pub fn make_hash<Q: Hash + ?Sized, S: BuildHasher>(hash_builder: &S, key: &Q) -> u64 {
    hash_builder.hash_one(key)
}

/// Reduces a hash to a metadata tag in `2..=255`.
///
/// 0 and 1 are reserved for empty and sentinel slots.
#[must_use]
pub fn reduced_tag(hash: u64) -> u8 {
    #[expect(clippy::cast_possible_truncation, reason = "we only want the low byte")]
    let tag = hash as u8;

    if tag < 2 {
        tag + 8
    } else {
        tag
    }
}

/// Overflow bit of a hash within a group's overflow byte.
#[must_use]
pub fn overflow_bit(hash: u64) -> u8 {
    1 << (hash % 8)
}
