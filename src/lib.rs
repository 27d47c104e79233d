// Copyright (c) 2026-present, mmap-flat-map contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! A fixed-capacity open-addressing hash map that lives entirely inside a
//! caller-provided buffer.
//!
//! ##### About
//!
//! This crate exports a [`MmapFlatMap`] that supports a subset of the
//! `HashMap` API, on top of a slot-level [`RawTable`].
//!
//! The whole table (group metadata and entries) is a flat byte layout
//! inside a buffer the caller owns, usually a memory-mapped file. The
//! buffer can be handed to another process (or the same process after a
//! restart) and attached again without rebuilding anything, as long as the
//! geometry, the size control (`len`, `max_load`), the key/value types, the
//! group width and the hasher are the same. A [`Header`] can record all of
//! that (plus a checksum of the contents) next to the buffer.
//!
//! Entries are grouped into groups of 15 slots (by default). Every group
//! has one metadata byte per slot holding a reduced hash of the key (or an
//! empty marker), plus one overflow byte that records that insertions moved
//! past the group. Lookups probe groups quadratically and stop at the
//! first group that never overflowed for the hash in question.
//!
//! The table never grows: its capacity is fixed by the buffer's geometry,
//! and inserting a new key into a full table panics.
//!
//! Keys and values are plain-old-data ([`bytemuck::Pod`]) and are stored in
//! native byte order, so buffers are only portable between machines of the
//! same architecture.
//!
//! The crate contains no `unsafe` code. All buffer accesses are bounds
//! checked; alignment is validated once when binding to a buffer.

#![forbid(unsafe_code)]
#![deny(clippy::all, missing_docs)]
#![warn(clippy::cargo)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::indexing_slicing)]
#![warn(clippy::pedantic, clippy::nursery)]
#![warn(clippy::expect_used)]
#![allow(clippy::missing_const_for_fn)]
#![warn(clippy::multiple_crate_versions)]
#![allow(clippy::option_if_let_else)]
#![warn(clippy::redundant_feature_names)]
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

#[doc(hidden)]
pub mod arrays;

#[doc(hidden)]
pub mod checksum;

#[doc(hidden)]
pub mod coding;

/// Configuration
pub mod config;

mod error;

#[doc(hidden)]
pub mod geometry;

#[doc(hidden)]
pub mod group;

mod hash;
mod header;
mod map;
mod raw_table;

pub use {
    checksum::Checksum,
    coding::{Decode, Encode},
    config::{Options, DEFAULT_MAX_LOAD_FACTOR},
    error::{Error, Result},
    geometry::Geometry,
    group::GROUP_WIDTH,
    hash::DefaultHashBuilder,
    header::{Header, FORMAT_VERSION, MAGIC_BYTES},
    map::{Keys, MmapFlatMap, Values, ValuesMut},
    raw_table::{Iter, IterMut, RawTable, Stats},
};
