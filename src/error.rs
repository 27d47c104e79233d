// Copyright (c) 2026-present, mmap-flat-map contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::Checksum;

/// Represents errors that can occur when binding or describing a table buffer
#[derive(Debug)]
pub enum Error {
    /// I/O error
    Io(std::io::Error),

    /// The buffer is shorter than the table layout requires
    BufferTooSmall {
        /// Bytes needed by the layout
        required: usize,

        /// Bytes actually supplied
        actual: usize,
    },

    /// The buffer start is not aligned for the entry type
    MisalignedBuffer {
        /// Required alignment in bytes
        align: usize,
    },

    /// The group count (mask + 1) is not a power of two, or the buffer
    /// layout it describes does not fit into `usize`
    InvalidGeometry {
        /// Supplied groups size mask
        groups_size_mask: usize,
    },

    /// Supplied size control violates `size <= max_load <= capacity`
    InvalidSizeControl {
        /// Element count
        size: usize,

        /// Maximum element count
        max_load: usize,

        /// Slot capacity of the geometry
        capacity: usize,
    },

    /// Key is not in the map
    KeyNotFound,

    /// Invalid or unparseable header
    InvalidHeader(&'static str),

    /// Unsupported header format version
    InvalidVersion(u8),

    /// Header describes a different table shape than requested
    HeaderMismatch(&'static str),

    /// Invalid checksum value
    ChecksumMismatch {
        /// Checksum of the data that was read
        got: Checksum,

        /// Checksum that was stored
        expected: Checksum,
    },
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FlatMapError: {self:?}")
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

/// Map result
pub type Result<T> = std::result::Result<T, Error>;
