// Copyright (c) 2026-present, mmap-flat-map contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use std::io::{Read, Write};

/// Trait to serialize stuff
pub trait Encode {
    /// Serializes into writer.
    ///
    /// # Errors
    ///
    /// Will return `Err` if an IO error occurs.
    fn encode_into<W: Write>(&self, writer: &mut W) -> crate::Result<()>;

    /// Serializes into vector.
    fn encode_into_vec(&self) -> Vec<u8> {
        let mut v = vec![];

        #[expect(clippy::expect_used, reason = "writing into a Vec cannot fail")]
        self.encode_into(&mut v).expect("cannot fail");

        v
    }
}

/// Trait to deserialize stuff
pub trait Decode {
    /// Deserializes from reader.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the data is truncated or invalid.
    fn decode_from<R: Read>(reader: &mut R) -> crate::Result<Self>
    where
        Self: Sized;
}
