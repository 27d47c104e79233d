// Copyright (c) 2026-present, mmap-flat-map contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

/// An 128-bit checksum
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Checksum(u128);

impl std::fmt::Display for Checksum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

impl Checksum {
    /// Wraps a checksum value.
    #[must_use]
    pub fn from_raw(value: u128) -> Self {
        Self(value)
    }

    /// Checksums a byte slice.
    #[must_use]
    pub fn of(bytes: &[u8]) -> Self {
        Self(xxhash_rust::xxh3::xxh3_128(bytes))
    }

    /// Returns the raw 128-bit integer.
    #[must_use]
    pub fn into_u128(self) -> u128 {
        self.0
    }

    pub(crate) fn check(&self, expected: Self) -> crate::Result<()> {
        if self.0 == expected.0 {
            Ok(())
        } else {
            Err(crate::Error::ChecksumMismatch {
                expected,
                got: *self,
            })
        }
    }
}

pub struct ChecksummedWriter<W: std::io::Write> {
    inner: W,
    hasher: xxhash_rust::xxh3::Xxh3Default,
}

impl<W: std::io::Write> ChecksummedWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            inner: writer,
            hasher: xxhash_rust::xxh3::Xxh3Default::new(),
        }
    }

    pub fn checksum(&self) -> Checksum {
        Checksum::from_raw(self.hasher.digest128())
    }
}

impl<W: std::io::Write> std::io::Write for ChecksummedWriter<W> {
    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }

    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let n = self.inner.write(buf)?;

        #[expect(clippy::indexing_slicing, reason = "n <= buf.len()")]
        self.hasher.update(&buf[..n]);

        Ok(n)
    }
}

pub struct ChecksummedReader<R: std::io::Read> {
    inner: R,
    hasher: xxhash_rust::xxh3::Xxh3Default,
}

impl<R: std::io::Read> ChecksummedReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            inner: reader,
            hasher: xxhash_rust::xxh3::Xxh3Default::new(),
        }
    }

    pub fn checksum(&self) -> Checksum {
        Checksum::from_raw(self.hasher.digest128())
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: std::io::Read> std::io::Read for ChecksummedReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;

        #[expect(clippy::indexing_slicing, reason = "n <= buf.len()")]
        self.hasher.update(&buf[..n]);

        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use test_log::test;

    #[test]
    fn checksum_writer_matches_one_shot() -> std::io::Result<()> {
        let mut sink = vec![];

        let mut writer = ChecksummedWriter::new(&mut sink);
        writer.write_all(b"abc")?;
        writer.write_all(b"def")?;
        let checksum = writer.checksum();

        assert_eq!(Checksum::of(b"abcdef"), checksum);
        assert_eq!(b"abcdef", &*sink);

        Ok(())
    }

    #[test]
    fn checksum_reader_matches_writer() -> std::io::Result<()> {
        let data = b"hello world";

        let mut reader = ChecksummedReader::new(&data[..]);
        let mut out = vec![];
        reader.read_to_end(&mut out)?;

        assert_eq!(Checksum::of(data), reader.checksum());

        Ok(())
    }

    #[test]
    fn checksum_check() {
        let a = Checksum::from_raw(5);
        assert!(a.check(Checksum::from_raw(5)).is_ok());
        assert!(matches!(
            a.check(Checksum::from_raw(6)),
            Err(crate::Error::ChecksumMismatch { .. })
        ));
    }
}
