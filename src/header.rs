// Copyright (c) 2026-present, mmap-flat-map contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{
    arrays::{buffer_size_of, EntryLayout},
    checksum::{ChecksummedReader, ChecksummedWriter},
    coding::{Decode, Encode},
    Checksum, Geometry, MmapFlatMap,
};
use byteorder::{ReadBytesExt, WriteBytesExt};
use bytemuck::Pod;
use std::{
    alloc::Layout,
    hash::{BuildHasher, Hash},
    io::{Read, Write},
};

/// Magic bytes of a serialized [`Header`]
pub const MAGIC_BYTES: [u8; 4] = [b'F', b'M', b'M', 1];

/// Current header format version
pub const FORMAT_VERSION: u8 = 1;

/// Self-description of a table buffer
///
/// The table layout itself carries no metadata. A `Header` records
/// everything needed to re-attach (geometry, size control, the shape of the
/// key/value types) plus a checksum of the buffer contents, so it can be
/// stored next to the buffer, e.g. in front of it in the same file.
///
/// The hasher is not recorded: attaching with a different hasher than the
/// one that built the table makes lookups miss.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Header {
    /// Slots per group
    pub slots_per_group: u8,

    /// Size of the key type in bytes
    pub key_size: u32,

    /// Alignment of the key type
    pub key_align: u32,

    /// Size of the value type in bytes
    pub value_size: u32,

    /// Alignment of the value type
    pub value_align: u32,

    /// Geometry of the table
    pub geometry: Geometry,

    /// Element count
    pub size: usize,

    /// Maximum element count
    pub max_load: usize,

    /// Checksum of the table's buffer bytes
    pub checksum: Checksum,
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "Pod types larger than 4 GiB are not supported"
)]
fn shape_of<T>() -> (u32, u32) {
    (
        std::mem::size_of::<T>() as u32,
        std::mem::align_of::<T>() as u32,
    )
}

fn layout_of(size: u32, align: u32, what: &'static str) -> crate::Result<Layout> {
    Layout::from_size_align(size as usize, align as usize).map_err(|_| crate::Error::InvalidHeader(what))
}

impl Header {
    /// Size of a serialized header in bytes.
    #[must_use]
    pub const fn serialized_len() -> usize {
        MAGIC_BYTES.len()
            // Format version
            + std::mem::size_of::<u8>()
            // Slots per group
            + std::mem::size_of::<u8>()
            // Key & value shapes
            + 4 * std::mem::size_of::<u32>()
            // Groups size index & mask
            + 2 * std::mem::size_of::<u64>()
            // Size & max load
            + 2 * std::mem::size_of::<u64>()
            // Content checksum
            + std::mem::size_of::<u128>()
            // Header checksum
            + std::mem::size_of::<u32>()
    }

    /// Takes a snapshot of a map's self-description.
    #[must_use]
    pub fn capture<K, V, B, S, const N: usize>(map: &MmapFlatMap<K, V, B, S, N>) -> Self
    where
        K: Pod + Hash + Eq,
        V: Pod,
        B: AsRef<[u8]>,
        S: BuildHasher,
    {
        let (key_size, key_align) = shape_of::<K>();
        let (value_size, value_align) = shape_of::<V>();

        #[expect(clippy::cast_possible_truncation, reason = "group width is at most 15")]
        let slots_per_group = N as u8;

        let header = Self {
            slots_per_group,
            key_size,
            key_align,
            value_size,
            value_align,
            geometry: map.geometry(),
            size: map.len(),
            max_load: map.max_load(),
            checksum: map.checksum(),
        };

        log::debug!("Captured table header: {header:?}");

        header
    }

    /// Returns the number of buffer bytes the described table covers.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the recorded key/value shapes are invalid, or the
    /// described layout does not fit into `usize`.
    pub fn buffer_len(&self) -> crate::Result<usize> {
        let entry = EntryLayout::from_layouts(
            layout_of(self.key_size, self.key_align, "key layout")?,
            layout_of(self.value_size, self.value_align, "value layout")?,
        )
        .ok_or(crate::Error::InvalidHeader("entry layout"))?;

        buffer_size_of(
            usize::from(self.slots_per_group),
            self.geometry.groups_size_mask(),
            entry,
        )
        .ok_or(crate::Error::InvalidHeader("buffer length"))
    }

    /// Checks that the buffer is large enough and its contents match the
    /// recorded checksum.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the buffer is too small or was modified.
    pub fn verify(&self, buffer: &[u8]) -> crate::Result<()> {
        let required = self.buffer_len()?;

        let bytes = buffer.get(..required).ok_or(crate::Error::BufferTooSmall {
            required,
            actual: buffer.len(),
        })?;

        Checksum::of(bytes).check(self.checksum)
    }

    fn check_shape<K, V, const N: usize>(&self) -> crate::Result<()> {
        if usize::from(self.slots_per_group) != N {
            return Err(crate::Error::HeaderMismatch("slots per group"));
        }

        if (self.key_size, self.key_align) != shape_of::<K>() {
            return Err(crate::Error::HeaderMismatch("key type"));
        }

        if (self.value_size, self.value_align) != shape_of::<V>() {
            return Err(crate::Error::HeaderMismatch("value type"));
        }

        Ok(())
    }

    /// Verifies the buffer against the header, then attaches a map to it.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the requested types do not match the recorded
    /// shape, the buffer contents do not match the checksum, or attaching
    /// fails.
    pub fn attach<K, V, B, S, const N: usize>(
        &self,
        buffer: B,
        hash_builder: S,
    ) -> crate::Result<MmapFlatMap<K, V, B, S, N>>
    where
        K: Pod + Hash + Eq,
        V: Pod,
        B: AsRef<[u8]>,
        S: BuildHasher,
    {
        self.check_shape::<K, V, N>()?;
        self.verify(buffer.as_ref())?;

        log::debug!(
            "Attaching table {:?} with {}/{} elements",
            self.geometry,
            self.size,
            self.max_load,
        );

        MmapFlatMap::attach(buffer, self.geometry, self.size, self.max_load, hash_builder)
    }
}

impl Encode for Header {
    fn encode_into<W: Write>(&self, mut writer: &mut W) -> crate::Result<()> {
        use byteorder::LE;

        let checksum = {
            let mut writer = ChecksummedWriter::new(&mut writer);

            writer.write_all(&MAGIC_BYTES)?;
            writer.write_u8(FORMAT_VERSION)?;
            writer.write_u8(self.slots_per_group)?;

            writer.write_u32::<LE>(self.key_size)?;
            writer.write_u32::<LE>(self.key_align)?;
            writer.write_u32::<LE>(self.value_size)?;
            writer.write_u32::<LE>(self.value_align)?;

            writer.write_u64::<LE>(self.geometry.groups_size_index() as u64)?;
            writer.write_u64::<LE>(self.geometry.groups_size_mask() as u64)?;

            writer.write_u64::<LE>(self.size as u64)?;
            writer.write_u64::<LE>(self.max_load as u64)?;

            writer.write_u128::<LE>(self.checksum.into_u128())?;

            writer.checksum()
        };

        #[expect(
            clippy::cast_possible_truncation,
            reason = "we purposefully only use the lower 4 bytes as checksum"
        )]
        writer.write_u32::<LE>(checksum.into_u128() as u32)?;

        Ok(())
    }
}

fn read_usize<R: Read>(reader: &mut R, what: &'static str) -> crate::Result<usize> {
    let value = reader.read_u64::<byteorder::LE>()?;
    usize::try_from(value).map_err(|_| crate::Error::InvalidHeader(what))
}

impl Decode for Header {
    fn decode_from<R: Read>(reader: &mut R) -> crate::Result<Self> {
        use byteorder::LE;

        let mut protected_reader = ChecksummedReader::new(reader);

        let mut magic = [0u8; MAGIC_BYTES.len()];
        protected_reader.read_exact(&mut magic)?;

        if magic != MAGIC_BYTES {
            return Err(crate::Error::InvalidHeader("magic"));
        }

        let version = protected_reader.read_u8()?;
        if version != FORMAT_VERSION {
            return Err(crate::Error::InvalidVersion(version));
        }

        let slots_per_group = protected_reader.read_u8()?;

        let key_size = protected_reader.read_u32::<LE>()?;
        let key_align = protected_reader.read_u32::<LE>()?;
        let value_size = protected_reader.read_u32::<LE>()?;
        let value_align = protected_reader.read_u32::<LE>()?;

        let groups_size_index = read_usize(&mut protected_reader, "groups size index")?;
        let groups_size_mask = read_usize(&mut protected_reader, "groups size mask")?;

        let size = read_usize(&mut protected_reader, "size")?;
        let max_load = read_usize(&mut protected_reader, "max load")?;

        let checksum = protected_reader.read_u128::<LE>()?;

        #[expect(
            clippy::cast_possible_truncation,
            reason = "we purposefully only use the lower 4 bytes as checksum"
        )]
        let got_checksum = protected_reader.checksum().into_u128() as u32;
        let got_checksum = Checksum::from_raw(u128::from(got_checksum));

        let reader = protected_reader.into_inner();

        let header_checksum: u128 = reader.read_u32::<LE>()?.into();
        let header_checksum = Checksum::from_raw(header_checksum);

        if header_checksum != got_checksum {
            return Err(crate::Error::ChecksumMismatch {
                got: got_checksum,
                expected: header_checksum,
            });
        }

        if !(2..=15).contains(&slots_per_group) {
            return Err(crate::Error::InvalidHeader("slots per group"));
        }

        if key_size == 0 {
            return Err(crate::Error::InvalidHeader("key layout"));
        }

        Ok(Self {
            slots_per_group,
            key_size,
            key_align,
            value_size,
            value_align,
            geometry: Geometry::new(groups_size_index, groups_size_mask)?,
            size,
            max_load,
            checksum: Checksum::from_raw(checksum),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DefaultHashBuilder;
    use test_log::test;

    type Map<'a> = MmapFlatMap<u64, [u8; 12], &'a mut [u8]>;

    fn build(buf: &mut Vec<u64>) -> crate::Result<Header> {
        let geometry = Map::geometry_for_items(20);
        buf.resize(Map::required_buffer_size(geometry.groups_size_mask()).div_ceil(8), 0);

        let mut map = Map::create(bytemuck::cast_slice_mut(buf), geometry, DefaultHashBuilder)?;
        for key in 0..20 {
            map.insert(key, [key as u8; 12]);
        }

        Ok(Header::capture(&map))
    }

    #[test]
    fn header_serde_roundtrip() -> crate::Result<()> {
        let mut buf = vec![];
        let header = build(&mut buf)?;

        assert_eq!(15, header.slots_per_group);
        assert_eq!((8, 8, 12, 1), (header.key_size, header.key_align, header.value_size, header.value_align));
        assert_eq!(20, header.size);

        let bytes = header.encode_into_vec();

        assert_eq!(bytes.len(), Header::serialized_len());
        assert_eq!(header, Header::decode_from(&mut &bytes[..])?);

        Ok(())
    }

    #[test]
    #[expect(clippy::indexing_slicing)]
    fn header_detect_corruption() -> crate::Result<()> {
        let mut buf = vec![];
        let header = build(&mut buf)?;

        let mut bytes = header.encode_into_vec();
        bytes[40] ^= 0x01;

        assert!(matches!(
            Header::decode_from(&mut &bytes[..]),
            Err(crate::Error::ChecksumMismatch { .. })
        ));

        Ok(())
    }

    #[test]
    #[expect(clippy::indexing_slicing)]
    fn header_reject_magic_and_version() -> crate::Result<()> {
        let mut buf = vec![];
        let header = build(&mut buf)?;

        let mut bytes = header.encode_into_vec();
        bytes[0] = b'X';
        assert!(matches!(
            Header::decode_from(&mut &bytes[..]),
            Err(crate::Error::InvalidHeader("magic"))
        ));

        let mut bytes = header.encode_into_vec();
        bytes[4] = 2;
        assert!(matches!(
            Header::decode_from(&mut &bytes[..]),
            Err(crate::Error::InvalidVersion(2))
        ));

        let bytes = header.encode_into_vec();
        assert!(matches!(
            Header::decode_from(&mut &bytes[..10]),
            Err(crate::Error::Io(_))
        ));

        Ok(())
    }

    #[test]
    fn header_buffer_len_matches_layout() -> crate::Result<()> {
        let mut buf = vec![];
        let header = build(&mut buf)?;

        assert_eq!(
            Map::required_buffer_size(header.geometry.groups_size_mask()),
            header.buffer_len()?
        );

        Ok(())
    }

    #[test]
    fn header_attach() -> crate::Result<()> {
        let mut buf = vec![];
        let header = build(&mut buf)?;

        let map: MmapFlatMap<u64, [u8; 12], &[u8]> =
            header.attach(bytemuck::cast_slice(&buf), DefaultHashBuilder)?;

        assert_eq!(20, map.len());
        assert_eq!(Some(&[7; 12]), map.get(&7));

        Ok(())
    }

    #[test]
    fn header_attach_rejects_other_shape() -> crate::Result<()> {
        let mut buf = vec![];
        let header = build(&mut buf)?;

        assert!(matches!(
            header.attach::<u64, [u8; 16], &[u8], _, 15>(bytemuck::cast_slice(&buf), DefaultHashBuilder),
            Err(crate::Error::HeaderMismatch("value type"))
        ));

        assert!(matches!(
            header.attach::<u32, [u8; 12], &[u8], _, 15>(bytemuck::cast_slice(&buf), DefaultHashBuilder),
            Err(crate::Error::HeaderMismatch("key type"))
        ));

        assert!(matches!(
            header.attach::<u64, [u8; 12], &[u8], _, 8>(bytemuck::cast_slice(&buf), DefaultHashBuilder),
            Err(crate::Error::HeaderMismatch("slots per group"))
        ));

        Ok(())
    }

    #[test]
    fn header_verify_detects_modified_buffer() -> crate::Result<()> {
        let mut buf = vec![];
        let header = build(&mut buf)?;

        header.verify(bytemuck::cast_slice(&buf))?;

        let required = header.buffer_len()?;

        {
            let bytes: &[u8] = bytemuck::cast_slice(&buf);
            assert!(matches!(
                header.verify(bytes.get(..(required - 1)).expect("should be in bounds")),
                Err(crate::Error::BufferTooSmall { .. })
            ));
        }

        {
            let bytes: &mut [u8] = bytemuck::cast_slice_mut(&mut buf);
            let first = bytes.first_mut().expect("should not be empty");
            *first ^= 0xFF;
        }

        assert!(matches!(
            header.verify(bytemuck::cast_slice(&buf)),
            Err(crate::Error::ChecksumMismatch { .. })
        ));

        Ok(())
    }

    #[test]
    fn header_reject_invalid_shape() -> crate::Result<()> {
        let mut buf = vec![];
        let header = build(&mut buf)?;

        for slots_per_group in [0, 1, 16, 255] {
            let bytes = Header {
                slots_per_group,
                ..header
            }
            .encode_into_vec();

            assert!(matches!(
                Header::decode_from(&mut &bytes[..]),
                Err(crate::Error::InvalidHeader("slots per group"))
            ));
        }

        let bytes = Header {
            key_size: 0,
            key_align: 1,
            ..header
        }
        .encode_into_vec();

        assert!(matches!(
            Header::decode_from(&mut &bytes[..]),
            Err(crate::Error::InvalidHeader("key layout"))
        ));

        let no_slots = Header {
            slots_per_group: 0,
            ..header
        };
        assert!(matches!(
            no_slots.verify(&[0; 64]),
            Err(crate::Error::InvalidHeader("buffer length"))
        ));

        Ok(())
    }

    #[test]
    fn header_reject_oversized_geometry() -> crate::Result<()> {
        let mut buf = vec![];
        let header = build(&mut buf)?;

        let bytes = Header {
            geometry: Geometry::new(2, usize::MAX >> 2)?,
            ..header
        }
        .encode_into_vec();

        let huge = Header::decode_from(&mut &bytes[..])?;

        assert!(matches!(
            huge.buffer_len(),
            Err(crate::Error::InvalidHeader("buffer length"))
        ));

        assert!(matches!(
            huge.verify(bytemuck::cast_slice(&buf)),
            Err(crate::Error::InvalidHeader("buffer length"))
        ));

        assert!(matches!(
            huge.attach::<u64, [u8; 12], &[u8], _, 15>(bytemuck::cast_slice(&buf), DefaultHashBuilder),
            Err(crate::Error::InvalidHeader("buffer length"))
        ));

        Ok(())
    }
}
