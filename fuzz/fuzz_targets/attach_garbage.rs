#![no_main]
use libfuzzer_sys::fuzz_target;
use mmap_flat_map::{DefaultHashBuilder, MmapFlatMap};

type Map<'a> = MmapFlatMap<u32, u32, &'a [u8]>;

// Reading a buffer that was never written by a table must terminate without panicking
fuzz_target!(|data: &[u8]| {
    let Some(geometry) = Map::geometry_for_buffer_len(data.len()) else {
        return;
    };

    let mut buf = vec![0u32; data.len().div_ceil(4)];
    bytemuck::cast_slice_mut::<u32, u8>(&mut buf)[..data.len()].copy_from_slice(data);

    let bytes: &[u8] = bytemuck::cast_slice(&buf);
    let required = Map::required_buffer_size(geometry.groups_size_mask());
    assert!(bytes.len() >= required);

    // NOTE: Claim a full table so lookups actually probe
    let map = Map::attach(bytes, geometry, 0, 0, DefaultHashBuilder).unwrap();
    let full = Map::attach(bytes, geometry, map.capacity(), map.capacity(), DefaultHashBuilder).unwrap();

    for key in 0..64 {
        let _ = full.get(&key);
    }

    assert!(full.iter().count() <= full.capacity());
    let _ = full.stats();
});
