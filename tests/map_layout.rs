use mmap_flat_map::{DefaultHashBuilder, Geometry, MmapFlatMap};
use test_log::test;

#[test]
fn map_layout_formulas() -> mmap_flat_map::Result<()> {
    type Map<'a> = MmapFlatMap<u64, u64, &'a mut [u8]>;

    for group_count in [2usize, 4, 64, 1_024] {
        let geometry = Geometry::with_group_count(group_count)?;
        let mask = geometry.groups_size_mask();

        // NOTE: 16 metadata bytes per group, 16 bytes per entry, one sentinel slot
        let capacity = group_count * 15 - 1;
        assert_eq!(group_count * 16 + capacity * 16, Map::required_buffer_size(mask));

        let mut buf = vec![0u64; Map::required_buffer_size(mask) / 8];
        let map = Map::create(bytemuck::cast_slice_mut(&mut buf), geometry, DefaultHashBuilder)?;

        assert_eq!(capacity, map.capacity());
        assert_eq!((capacity * 7).div_ceil(8), map.max_load());
        assert_eq!(64 - group_count.trailing_zeros() as usize, map.groups_size_index());
        assert_eq!(mask, map.groups_size_mask());

        let stats = map.stats();
        assert_eq!(group_count, stats.group_count);
        assert_eq!(0, stats.overflowed_groups);
        assert_eq!(0, stats.len);
    }

    Ok(())
}

#[test]
fn map_layout_narrow_group_padding() {
    type Map<'a> = MmapFlatMap<u32, u16, &'a mut [u8], DefaultHashBuilder, 4>;

    // NOTE: 2 groups of 5 bytes, padded to 12 for 4 byte alignment, then 7 entries of 8 bytes
    assert_eq!(12 + 7 * 8, Map::required_buffer_size(1));
}

#[test]
fn map_layout_create_leaves_entries_alone() -> mmap_flat_map::Result<()> {
    type Map<'a> = MmapFlatMap<u64, u64, &'a mut [u8]>;

    let geometry = Geometry::with_group_count(2)?;
    let len = Map::required_buffer_size(geometry.groups_size_mask());

    let mut buf = vec![u64::MAX; len / 8];

    {
        let map = Map::create(bytemuck::cast_slice_mut(&mut buf), geometry, DefaultHashBuilder)?;
        assert!(map.is_empty());
        assert_eq!(0, map.iter().count());
    }

    let bytes: &[u8] = bytemuck::cast_slice(&buf);
    let (groups, entries) = bytes.split_at(32);

    // NOTE: 0 = empty, 1 = sentinel in the last slot of the last group
    assert!(groups.get(..30).expect("should be in bounds").iter().all(|&b| b == 0));
    assert_eq!(Some(&1), groups.get(30));
    assert_eq!(Some(&0), groups.get(31));
    assert!(entries.iter().all(|&b| b == 0xFF));

    Ok(())
}

#[test]
fn map_layout_geometry_helpers_are_monotonic() {
    type Map<'a> = MmapFlatMap<u64, [u8; 24], &'a mut [u8]>;

    let mut prev = 0;

    for items in [0usize, 1, 26, 27, 100, 1_000, 50_000] {
        let geometry = Map::geometry_for_items(items);
        assert!(geometry.group_count() >= 2);
        assert!(geometry.group_count() >= prev);
        prev = geometry.group_count();

        let len = Map::required_buffer_size(geometry.groups_size_mask());
        assert_eq!(Some(geometry), Map::geometry_for_buffer_len(len));
        assert_eq!(Some(geometry), Map::geometry_for_buffer_len(len + 1));
    }
}
