mod common;

use common::aligned;
use mmap_flat_map::{DefaultHashBuilder, Geometry, MmapFlatMap};
use std::panic::{catch_unwind, AssertUnwindSafe};
use test_log::test;

type Map<'a> = MmapFlatMap<u64, u8, &'a mut [u8], DefaultHashBuilder, 4>;

#[test]
fn map_single_narrow_group() -> mmap_flat_map::Result<()> {
    let geometry = Geometry::with_group_count(1)?;
    assert_eq!(0, geometry.groups_size_mask());

    let mut buf = aligned(Map::required_buffer_size(0));
    let mut map = Map::create(bytemuck::cast_slice_mut(&mut buf), geometry, DefaultHashBuilder)?;

    assert_eq!(3, map.capacity());
    assert_eq!(3, map.max_load());

    assert!(map.insert(1, b'a').1);
    assert!(map.insert(2, b'b').1);
    assert!(map.insert(3, b'c').1);

    assert_eq!(Some(&b'b'), map.get(&2));
    assert_eq!(3, map.len());
    assert!(!map.can_insert());

    let result = catch_unwind(AssertUnwindSafe(|| {
        map.insert(4, b'd');
    }));
    assert!(result.is_err());

    // NOTE: The failed insertion left the table untouched
    assert_eq!(3, map.len());
    assert!(!map.contains_key(&4));

    assert_eq!(1, map.erase(&2));
    assert_eq!(None, map.get(&2));
    assert_eq!(2, map.len());

    assert!(map.insert(4, b'd').1);
    assert_eq!(Some(&b'd'), map.get(&4));
    assert_eq!(Some(&b'a'), map.get(&1));
    assert_eq!(Some(&b'c'), map.get(&3));
    assert_eq!(3, map.len());

    Ok(())
}

#[test]
#[should_panic(expected = "table is full")]
fn map_single_narrow_group_full() {
    let geometry = Geometry::with_group_count(1).expect("should be valid");

    let mut buf = aligned(Map::required_buffer_size(0));
    let mut map = Map::create(bytemuck::cast_slice_mut(&mut buf), geometry, DefaultHashBuilder)
        .expect("should create");

    map.extend([(1, b'a'), (2, b'b'), (3, b'c')]);
    map.insert(4, b'd');
}
