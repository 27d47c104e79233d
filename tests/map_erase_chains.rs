mod common;

use common::{aligned, Identity};
use mmap_flat_map::{Geometry, MmapFlatMap};
use test_log::test;

type Map<'a> = MmapFlatMap<u64, u64, &'a mut [u8], Identity, 4>;

#[test]
fn map_erase_keeps_overflowed_keys_reachable() -> mmap_flat_map::Result<()> {
    let geometry = Geometry::with_group_count(2)?;
    let mut buf = aligned(Map::required_buffer_size(geometry.groups_size_mask()));
    let mut map = Map::create(bytemuck::cast_slice_mut(&mut buf), geometry, Identity::default())?;

    // NOTE: Identity hashes below 2^63 all start at group 0
    for key in 2..=6 {
        assert!(map.insert(key, key * 100).1);
    }
    assert_eq!(1, map.stats().overflowed_groups);

    assert_eq!(1, map.erase(&4));
    assert!(!map.contains_key(&4));
    assert_eq!(Some(&600), map.get(&6));

    assert!(map.insert(4, 401).1);
    assert_eq!(Some(&401), map.get(&4));
    assert_eq!(5, map.len());

    for key in 2..=6 {
        assert!(map.contains_key(&key));
    }

    Ok(())
}

#[test]
fn map_erase_reinsert_across_spilled_chain() -> mmap_flat_map::Result<()> {
    let geometry = Geometry::with_group_count(4)?;
    let mut buf = aligned(Map::required_buffer_size(geometry.groups_size_mask()));
    let mut map = Map::create(bytemuck::cast_slice_mut(&mut buf), geometry, Identity::default())?;

    assert_eq!(15, map.capacity());
    assert_eq!(14, map.max_load());

    // NOTE: All keys start at group 0 and spill along the probe sequence 0, 1, 3, 2
    let keys = (2..15).collect::<Vec<u64>>();
    map.extend(keys.iter().map(|&k| (k, k)));
    assert_eq!(13, map.len());
    assert_eq!(3, map.stats().overflowed_groups);

    let mut present = keys.clone();

    for victim in [2u64, 9, 14, 5, 13, 3] {
        assert_eq!(1, map.erase(&victim));
        present.retain(|&k| k != victim);

        assert!(!map.contains_key(&victim));
        for key in &present {
            assert_eq!(Some(key), map.get(key), "lost key {key} after erasing {victim}");
        }
    }

    assert_eq!(7, map.len());

    for victim in [2u64, 9, 14, 5, 13, 3] {
        assert!(map.insert(victim, victim + 1_000).1);
    }

    assert_eq!(13, map.len());

    for key in keys {
        let expected = if [2, 9, 14, 5, 13, 3].contains(&key) {
            key + 1_000
        } else {
            key
        };
        assert_eq!(Some(&expected), map.get(&key));
    }

    Ok(())
}

#[test]
fn map_retain_keeps_chains_intact() -> mmap_flat_map::Result<()> {
    let geometry = Geometry::with_group_count(4)?;
    let mut buf = aligned(Map::required_buffer_size(geometry.groups_size_mask()));
    let mut map = Map::create(bytemuck::cast_slice_mut(&mut buf), geometry, Identity::default())?;

    map.extend((2..15).map(|k| (k, k)));
    map.retain(|k, _| k % 2 == 1);

    assert_eq!(6, map.len());

    for key in 2..15 {
        assert_eq!(key % 2 == 1, map.contains_key(&key));
    }

    Ok(())
}
