#![no_main]
use arbitrary::{Arbitrary, Unstructured};
use libfuzzer_sys::fuzz_target;
use mmap_flat_map::{DefaultHashBuilder, Geometry, MmapFlatMap, Options};
use std::collections::HashMap;

#[derive(Arbitrary, Debug)]
enum Op {
    Insert(u16, u32),
    Assign(u16, u32),
    Remove(u16),
    Get(u16),
    Retain(u8),
    Clear,
}

fn run<const N: usize>(group_count_log2: u8, load_factor: u8, ops: &[Op]) {
    type Map<'a, const N: usize> = MmapFlatMap<u16, u32, &'a mut [u8], DefaultHashBuilder, N>;

    let geometry = Geometry::with_group_count(1 << (group_count_log2 % 8)).unwrap();
    let factor = f32::from(load_factor.max(1)) / 255.0;

    let len = Map::<N>::required_buffer_size(geometry.groups_size_mask());
    let mut buf = vec![0u32; len.div_ceil(4)];

    let mut map = Map::<N>::create_with_options(
        bytemuck::cast_slice_mut(&mut buf),
        geometry,
        DefaultHashBuilder,
        Options::default().max_load_factor(factor),
    )
    .unwrap();

    let mut model = HashMap::new();

    for op in ops {
        match *op {
            Op::Insert(k, v) => {
                if map.contains_key(&k) || map.can_insert() {
                    let had = model.contains_key(&k);
                    let (stored, inserted) = map.insert(k, v);
                    assert_eq!(!had, inserted);
                    assert_eq!(*model.entry(k).or_insert(v), *stored);
                }
            }
            Op::Assign(k, v) => {
                if map.contains_key(&k) || map.can_insert() {
                    let (_, inserted) = map.insert_or_assign(k, v);
                    assert_eq!(model.insert(k, v).is_none(), inserted);
                }
            }
            Op::Remove(k) => assert_eq!(model.remove(&k), map.remove(&k)),
            Op::Get(k) => assert_eq!(model.get(&k), map.get(&k)),
            Op::Retain(m) => {
                let m = u32::from(m.max(1));
                model.retain(|_, v| *v % m == 0);
                map.retain(|_, v| *v % m == 0);
            }
            Op::Clear => {
                model.clear();
                map.clear();
            }
        }

        assert_eq!(model.len(), map.len());
        assert!(map.len() <= map.max_load());
    }

    assert_eq!(model.len(), map.iter().count());
    for (k, v) in &map {
        assert_eq!(model.get(k), Some(v));
    }
}

fuzz_target!(|data: &[u8]| {
    let mut unstructured = Unstructured::new(data);

    let Ok((narrow, group_count_log2, load_factor)) =
        <(bool, u8, u8) as Arbitrary>::arbitrary(&mut unstructured)
    else {
        return;
    };

    let Ok(ops) = <Vec<Op> as Arbitrary>::arbitrary(&mut unstructured) else {
        return;
    };

    if narrow {
        run::<4>(group_count_log2, load_factor, &ops);
    } else {
        run::<15>(group_count_log2, load_factor, &ops);
    }
});
