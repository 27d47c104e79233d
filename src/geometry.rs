// Copyright (c) 2026-present, mmap-flat-map contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

/// Size class of a table
///
/// The pair of integers that, together with the key/value types, fully
/// determines a table's buffer layout. It has to be stored by the owner of
/// the buffer to be able to re-attach later.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Geometry {
    groups_size_index: usize,
    groups_size_mask: usize,
}

impl Geometry {
    /// Minimum group count used by the capacity planning helpers.
    pub const MIN_GROUP_COUNT: usize = 2;

    /// Creates a geometry from raw parts, as previously returned by
    /// [`Geometry::groups_size_index`] and [`Geometry::groups_size_mask`].
    ///
    /// # Errors
    ///
    /// Returns `Err` if `groups_size_mask + 1` is not a power of two.
    pub fn new(groups_size_index: usize, groups_size_mask: usize) -> crate::Result<Self> {
        let is_pow2 = groups_size_mask
            .checked_add(1)
            .is_some_and(usize::is_power_of_two);

        if !is_pow2 {
            return Err(crate::Error::InvalidGeometry { groups_size_mask });
        }

        Ok(Self {
            groups_size_index,
            groups_size_mask,
        })
    }

    /// Creates the geometry for the given number of groups.
    ///
    /// The index is the shift that maps the high bits of a 64-bit hash onto
    /// the group range.
    ///
    /// # Errors
    ///
    /// Returns `Err` if `group_count` is not a power of two.
    pub fn with_group_count(group_count: usize) -> crate::Result<Self> {
        if !group_count.is_power_of_two() {
            return Err(crate::Error::InvalidGeometry {
                groups_size_mask: group_count.wrapping_sub(1),
            });
        }

        let groups_size_index = (u64::BITS - group_count.trailing_zeros()) as usize;

        Ok(Self {
            groups_size_index,
            groups_size_mask: group_count - 1,
        })
    }

    /// Returns the hash shift selector.
    #[must_use]
    pub fn groups_size_index(&self) -> usize {
        self.groups_size_index
    }

    /// Returns the group count minus one.
    #[must_use]
    pub fn groups_size_mask(&self) -> usize {
        self.groups_size_mask
    }

    /// Returns the number of groups.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.groups_size_mask + 1
    }

    /// Returns the starting group of a hash.
    #[must_use]
    pub fn position(&self, hash: u64) -> usize {
        let shifted = u32::try_from(self.groups_size_index)
            .ok()
            .and_then(|shift| hash.checked_shr(shift))
            .unwrap_or(0);

        #[expect(
            clippy::cast_possible_truncation,
            reason = "masked to the group range right after"
        )]
        let shifted = shifted as usize;

        shifted & self.groups_size_mask
    }
}

/// Quadratic probing over groups
///
/// Visits every group exactly once for power-of-two group counts.
pub struct ProbeSeq {
    pos: usize,
    step: usize,
    mask: usize,
}

impl ProbeSeq {
    pub fn new(pos: usize, mask: usize) -> Self {
        Self { pos, step: 0, mask }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Advances to the next group, returns `false` once all groups were visited.
    pub fn next(&mut self) -> bool {
        self.step += 1;
        self.pos = (self.pos + self.step) & self.mask;
        self.step <= self.mask
    }
}
