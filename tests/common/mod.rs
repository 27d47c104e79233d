use std::hash::{BuildHasherDefault, Hasher};

/// Hasher that returns the last `u64` it was fed
///
/// Lets tests choose the starting group, tag and overflow bit of a key.
#[derive(Copy, Clone, Default)]
pub struct IdentityHasher(u64);

impl Hasher for IdentityHasher {
    fn finish(&self) -> u64 {
        self.0
    }

    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 = (self.0 << 8) | u64::from(b);
        }
    }

    fn write_u64(&mut self, x: u64) {
        self.0 = x;
    }
}

pub type Identity = BuildHasherDefault<IdentityHasher>;

/// Zeroed, 8-byte aligned backing storage of at least `len` bytes
#[must_use]
pub fn aligned(len: usize) -> Vec<u64> {
    vec![0; len.div_ceil(8)]
}
