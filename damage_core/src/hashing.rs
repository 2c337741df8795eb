use std::hash::Hasher;

/// A deterministic FNV-1a 64-bit hasher.
///
/// Used instead of `DefaultHasher` (which is randomized) so a vehicle
/// identifier always lands on the same ingest shard.
#[derive(Debug)]
pub struct FnvHasher {
    state: u64,
}

impl FnvHasher {
    const OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;

    pub fn new() -> Self {
        Self {
            state: Self::OFFSET_BASIS,
        }
    }
}

impl Default for FnvHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher for FnvHasher {
    fn finish(&self) -> u64 {
        self.state
    }

    fn write(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.state ^= byte as u64;
            self.state = self.state.wrapping_mul(Self::PRIME);
        }
    }
}

/// Shard index in `0..shards` for `key`.
pub fn shard_for(key: &str, shards: usize) -> usize {
    let mut hasher = FnvHasher::new();
    hasher.write(key.as_bytes());
    (hasher.finish() % shards.max(1) as u64) as usize
}
