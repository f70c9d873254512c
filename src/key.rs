//! Content fingerprints for class bytes loaded by application loaders.

use std::fmt;
use std::hash::{BuildHasher, Hash, Hasher};
use std::sync::Arc;

/// Hasher state used for fingerprints unless a cache is built with its own.
///
/// Fixed seeds keep `ContentKey::new` deterministic for the whole process.
pub type FingerprintState = ahash::RandomState;

pub fn fingerprint_state() -> FingerprintState {
    ahash::RandomState::with_seeds(
        0x243f_6a88_85a3_08d3,
        0x1319_8a2e_0370_7344,
        0xa409_3822_299f_31d0,
        0x082e_fa98_ec4e_6c89,
    )
}

/// Identity of a class byte payload: an eagerly computed hash plus a retained
/// copy of the bytes.
///
/// Keys compare hash first and then the full byte sequence, so a hash
/// collision costs a comparison but never produces a false hit. Keys are only
/// comparable when built with the same hasher state.
#[derive(Clone)]
pub struct ContentKey {
    hash: u64,
    bytes: Arc<[u8]>,
}

impl ContentKey {
    pub fn new(bytes: &[u8]) -> Self {
        Self::with_hasher(bytes, &fingerprint_state())
    }

    pub fn with_hasher<S: BuildHasher>(bytes: &[u8], state: &S) -> Self {
        Self {
            hash: state.hash_one(bytes),
            bytes: Arc::from(bytes),
        }
    }

    pub fn hash_value(&self) -> u64 {
        self.hash
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl PartialEq for ContentKey {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.bytes[..] == other.bytes[..]
    }
}

impl Eq for ContentKey {}

impl Hash for ContentKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl fmt::Debug for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentKey")
            .field("hash", &format_args!("{:#018x}", self.hash))
            .field("len", &self.bytes.len())
            .finish()
    }
}
