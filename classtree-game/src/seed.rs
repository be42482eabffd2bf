//! Seeded random streams for reproducible tree builds and unlock rolls.
use hmac::{Hmac, Mac};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use sha2::Sha256;

/// Independent RNG streams segregated by domain, derived from one user seed.
///
/// Tree building and per-player unlock generation draw from separate streams so
/// a catalog rebuild never shifts the rolls of an unlock and vice versa.
#[derive(Debug, Clone)]
pub struct RngStreams {
    tree: ChaCha20Rng,
    unlock: ChaCha20Rng,
}

impl RngStreams {
    #[must_use]
    pub fn from_user_seed(seed: u64) -> Self {
        Self {
            tree: ChaCha20Rng::seed_from_u64(derive_stream_seed(seed, b"tree")),
            unlock: ChaCha20Rng::seed_from_u64(derive_stream_seed(seed, b"unlock")),
        }
    }

    pub fn tree(&mut self) -> &mut ChaCha20Rng {
        &mut self.tree
    }

    pub fn unlock(&mut self) -> &mut ChaCha20Rng {
        &mut self.unlock
    }
}

/// HMAC-SHA256 domain separation of a user seed.
#[must_use]
pub fn derive_stream_seed(user_seed: u64, domain_tag: &[u8]) -> u64 {
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(&user_seed.to_le_bytes()) else {
        return user_seed;
    };
    mac.update(domain_tag);
    let digest = mac.finalize().into_bytes();
    let mut seed_bytes = [0_u8; 8];
    seed_bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(seed_bytes)
}
