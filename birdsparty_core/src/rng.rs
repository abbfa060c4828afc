use hmac::{Hmac, Mac};
use rand::{rngs::StdRng, SeedableRng};
use sha2::Sha256;

use crate::services::RequestIds;

// Per-request randomness: HMAC-SHA256(secret, "key:nonce") seeds a StdRng.
// Same secret, key and nonce always replay the same grids.

pub type HmacSha256 = Hmac<Sha256>;

pub fn derive_hash_hex(input: &[u8]) -> String {
    use sha2::Digest;
    let mut hasher = Sha256::new();
    hasher.update(input);
    hex::encode(hasher.finalize())
}

/// Key binding a seed to one request of one resolution chain.
pub fn request_key(ids: &RequestIds, cascade_count: u32) -> String {
    format!(
        "{}:{}:{}:{}:{}",
        ids.client_id, ids.game_id, ids.player_id, ids.bet_id, cascade_count
    )
}

#[derive(Clone)]
pub struct SeedDeriver {
    secret: String,
}

impl SeedDeriver {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Public commitment to the secret, safe to log.
    pub fn secret_hash_hex(&self) -> String {
        derive_hash_hex(self.secret.as_bytes())
    }

    pub fn seed(&self, key: &str, nonce: u64) -> [u8; 32] {
        let mut mac =
            HmacSha256::new_from_slice(self.secret.as_bytes()).expect("HMAC accepts any key length");
        mac.update(format!("{key}:{nonce}").as_bytes());
        let mut out = [0u8; 32];
        out.copy_from_slice(&mac.finalize().into_bytes());
        out
    }

    pub fn rng(&self, key: &str, nonce: u64) -> StdRng {
        StdRng::from_seed(self.seed(key, nonce))
    }
}

impl std::fmt::Debug for SeedDeriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeedDeriver")
            .field("secret_hash", &self.secret_hash_hex())
            .finish()
    }
}
