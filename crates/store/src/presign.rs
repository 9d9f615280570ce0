//! Opaque presigned-token bookkeeping shared by the in-process backends.

use ahash::AHashMap;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rand::RngCore;

#[derive(Debug, Clone, serde::Serialize)]
pub struct PresignedUrl {
    pub token: String,
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenDirection {
    Upload,
    Download,
}

#[derive(Debug, Clone)]
struct PendingToken {
    key: String,
    direction: TokenDirection,
    expires_at: DateTime<Utc>,
}

/// Tracks outstanding presigned tokens so `complete_presigned_upload` and
/// `redeem_presigned_download` can validate and consume them exactly once.
#[derive(Default)]
pub struct TokenStore {
    pending: Mutex<AHashMap<String, PendingToken>>,
}

impl TokenStore {
    pub fn new() -> Self {
        TokenStore::default()
    }

    pub fn mint(&self, key: &str, direction: TokenDirection, ttl_secs: u64, base_url: &str) -> PresignedUrl {
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        let token = bytes.iter().map(|b| format!("{b:02x}")).collect::<String>();
        let expires_at = Utc::now() + chrono::Duration::seconds(ttl_secs as i64);
        self.pending.lock().insert(
            token.clone(),
            PendingToken {
                key: key.to_string(),
                direction,
                expires_at,
            },
        );
        PresignedUrl {
            url: format!("{base_url}/{token}"),
            token,
            expires_at,
        }
    }

    /// Validates and consumes a token, returning the key it was minted for.
    pub fn redeem(&self, token: &str, expect: TokenDirection) -> trc::Result<String> {
        let mut pending = self.pending.lock();
        let entry = pending
            .remove(token)
            .ok_or_else(|| trc::Error::resource(trc::ResourceEvent::NotFound, "presigned token not found"))?;
        if entry.direction != expect {
            return Err(trc::Error::resource(
                trc::ResourceEvent::BadParameters,
                "presigned token direction mismatch",
            ));
        }
        if Utc::now() > entry.expires_at {
            return Err(trc::Error::storage(trc::StorageEvent::PresignExpired, "presigned token expired"));
        }
        Ok(entry.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redeeming_an_unknown_token_fails() {
        let store = TokenStore::new();
        assert!(store.redeem("nope", TokenDirection::Upload).is_err());
    }

    #[test]
    fn token_is_single_use() {
        let store = TokenStore::new();
        let minted = store.mint("k1", TokenDirection::Download, 60, "https://example.test");
        assert!(store.redeem(&minted.token, TokenDirection::Download).is_ok());
        assert!(store.redeem(&minted.token, TokenDirection::Download).is_err());
    }

    #[test]
    fn wrong_direction_is_rejected() {
        let store = TokenStore::new();
        let minted = store.mint("k1", TokenDirection::Upload, 60, "https://example.test");
        assert!(store.redeem(&minted.token, TokenDirection::Download).is_err());
    }
}
