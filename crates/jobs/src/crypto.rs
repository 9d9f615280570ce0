//! Hybrid encryption for export archives (§4.E: "encrypt with a per-export
//! symmetric key wrapped to the requester's public key, so the server never
//! retains a key capable of decrypting a delivered export").
//!
//! Scheme: an ephemeral P-256 key is combined with the recipient's static
//! public key via ECDH; HKDF-SHA256 derives a 256-bit AES-GCM key from the
//! shared secret. The wire format is
//! `[ephemeral pubkey: 65 bytes][nonce: 12 bytes][ciphertext]`.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use hkdf::Hkdf;
use p256::{ecdh::diffie_hellman, EncodedPoint, PublicKey, SecretKey};
use rand::RngCore;
use sha2::Sha256;

const NONCE_LEN: usize = 12;

fn derive_key(shared_secret: &[u8], info: &[u8]) -> [u8; 32] {
    let hk = Hkdf::<Sha256>::new(None, shared_secret);
    let mut key = [0u8; 32];
    hk.expand(info, &mut key).expect("32 bytes is a valid HKDF output length");
    key
}

pub fn encrypt(data: &[u8], recipient_public_key: &PublicKey) -> trc::Result<Vec<u8>> {
    let ephemeral_secret = SecretKey::random(&mut rand::thread_rng());
    let ephemeral_public = ephemeral_secret.public_key();
    let shared = diffie_hellman(ephemeral_secret.to_nonzero_scalar(), recipient_public_key.as_affine());
    let key_bytes = derive_key(shared.raw_secret_bytes().as_slice(), b"export-archive-v1");

    let cipher = Aes256Gcm::new_from_slice(&key_bytes)
        .map_err(|e| trc::Error::job(trc::JobEvent::InvalidTransition, "failed to initialize cipher").details(e.to_string()))?;
    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);
    let ciphertext = cipher
        .encrypt(nonce, data)
        .map_err(|e| trc::Error::job(trc::JobEvent::InvalidTransition, "encryption failed").details(e.to_string()))?;

    let ephemeral_bytes = EncodedPoint::from(ephemeral_public);
    let mut out = Vec::with_capacity(ephemeral_bytes.as_bytes().len() + NONCE_LEN + ciphertext.len());
    out.extend_from_slice(ephemeral_bytes.as_bytes());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

pub fn decrypt(payload: &[u8], recipient_secret_key: &SecretKey) -> trc::Result<Vec<u8>> {
    const POINT_LEN: usize = 65;
    if payload.len() < POINT_LEN + NONCE_LEN {
        return Err(trc::Error::job(trc::JobEvent::InvalidTransition, "encrypted payload is truncated"));
    }
    let (point_bytes, rest) = payload.split_at(POINT_LEN);
    let (nonce_bytes, ciphertext) = rest.split_at(NONCE_LEN);

    let ephemeral_public = PublicKey::from_sec1_bytes(point_bytes)
        .map_err(|e| trc::Error::job(trc::JobEvent::InvalidTransition, "invalid ephemeral public key").details(e.to_string()))?;
    let shared = diffie_hellman(recipient_secret_key.to_nonzero_scalar(), ephemeral_public.as_affine());
    let key_bytes = derive_key(shared.raw_secret_bytes().as_slice(), b"export-archive-v1");

    let cipher = Aes256Gcm::new_from_slice(&key_bytes)
        .map_err(|e| trc::Error::job(trc::JobEvent::InvalidTransition, "failed to initialize cipher").details(e.to_string()))?;
    let nonce = Nonce::from_slice(nonce_bytes);
    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|e| trc::Error::job(trc::JobEvent::InvalidTransition, "decryption failed").details(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypted_archive_round_trips_for_the_intended_recipient() {
        let secret = SecretKey::random(&mut rand::thread_rng());
        let public = secret.public_key();
        let plaintext = b"mbox archive contents";
        let encrypted = encrypt(plaintext, &public).unwrap();
        let decrypted = decrypt(&encrypted, &secret).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn decrypting_with_the_wrong_key_fails() {
        let secret = SecretKey::random(&mut rand::thread_rng());
        let public = secret.public_key();
        let wrong_secret = SecretKey::random(&mut rand::thread_rng());
        let encrypted = encrypt(b"data", &public).unwrap();
        assert!(decrypt(&encrypted, &wrong_secret).is_err());
    }
}
