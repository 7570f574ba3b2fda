//! Authenticated key exchange and symmetric wire encryption: ephemeral
//! X25519 ECDH, HKDF-SHA256 derivation, AES-256-GCM for the session transport.

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use hkdf::Hkdf;
use rand::rngs::OsRng;
use sha2::Sha256;
use x25519_dalek::{EphemeralSecret, PublicKey};
use zeroize::Zeroize;

use crate::error::WireError;

const NONCE_LEN: usize = 12;
const SESSION_KEY_INFO: &[u8] = b"omniscient-host session key v1";

pub struct EphemeralKeypair {
    secret: EphemeralSecret,
    pub public: PublicKey,
}

impl EphemeralKeypair {
    pub fn generate() -> Self {
        let secret = EphemeralSecret::random_from_rng(OsRng);
        let public = PublicKey::from(&secret);
        EphemeralKeypair { secret, public }
    }

    /// Consumes the keypair: an `EphemeralSecret` can only ever be used once.
    pub fn derive_session_key(self, peer_public: &PublicKey) -> SessionKey {
        let mut shared = self.secret.diffie_hellman(peer_public).to_bytes();
        let hk = Hkdf::<Sha256>::new(None, &shared);
        let mut okm = [0u8; 32];
        hk.expand(SESSION_KEY_INFO, &mut okm)
            .expect("32 bytes is a valid HKDF-SHA256 output length");
        shared.zeroize();
        SessionKey { bytes: okm }
    }
}

/// A derived per-peer AEAD key. Zeroized on drop; never logged or serialized.
pub struct SessionKey {
    bytes: [u8; 32],
}

impl Drop for SessionKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl SessionKey {
    pub fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new_from_slice(&self.bytes).expect("key is exactly 32 bytes")
    }

    /// Encrypts `plaintext` with a fresh random nonce, prepended to the ciphertext.
    pub fn seal(&self, plaintext: &[u8], associated_data: &[u8]) -> Result<Vec<u8>, WireError> {
        let cipher = self.cipher();
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::RngCore::fill_bytes(&mut OsRng, &mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);
        let ciphertext = cipher
            .encrypt(nonce, Payload { msg: plaintext, aad: associated_data })
            .map_err(|e| WireError::Crypto(e.to_string()))?;
        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    pub fn open(&self, sealed: &[u8], associated_data: &[u8]) -> Result<Vec<u8>, WireError> {
        if sealed.len() < NONCE_LEN {
            return Err(WireError::Crypto("ciphertext shorter than nonce".to_string()));
        }
        let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
        let cipher = self.cipher();
        let nonce = Nonce::from_slice(nonce_bytes);
        cipher
            .decrypt(nonce, Payload { msg: ciphertext, aad: associated_data })
            .map_err(|e| WireError::Crypto(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ecdh_handshake_derives_matching_keys() {
        let host = EphemeralKeypair::generate();
        let client = EphemeralKeypair::generate();
        let host_public = host.public;
        let client_public = client.public;

        let host_key = host.derive_session_key(&client_public);
        let client_key = client.derive_session_key(&host_public);

        let sealed = host_key.seal(b"hello viewer", b"assoc").unwrap();
        let opened = client_key.open(&sealed, b"assoc").unwrap();
        assert_eq!(opened, b"hello viewer");
    }

    #[test]
    fn tampered_ciphertext_fails_to_open() {
        let host = EphemeralKeypair::generate();
        let client = EphemeralKeypair::generate();
        let client_public = client.public;
        let host_key = host.derive_session_key(&client_public);

        let mut sealed = host_key.seal(b"payload", b"").unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0xFF;
        assert!(host_key.open(&sealed, b"").is_err());
    }

    #[test]
    fn wrong_associated_data_fails_to_open() {
        let host = EphemeralKeypair::generate();
        let client = EphemeralKeypair::generate();
        let client_public = client.public;
        let host_key = host.derive_session_key(&client_public);

        let sealed = host_key.seal(b"payload", b"correct").unwrap();
        assert!(host_key.open(&sealed, b"wrong").is_err());
    }
}
</content>
