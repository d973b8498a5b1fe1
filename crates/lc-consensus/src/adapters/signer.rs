//! Placeholder signer
//!
//! NOT real cryptography. A signature is the digest of the key followed by
//! the hash, and a key pair is a single string used as both halves. It
//! exists so that every code path that signs or verifies can run before a
//! real scheme is plugged in behind [`Signer`].

use crate::domain::codec;
use crate::ports::Signer;

#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderSigner;

impl PlaceholderSigner {
    fn sign(hash: &str, key: &str) -> String {
        let mut message = String::with_capacity(key.len() + hash.len());
        message.push_str(key);
        message.push_str(hash);
        codec::hash_hex(message.as_bytes())
    }
}

impl Signer for PlaceholderSigner {
    fn signature_is_valid(&self, signature: &str, hash: &str, public_key: &str) -> bool {
        !signature.is_empty() && !public_key.is_empty() && Self::sign(hash, public_key) == signature
    }

    fn create_signature(&self, hash: &str, private_key: &str) -> String {
        Self::sign(hash, private_key)
    }
}
