//! Canonical byte encoding and hashing
//!
//! Every field is rendered as text (decimal for integers, the name for the
//! action), the renderings are concatenated in a fixed order with no
//! separators or length prefixes, and the result is encoded as UTF-16
//! big-endian. The hash is SHA-256 rendered as uppercase hex.
//!
//! The layout is consensus-critical: any change forks the network.

use sha2::{Digest, Sha256};
use shared_types::{BlockHeader, Transaction, U256};

/// Append the UTF-16BE encoding of `text` to `out`.
fn push_utf16_be(out: &mut Vec<u8>, text: &str) {
    for unit in text.encode_utf16() {
        out.extend_from_slice(&unit.to_be_bytes());
    }
}

/// Encode a block header for hashing.
pub fn header_bytes(header: &BlockHeader, transaction_count: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(256);
    push_utf16_be(&mut out, &header.magic_number);
    push_utf16_be(&mut out, &header.version.to_string());
    push_utf16_be(&mut out, header.previous_hash.as_deref().unwrap_or_default());
    push_utf16_be(&mut out, &header.merkle_root);
    push_utf16_be(&mut out, &header.timestamp.to_string());
    push_utf16_be(&mut out, &header.nonce().to_string());
    push_utf16_be(&mut out, &transaction_count.to_string());
    out
}

/// Encode a transaction for hashing and merkle computation.
///
/// A basic transaction has no ledger-state fields; they encode as empty
/// strings and zeros.
pub fn transaction_bytes(tx: &Transaction) -> Vec<u8> {
    let base = tx.base();
    let (from, to, sku_hash, sku_index, amount) = match tx.as_state() {
        Some(state) => (
            state.from_pub_key.as_deref().unwrap_or_default(),
            state.to_pub_key.as_deref().unwrap_or_default(),
            state.sku_block_hash.as_deref().unwrap_or_default(),
            state.sku_tx_index,
            state.amount,
        ),
        None => ("", "", "", 0, 0),
    };

    let mut out = Vec::with_capacity(256);
    push_utf16_be(&mut out, from);
    push_utf16_be(&mut out, to);
    push_utf16_be(&mut out, sku_hash);
    push_utf16_be(&mut out, &sku_index.to_string());
    push_utf16_be(&mut out, &amount.to_string());
    push_utf16_be(&mut out, &base.version.to_string());
    push_utf16_be(&mut out, base.action.as_str());
    push_utf16_be(&mut out, base.data.as_deref().unwrap_or_default());
    push_utf16_be(&mut out, &base.fee.to_string());
    out
}

/// SHA-256 as uppercase hex.
#[inline]
pub fn hash_hex(bytes: &[u8]) -> String {
    hex::encode_upper(Sha256::digest(bytes))
}

/// Numeric value of a hex hash, read big-endian.
///
/// `None` if the text is not hex or longer than 32 bytes.
pub fn hash_to_u256(hash: &str) -> Option<U256> {
    let bytes = hex::decode(hash).ok()?;
    if bytes.len() > 32 {
        return None;
    }
    Some(U256::from_big_endian(&bytes))
}

/// Hash of a header as it would be recorded by `finalize`.
pub fn header_hash(header: &BlockHeader, transaction_count: usize) -> String {
    hash_hex(&header_bytes(header, transaction_count))
}

/// Hash of a transaction as it would be recorded by `finalize`.
pub fn transaction_hash(tx: &Transaction) -> String {
    hash_hex(&transaction_bytes(tx))
}
