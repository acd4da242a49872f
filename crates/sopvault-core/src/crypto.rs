use anyhow::{anyhow, Result};
use argon2::{Argon2, Params};
use base64::{engine::general_purpose, Engine as _};
use chacha20poly1305::aead::{Aead, KeyInit, OsRng};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use rand::RngCore;
use zeroize::Zeroizing;

pub const KDF_TIME_COST: u32 = 3;
pub const KDF_MEMORY_COST: u32 = 65536; // 64MB
pub const KDF_PARALLELISM: u32 = 4;
pub const DERIVED_KEY_LEN: usize = 32;

/// Marker prefix carried by every envelope this store writes; its absence
/// is what the migration pass keys on.
pub const ENVELOPE_TAG: &str = "ENC1.";
pub const NONCE_LEN: usize = 24;

pub fn derive_key(passphrase: &str, salt: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    let params = Params::new(
        KDF_MEMORY_COST,
        KDF_TIME_COST,
        KDF_PARALLELISM,
        Some(DERIVED_KEY_LEN),
    )
    .map_err(|e| anyhow!("argon2 params: {e}"))?;
    let argon = Argon2::from(params);
    let mut key = Zeroizing::new(vec![0u8; DERIVED_KEY_LEN]);
    argon
        .hash_password_into(passphrase.as_bytes(), salt, &mut key)
        .map_err(|e| anyhow!("argon2 derive: {e}"))?;
    Ok(key)
}

pub fn generate_nonce() -> [u8; NONCE_LEN] {
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);
    nonce
}

pub fn generate_salt() -> [u8; 32] {
    let mut salt = [0u8; 32];
    OsRng.fill_bytes(&mut salt);
    salt
}

/// Encrypts a serialized plaintext into the `ENC1.<nonce>.<ciphertext>`
/// text form. A fresh nonce per call; never reused across writes.
pub fn seal(key: &[u8], plaintext: &[u8]) -> Result<String> {
    let nonce = generate_nonce();
    let cipher = XChaCha20Poly1305::new(Key::from_slice(key));
    let ciphertext = cipher
        .encrypt(XNonce::from_slice(&nonce), plaintext)
        .map_err(|e| anyhow!("encrypt: {e}"))?;
    Ok(format!(
        "{}{}.{}",
        ENVELOPE_TAG,
        general_purpose::STANDARD.encode(nonce),
        general_purpose::STANDARD.encode(ciphertext)
    ))
}

/// Opens an envelope produced by `seal`. Wrong key, truncation, or any
/// tampering fails authentication here; callers on the read path downgrade
/// the error to "no value".
pub fn unseal(key: &[u8], raw: &str) -> Result<Vec<u8>> {
    let body = raw
        .strip_prefix(ENVELOPE_TAG)
        .ok_or_else(|| anyhow!("not an envelope"))?;
    let (nonce_b64, ct_b64) = body
        .split_once('.')
        .ok_or_else(|| anyhow!("malformed envelope"))?;
    let nonce = general_purpose::STANDARD
        .decode(nonce_b64)
        .map_err(|e| anyhow!("decode nonce: {e}"))?;
    if nonce.len() != NONCE_LEN {
        return Err(anyhow!("nonce length invalid"));
    }
    let ciphertext = general_purpose::STANDARD
        .decode(ct_b64)
        .map_err(|e| anyhow!("decode ciphertext: {e}"))?;
    let cipher = XChaCha20Poly1305::new(Key::from_slice(key));
    let plaintext = cipher
        .decrypt(XNonce::from_slice(&nonce), ciphertext.as_slice())
        .map_err(|e| anyhow!("decrypt: {e}"))?;
    Ok(plaintext)
}

pub fn is_envelope(raw: &str) -> bool {
    raw.starts_with(ENVELOPE_TAG)
}
