use base64::{engine::general_purpose, Engine as _};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;
use zeroize::Zeroizing;

use crate::config::VaultConfig;
use crate::crypto;
use crate::error::StoreError;
use crate::medium::KeyValueMedium;

/// Reserved medium record holding the vault salt; never visible through
/// `keys()` or `has_item`.
const META_SALT_KEY: &str = "__sopvault.salt";

/// Encrypted-at-rest key-value store over a synchronous medium. Values are
/// JSON-serialized, sealed under a passphrase-derived key, and written as
/// opaque envelope strings. Writes fail loudly; reads degrade to `None`.
pub struct SecureStore<M: KeyValueMedium> {
    medium: M,
    key: Zeroizing<Vec<u8>>,
}

impl<M: KeyValueMedium> SecureStore<M> {
    /// Opens the store over `medium`. The first open seeds a random vault
    /// salt; later opens reuse it so existing envelopes stay readable under
    /// the same passphrase.
    pub fn open(mut medium: M, config: &VaultConfig) -> Result<Self, StoreError> {
        let salt = match medium.get(META_SALT_KEY) {
            Some(encoded) => general_purpose::STANDARD
                .decode(&encoded)
                .map_err(|e| StoreError::Metadata(format!("decode vault salt: {e}")))?,
            None => {
                let salt = crypto::generate_salt();
                medium.set(META_SALT_KEY, &general_purpose::STANDARD.encode(salt))?;
                salt.to_vec()
            }
        };
        let key = crypto::derive_key(&config.passphrase, &salt)
            .map_err(|e| StoreError::KeyDerivation(e.to_string()))?;
        Ok(Self { medium, key })
    }

    /// Serializes and encrypts `value`, fully replacing any previous record
    /// at `key`. The only operation that surfaces failure to the caller.
    pub fn set_item<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), StoreError> {
        let plaintext = serde_json::to_vec(value).map_err(|source| StoreError::Serialize {
            key: key.to_string(),
            source,
        })?;
        let envelope =
            crypto::seal(&self.key, &plaintext).map_err(|e| StoreError::Encrypt(e.to_string()))?;
        self.medium.set(key, &envelope)
    }

    /// Reads and decrypts the record at `key`. Absent keys, wrong-key or
    /// corrupted envelopes, and legacy plaintext all come back as `None`;
    /// callers must treat every read as potentially absent.
    pub fn get_item<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        if key == META_SALT_KEY {
            return None;
        }
        let raw = self.medium.get(key)?;
        let plaintext = match crypto::unseal(&self.key, &raw) {
            Ok(p) => p,
            Err(err) => {
                warn!(key, error = %err, "unreadable record treated as absent");
                return None;
            }
        };
        match serde_json::from_slice(&plaintext) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(key, error = %err, "decrypted record failed to parse");
                None
            }
        }
    }

    pub fn remove_item(&mut self, key: &str) -> Result<(), StoreError> {
        self.medium.remove(key)
    }

    /// Deletes every record but re-seats the vault salt so subsequent
    /// writes stay decryptable under the same passphrase.
    pub fn clear(&mut self) -> Result<(), StoreError> {
        let salt = self.medium.get(META_SALT_KEY);
        self.medium.clear()?;
        if let Some(salt) = salt {
            self.medium.set(META_SALT_KEY, &salt)?;
        }
        Ok(())
    }

    /// Existence check; delegates to the medium without decrypting.
    pub fn has_item(&self, key: &str) -> bool {
        key != META_SALT_KEY && self.medium.get(key).is_some()
    }

    /// Key enumeration; delegates to the medium without decrypting.
    pub fn keys(&self) -> Vec<String> {
        self.medium
            .keys()
            .into_iter()
            .filter(|k| k != META_SALT_KEY)
            .collect()
    }

    /// Raw medium text at `key`, no decryption. The migration pass and
    /// diagnostics read this.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.medium.get(key)
    }

    /// Hands the underlying medium back, consuming the store.
    pub fn into_medium(self) -> M {
        self.medium
    }
}
