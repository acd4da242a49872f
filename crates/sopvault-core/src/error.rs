use thiserror::Error;

/// Failures on the write path. Reads never surface errors; an unreadable
/// record degrades to "no value" and is logged (see `SecureStore::get_item`).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("serialize value for key '{key}': {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("encryption failed: {0}")]
    Encrypt(String),

    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("vault metadata unreadable: {0}")]
    Metadata(String),

    #[error("medium i/o: {0}")]
    Medium(#[from] std::io::Error),

    #[error("medium encode: {0}")]
    MediumEncode(#[source] serde_json::Error),
}
