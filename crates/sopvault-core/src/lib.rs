//! Client-side encrypted persistence for the SOP management application:
//! an envelope-encrypted key-value store over a pluggable synchronous
//! medium, an inactivity session monitor, a log redaction filter, and a
//! one-shot migration pass for legacy plaintext records.

pub mod analytics;
pub mod config;
pub mod crypto;
pub mod error;
pub mod keys;
pub mod medium;
pub mod migrate;
pub mod paths;
pub mod redact;
pub mod session;
pub mod store;

pub use config::VaultConfig;
pub use error::StoreError;
pub use medium::{FileMedium, KeyValueMedium, MemoryMedium};
pub use migrate::{migrate_all, migrate_item, MigrationOutcome};
pub use redact::{redact_value, REDACTION_MARKER};
pub use session::{spawn_session_loop, SessionLoopHandle, SessionMonitor, SessionPhase};
pub use store::SecureStore;
