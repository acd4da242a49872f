use tracing::{info, warn};

use crate::crypto;
use crate::error::StoreError;
use crate::keys::KNOWN_KEYS;
use crate::medium::KeyValueMedium;
use crate::store::SecureStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// Legacy plaintext record re-written through the encrypted path.
    Migrated,
    /// Envelope marker already present; nothing to do.
    AlreadyEncrypted,
    /// Absent, or raw text that is neither an envelope nor valid JSON.
    Skipped,
}

/// Upgrades a single legacy plaintext record in place. A raw value that
/// parses as JSON is taken to be unencrypted and re-saved through
/// `set_item`; anything carrying the envelope marker is left alone. A
/// value written by some other tool whose unquoted text begins with the
/// marker would be misread as already encrypted; accepted as-is rather
/// than guessed around.
pub fn migrate_item<M: KeyValueMedium>(
    store: &mut SecureStore<M>,
    key: &str,
) -> Result<MigrationOutcome, StoreError> {
    let raw = match store.raw(key) {
        Some(raw) => raw,
        None => return Ok(MigrationOutcome::Skipped),
    };
    if crypto::is_envelope(&raw) {
        return Ok(MigrationOutcome::AlreadyEncrypted);
    }
    match serde_json::from_str::<serde_json::Value>(&raw) {
        Ok(value) => {
            store.set_item(key, &value)?;
            info!(key, "migrated plaintext record");
            Ok(MigrationOutcome::Migrated)
        }
        Err(_) => {
            warn!(key, "raw value is neither an envelope nor JSON; left untouched");
            Ok(MigrationOutcome::Skipped)
        }
    }
}

/// One-shot startup pass over every known record. Idempotent. Returns the
/// number of records migrated.
pub fn migrate_all<M: KeyValueMedium>(store: &mut SecureStore<M>) -> Result<usize, StoreError> {
    let mut migrated = 0;
    for key in KNOWN_KEYS {
        if migrate_item(store, key)? == MigrationOutcome::Migrated {
            migrated += 1;
        }
    }
    if migrated > 0 {
        info!(migrated, "plaintext migration complete");
    }
    Ok(migrated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VaultConfig;
    use crate::medium::{KeyValueMedium, MemoryMedium};
    use serde_json::json;

    fn seeded_store(entries: &[(&str, &str)]) -> SecureStore<MemoryMedium> {
        let mut medium = MemoryMedium::new();
        for (key, raw) in entries {
            medium.set(key, raw).unwrap();
        }
        let config = VaultConfig::with_passphrase("migration-passphrase");
        SecureStore::open(medium, &config).unwrap()
    }

    #[test]
    fn plaintext_record_is_upgraded_in_place() {
        let mut store = seeded_store(&[("sop_theme", "\"dark\"")]);
        let outcome = migrate_item(&mut store, "sop_theme").unwrap();
        assert_eq!(outcome, MigrationOutcome::Migrated);

        let raw = store.raw("sop_theme").unwrap();
        assert!(crypto::is_envelope(&raw));
        assert!(serde_json::from_str::<serde_json::Value>(&raw).is_err());
        let theme: String = store.get_item("sop_theme").unwrap();
        assert_eq!(theme, "dark");
    }

    #[test]
    fn second_pass_is_a_noop() {
        let mut store = seeded_store(&[("sop_theme", "\"dark\"")]);
        migrate_item(&mut store, "sop_theme").unwrap();
        let first = store.raw("sop_theme").unwrap();

        let outcome = migrate_item(&mut store, "sop_theme").unwrap();
        assert_eq!(outcome, MigrationOutcome::AlreadyEncrypted);
        assert_eq!(store.raw("sop_theme").unwrap(), first);
    }

    #[test]
    fn absent_and_unparseable_records_are_skipped() {
        let mut store = seeded_store(&[("sop_user", "not json and not an envelope")]);
        assert_eq!(
            migrate_item(&mut store, "sop_user").unwrap(),
            MigrationOutcome::Skipped
        );
        assert_eq!(
            migrate_item(&mut store, "sop_teams").unwrap(),
            MigrationOutcome::Skipped
        );
    }

    #[test]
    fn migrate_all_counts_only_upgraded_records() {
        let mut store = seeded_store(&[
            ("sop_theme", "\"dark\""),
            ("sop_teams", "[{\"id\":\"t1\"}]"),
            ("sop_user", "plaintext-but-not-json"),
        ]);
        store.set_item("sop_current_team", &json!("t1")).unwrap();

        let migrated = migrate_all(&mut store).unwrap();
        assert_eq!(migrated, 2);
        assert_eq!(migrate_all(&mut store).unwrap(), 0);

        let teams: serde_json::Value = store.get_item("sop_teams").unwrap();
        assert_eq!(teams[0]["id"], "t1");
    }
}
