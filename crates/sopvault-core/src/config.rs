use std::time::Duration;
use tracing::warn;
use zeroize::Zeroizing;

pub const PASSPHRASE_ENV: &str = "SOPVAULT_PASSPHRASE";
pub const SESSION_TIMEOUT_ENV: &str = "SOPVAULT_SESSION_TIMEOUT_SECS";

/// Fallback when no passphrase is configured; `from_env` warns loudly when
/// this ends up in use.
pub const DEFAULT_PASSPHRASE: &str = "sopvault-unconfigured-passphrase";

pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(30 * 60);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Configuration read once at process start and constructor-injected into
/// `SecureStore` and `SessionMonitor`.
#[derive(Clone)]
pub struct VaultConfig {
    pub passphrase: Zeroizing<String>,
    pub session_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            passphrase: Zeroizing::new(DEFAULT_PASSPHRASE.to_string()),
            session_timeout: DEFAULT_SESSION_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl VaultConfig {
    pub fn with_passphrase(passphrase: &str) -> Self {
        Self {
            passphrase: Zeroizing::new(passphrase.to_string()),
            ..Self::default()
        }
    }

    pub fn from_env() -> Self {
        let passphrase = match std::env::var(PASSPHRASE_ENV) {
            Ok(p) if !p.is_empty() => Zeroizing::new(p),
            _ => {
                warn!(
                    "{} not set; records will be encrypted under the built-in default passphrase",
                    PASSPHRASE_ENV
                );
                Zeroizing::new(DEFAULT_PASSPHRASE.to_string())
            }
        };
        let session_timeout = std::env::var(SESSION_TIMEOUT_ENV)
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_SESSION_TIMEOUT);
        Self {
            passphrase,
            session_timeout,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}
