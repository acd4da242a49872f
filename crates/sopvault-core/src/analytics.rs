use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::StoreError;
use crate::keys;
use crate::medium::KeyValueMedium;
use crate::redact::redact_value;
use crate::store::SecureStore;

/// Upper bound on retained events; the oldest fall off first.
pub const MAX_EVENTS: usize = 500;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsEvent {
    pub id: Uuid,
    pub name: String,
    pub timestamp: DateTime<Utc>,
    pub props: serde_json::Value,
}

impl AnalyticsEvent {
    pub fn new(name: impl Into<String>, props: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            timestamp: Utc::now(),
            props,
        }
    }
}

/// Appends an event to the persisted trail. Props pass through the
/// redaction filter first, so the at-rest trail never carries raw secrets.
pub fn track<M: KeyValueMedium>(
    store: &mut SecureStore<M>,
    mut event: AnalyticsEvent,
) -> Result<(), StoreError> {
    event.props = redact_value(&event.props);
    let mut events: Vec<AnalyticsEvent> = store.get_item(keys::ANALYTICS_EVENTS).unwrap_or_default();
    events.push(event);
    if events.len() > MAX_EVENTS {
        let excess = events.len() - MAX_EVENTS;
        events.drain(..excess);
    }
    store.set_item(keys::ANALYTICS_EVENTS, &events)?;
    debug!(total = events.len(), "analytics event recorded");
    Ok(())
}

/// Most-recent-first view of the trail.
pub fn recent<M: KeyValueMedium>(store: &SecureStore<M>, limit: usize) -> Vec<AnalyticsEvent> {
    let mut events: Vec<AnalyticsEvent> = store.get_item(keys::ANALYTICS_EVENTS).unwrap_or_default();
    events.reverse();
    events.truncate(limit);
    events
}
