//! Event ledger ingestion.
//!
//! Recording an event never changes account status; the payment-processor
//! consumer decides separately whether to call a command.

use std::sync::Arc;

use crate::domain::{AccountId, Clock, LifecycleEvent};
use crate::error::LifecycleError;
use crate::persistence::{AccountStore, EventLedger};

/// Maximum length of an event type label.
pub const MAX_EVENT_TYPE_LEN: usize = 100;

/// Appends validated events to the ledger.
#[derive(Debug, Clone)]
pub struct EventRecorder {
    accounts: Arc<dyn AccountStore>,
    ledger: Arc<dyn EventLedger>,
    clock: Arc<dyn Clock>,
}

impl EventRecorder {
    /// Creates a recorder.
    #[must_use]
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        ledger: Arc<dyn EventLedger>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            accounts,
            ledger,
            clock,
        }
    }

    /// Records one event against an existing account.
    ///
    /// A blank `external_reference` is stored as absent, so the event counts
    /// as manual. `metadata` must be a JSON object or `null`.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::Validation`] for a blank or oversized event type or
    /// non-object metadata, [`LifecycleError::AccountNotFound`] for unknown
    /// accounts, or a store failure.
    pub async fn record(
        &self,
        account_id: AccountId,
        event_type: &str,
        external_reference: Option<String>,
        metadata: serde_json::Value,
    ) -> Result<LifecycleEvent, LifecycleError> {
        let event_type = event_type.trim();
        if event_type.is_empty() {
            return Err(LifecycleError::Validation(
                "event_type is required".to_string(),
            ));
        }
        if event_type.len() > MAX_EVENT_TYPE_LEN {
            return Err(LifecycleError::Validation(format!(
                "event_type must be at most {MAX_EVENT_TYPE_LEN} bytes"
            )));
        }
        let metadata = match metadata {
            serde_json::Value::Null => serde_json::Value::Object(serde_json::Map::new()),
            object @ serde_json::Value::Object(_) => object,
            _ => {
                return Err(LifecycleError::Validation(
                    "metadata must be a JSON object".to_string(),
                ));
            }
        };
        let external_reference = external_reference
            .map(|reference| reference.trim().to_string())
            .filter(|reference| !reference.is_empty());

        self.accounts.get(account_id).await?;

        let event = LifecycleEvent::new(
            account_id,
            event_type,
            external_reference,
            metadata,
            self.clock.now(),
        );
        self.ledger.append(&event).await?;
        tracing::info!(
            %account_id,
            event_type = %event.event_type,
            source = ?event.source(),
            "ledger event recorded"
        );
        Ok(event)
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::{
        Account, ActionType, Actor, AuditLogEntry, EventSource, EventSourceFilter, ManualClock,
    };
    use crate::persistence::InMemoryStore;
    use chrono::{Duration, Utc};

    async fn setup() -> (EventRecorder, Arc<InMemoryStore>, AccountId) {
        let store = Arc::new(InMemoryStore::new());
        let now = Utc::now();
        let account =
            Account::new_trial(AccountId::new(), now, Duration::days(14), Duration::days(7));
        let audit = AuditLogEntry::new(
            account.id,
            &Actor::System,
            ActionType::StartTrial,
            "",
            serde_json::json!({}),
            now,
        );
        store.insert(&account, &audit).await.unwrap();
        let recorder = EventRecorder::new(
            Arc::clone(&store) as Arc<dyn AccountStore>,
            Arc::clone(&store) as Arc<dyn EventLedger>,
            Arc::new(ManualClock::new(now)) as Arc<dyn Clock>,
        );
        (recorder, store, account.id)
    }

    #[tokio::test]
    async fn records_processor_and_manual_events() {
        let (recorder, store, id) = setup().await;
        let processor = recorder
            .record(
                id,
                "payment_failed",
                Some("evt_123".to_string()),
                serde_json::json!({"attempt": 2}),
            )
            .await
            .unwrap();
        assert_eq!(processor.source(), EventSource::Processor);

        let manual = recorder
            .record(id, "manual_refund", Some("  ".to_string()), serde_json::Value::Null)
            .await
            .unwrap();
        assert_eq!(manual.source(), EventSource::Manual);
        assert_eq!(manual.external_reference, None);
        assert_eq!(manual.metadata, serde_json::json!({}));

        let only_manual = EventLedger::recent(store.as_ref(), EventSourceFilter::Manual, 10)
            .await
            .unwrap();
        assert_eq!(only_manual.len(), 1);
    }

    #[tokio::test]
    async fn rejects_bad_input_before_writing() {
        let (recorder, store, id) = setup().await;
        for (event_type, metadata) in [
            ("  ", serde_json::Value::Null),
            ("ok", serde_json::json!([1, 2])),
        ] {
            assert!(matches!(
                recorder.record(id, event_type, None, metadata).await,
                Err(LifecycleError::Validation(_))
            ));
        }
        assert!(matches!(
            recorder
                .record(AccountId::new(), "payment_succeeded", None, serde_json::Value::Null)
                .await,
            Err(LifecycleError::AccountNotFound(_))
        ));
        let all = EventLedger::recent(store.as_ref(), EventSourceFilter::All, 10)
            .await
            .unwrap();
        assert!(all.is_empty());
    }
}
