use crate::domain::payment::{Amount, IdempotencyMarker, PaymentRecord};
use crate::domain::ports::{IdempotencyCache, PaymentLedger, ResponseCache};
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory idempotency cache.
///
/// Uses `Arc<RwLock<HashMap<String, IdempotencyMarker>>>`; readers never observe a
/// partially written entry because every write holds the exclusive lock.
#[derive(Default, Clone)]
pub struct InMemoryIdempotencyCache {
    markers: Arc<RwLock<HashMap<String, IdempotencyMarker>>>,
}

impl InMemoryIdempotencyCache {
    /// Creates a new, empty idempotency cache.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdempotencyCache for InMemoryIdempotencyCache {
    async fn exists(&self, payment_id: &str) -> Result<bool> {
        let markers = self.markers.read().await;
        Ok(markers.contains_key(payment_id))
    }

    async fn set(&self, payment_id: &str, marker: IdempotencyMarker) -> Result<()> {
        let mut markers = self.markers.write().await;
        markers.entry(payment_id.to_string()).or_insert(marker);
        Ok(())
    }

    async fn get(&self, payment_id: &str) -> Result<Option<IdempotencyMarker>> {
        let markers = self.markers.read().await;
        Ok(markers.get(payment_id).copied())
    }
}

/// A thread-safe in-memory payment ledger.
///
/// Records are never removed; they stay available for lookups for the lifetime
/// of the process.
#[derive(Default, Clone)]
pub struct InMemoryPaymentLedger {
    records: Arc<RwLock<HashMap<String, PaymentRecord>>>,
}

impl InMemoryPaymentLedger {
    /// Creates a new, empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl PaymentLedger for InMemoryPaymentLedger {
    async fn create(&self, payment_id: &str, amount: Amount) -> Result<PaymentRecord> {
        let mut records = self.records.write().await;
        match records.entry(payment_id.to_string()) {
            Entry::Occupied(_) => Err(PaymentError::AlreadyExists(payment_id.to_string())),
            Entry::Vacant(slot) => {
                let record = PaymentRecord::new(payment_id, amount);
                slot.insert(record.clone());
                Ok(record)
            }
        }
    }

    async fn update(&self, record: PaymentRecord) -> Result<()> {
        let mut records = self.records.write().await;
        let stored = records
            .get_mut(&record.id)
            .ok_or_else(|| PaymentError::NotFound(record.id.clone()))?;
        if stored.is_terminal() {
            return Err(PaymentError::TerminalRecord(record.id));
        }
        *stored = record;
        Ok(())
    }

    async fn get(&self, payment_id: &str) -> Result<Option<PaymentRecord>> {
        let records = self.records.read().await;
        Ok(records.get(payment_id).cloned())
    }
}

/// A thread-safe in-memory response cache.
#[derive(Default, Clone)]
pub struct InMemoryResponseCache {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemoryResponseCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResponseCache for InMemoryResponseCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.read().await;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::payment::PaymentStatus;
    use rust_decimal_macros::dec;

    fn amount() -> Amount {
        Amount::new(dec!(50)).unwrap()
    }

    #[tokio::test]
    async fn test_idempotency_cache_set_is_idempotent() {
        let cache = InMemoryIdempotencyCache::new();
        assert!(!cache.exists("p1").await.unwrap());
        assert_eq!(cache.get("p1").await.unwrap(), None);

        cache.set("p1", IdempotencyMarker::Success).await.unwrap();
        cache.set("p1", IdempotencyMarker::Success).await.unwrap();

        assert!(cache.exists("p1").await.unwrap());
        assert_eq!(
            cache.get("p1").await.unwrap(),
            Some(IdempotencyMarker::Success)
        );
        assert!(!cache.exists("p2").await.unwrap());
    }

    #[tokio::test]
    async fn test_ledger_create_rejects_existing_id() {
        let ledger = InMemoryPaymentLedger::new();
        let record = ledger.create("p1", amount()).await.unwrap();
        assert_eq!(record.status, PaymentStatus::Pending);
        assert_eq!(record.retry_count, 0);

        let second = ledger.create("p1", Amount::new(dec!(75)).unwrap()).await;
        assert!(matches!(second, Err(PaymentError::AlreadyExists(id)) if id == "p1"));

        // Original record untouched
        let stored = ledger.get("p1").await.unwrap().unwrap();
        assert_eq!(stored.amount, amount());
        assert_eq!(ledger.len().await, 1);
    }

    #[tokio::test]
    async fn test_ledger_concurrent_create_single_winner() {
        let ledger = InMemoryPaymentLedger::new();
        let mut handles = Vec::new();
        for _ in 0..16 {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move {
                ledger.create("p1", amount()).await.is_ok()
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
        assert_eq!(ledger.len().await, 1);
    }

    #[tokio::test]
    async fn test_ledger_update_and_terminal_lock() {
        let ledger = InMemoryPaymentLedger::new();
        let mut record = ledger.create("p1", amount()).await.unwrap();

        record.record_failed_attempt().unwrap();
        ledger.update(record.clone()).await.unwrap();
        assert_eq!(ledger.get("p1").await.unwrap().unwrap().retry_count, 1);

        record.mark_succeeded().unwrap();
        ledger.update(record.clone()).await.unwrap();

        let mut tampered = record.clone();
        tampered.retry_count = 99;
        tampered.status = PaymentStatus::Failed;
        assert!(matches!(
            ledger.update(tampered).await,
            Err(PaymentError::TerminalRecord(_))
        ));

        let stored = ledger.get("p1").await.unwrap().unwrap();
        assert_eq!(stored.status, PaymentStatus::Success);
        assert_eq!(stored.retry_count, 1);
    }

    #[tokio::test]
    async fn test_ledger_update_unknown_id() {
        let ledger = InMemoryPaymentLedger::new();
        let record = PaymentRecord::new("ghost", amount());
        assert!(matches!(
            ledger.update(record).await,
            Err(PaymentError::NotFound(_))
        ));
        assert!(ledger.is_empty().await);
    }

    #[tokio::test]
    async fn test_response_cache() {
        let cache = InMemoryResponseCache::new();
        assert_eq!(cache.get("42").await.unwrap(), None);
        cache.set("42", "cached".to_string()).await.unwrap();
        assert_eq!(cache.get("42").await.unwrap().as_deref(), Some("cached"));
    }
}
