use super::payment::{Amount, IdempotencyMarker, PaymentRecord};
use crate::error::Result;
use async_trait::async_trait;

/// Success markers keyed by payment id.
#[async_trait]
pub trait IdempotencyCache: Send + Sync {
    async fn exists(&self, payment_id: &str) -> Result<bool>;
    /// Records a marker. Setting the same id twice has no further effect.
    async fn set(&self, payment_id: &str, marker: IdempotencyMarker) -> Result<()>;
    async fn get(&self, payment_id: &str) -> Result<Option<IdempotencyMarker>>;
}

/// Authoritative record of every payment attempt.
#[async_trait]
pub trait PaymentLedger: Send + Sync {
    /// Inserts a fresh `Pending` record, failing with `AlreadyExists` when the id is taken.
    ///
    /// The check and the insert happen under one write lock.
    async fn create(&self, payment_id: &str, amount: Amount) -> Result<PaymentRecord>;
    /// Replaces the stored record. Terminal records cannot be replaced.
    async fn update(&self, record: PaymentRecord) -> Result<()>;
    async fn get(&self, payment_id: &str) -> Result<Option<PaymentRecord>>;
}

/// Downstream charge execution. A `false` return is retriable.
#[async_trait]
pub trait ChargeGateway: Send + Sync {
    async fn attempt_charge(&self, amount: Amount) -> bool;
}

/// Plain key-value store for rendered responses.
#[async_trait]
pub trait ResponseCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: String) -> Result<()>;
}

pub type IdempotencyCacheBox = Box<dyn IdempotencyCache>;
pub type PaymentLedgerBox = Box<dyn PaymentLedger>;
pub type ChargeGatewayBox = Box<dyn ChargeGateway>;
pub type ResponseCacheBox = Box<dyn ResponseCache>;
