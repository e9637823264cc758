use crate::application::admission::AdmissionLock;
use crate::application::in_flight::{InFlight, InFlightGuard};
use crate::domain::payment::{Amount, IdempotencyMarker, Outcome, PaymentRecord};
use crate::domain::ports::{ChargeGatewayBox, IdempotencyCacheBox, PaymentLedgerBox};
use crate::error::{PaymentError, Result};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Bounded linear backoff applied to failed charge attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Delay inserted after the `retry_count`-th failure: `base_delay * retry_count`.
    pub fn backoff(&self, retry_count: u32) -> Duration {
        self.base_delay * retry_count
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

enum Admission {
    Admitted(PaymentRecord, InFlightGuard),
    Duplicate,
}

struct EngineInner {
    idempotency: IdempotencyCacheBox,
    ledger: PaymentLedgerBox,
    gateway: ChargeGatewayBox,
    policy: RetryPolicy,
    admission: AdmissionLock,
    in_flight: InFlight,
    closed: AtomicBool,
}

/// The idempotent payment processing engine.
///
/// `PaymentEngine` owns the idempotency cache and the payment ledger and is the
/// only writer of either. Cloning is cheap and every clone drives the same state.
///
/// Locking order: the admission lock is taken first and covers only the
/// duplicate check and the ledger insert. The cache and ledger guard their own
/// maps internally and are never held across an `.await` on each other. The
/// retry loop runs with no lock held, and only the task that created a record
/// ever updates it.
#[derive(Clone)]
pub struct PaymentEngine {
    inner: Arc<EngineInner>,
}

impl PaymentEngine {
    /// Creates a new `PaymentEngine` instance.
    ///
    /// # Arguments
    ///
    /// * `idempotency` - Store of success markers.
    /// * `ledger` - Store of payment records.
    /// * `gateway` - Downstream charge capability.
    /// * `policy` - Retry budget and backoff step.
    /// * `admission_shards` - Number of admission lock shards; `1` serializes all admissions.
    pub fn new(
        idempotency: IdempotencyCacheBox,
        ledger: PaymentLedgerBox,
        gateway: ChargeGatewayBox,
        policy: RetryPolicy,
        admission_shards: usize,
    ) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                idempotency,
                ledger,
                gateway,
                policy,
                admission: AdmissionLock::new(admission_shards),
                in_flight: InFlight::new(),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Processes one payment submission.
    ///
    /// Returns `Duplicate` when the id already succeeded or already has a ledger
    /// record, otherwise drives the charge to a terminal status. The charge runs
    /// on its own task, so dropping the returned future does not abort it.
    pub async fn process_payment(&self, payment_id: &str, amount: Decimal) -> Result<Outcome> {
        if payment_id.trim().is_empty() {
            return Err(PaymentError::ClientInput(
                "payment id must not be empty".to_string(),
            ));
        }
        let amount = Amount::new(amount)?;

        let (record, guard) = match self.admit(payment_id, amount).await? {
            Admission::Admitted(record, guard) => (record, guard),
            Admission::Duplicate => return Ok(Outcome::Duplicate),
        };

        let inner = Arc::clone(&self.inner);
        let settlement = tokio::spawn(async move {
            let _guard = guard;
            inner.settle(record).await
        });

        settlement
            .await
            .map_err(|e| PaymentError::InternalError(Box::new(e)))?
    }

    /// Looks up the ledger record for `payment_id`.
    pub async fn payment(&self, payment_id: &str) -> Result<Option<PaymentRecord>> {
        self.inner.ledger.get(payment_id).await
    }

    /// Whether a success marker exists for `payment_id`.
    pub async fn is_settled(&self, payment_id: &str) -> Result<bool> {
        self.inner.idempotency.exists(payment_id).await
    }

    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.active()
    }

    /// Stops admitting new payments. Loops already running keep going.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
    }

    /// Waits until every running retry loop has committed its terminal status.
    pub async fn drain(&self) {
        let pending = self.in_flight();
        if pending > 0 {
            info!(pending, "draining in-flight payments");
        }
        self.inner.in_flight.wait_idle().await;
    }

    async fn admit(&self, payment_id: &str, amount: Amount) -> Result<Admission> {
        let _admission = self.inner.admission.lock(payment_id).await;

        // Registered before the closed check so a concurrent drain either waits
        // for this payment or this payment sees the engine closed.
        let guard = self.inner.in_flight.enter();
        if self.inner.closed.load(Ordering::SeqCst) {
            return Err(PaymentError::ShuttingDown);
        }

        if self.inner.idempotency.exists(payment_id).await? {
            info!(payment_id, "duplicate payment prevented");
            return Ok(Admission::Duplicate);
        }

        match self.inner.ledger.create(payment_id, amount).await {
            Ok(record) => {
                debug!(payment_id, %amount, "payment admitted");
                Ok(Admission::Admitted(record, guard))
            }
            Err(PaymentError::AlreadyExists(_)) => {
                let status = self
                    .inner
                    .ledger
                    .get(payment_id)
                    .await?
                    .map(|existing| existing.status);
                info!(payment_id, ?status, "payment id already in ledger, rejecting resubmission");
                Ok(Admission::Duplicate)
            }
            Err(e) => Err(e),
        }
    }
}

impl EngineInner {
    /// Retry loop followed by the terminal commit. Sole mutator of `record`.
    async fn settle(&self, mut record: PaymentRecord) -> Result<Outcome> {
        let mut charged = false;

        while record.retry_count < self.policy.max_retries {
            if self.gateway.attempt_charge(record.amount).await {
                charged = true;
                break;
            }

            record.record_failed_attempt()?;
            self.ledger.update(record.clone()).await?;

            let delay = self.policy.backoff(record.retry_count);
            warn!(
                payment_id = %record.id,
                attempt = record.retry_count,
                delay_ms = delay.as_millis() as u64,
                "charge attempt failed, backing off"
            );
            tokio::time::sleep(delay).await;
        }

        if charged {
            record.mark_succeeded()?;
            self.ledger.update(record.clone()).await?;
            self.idempotency
                .set(&record.id, IdempotencyMarker::Success)
                .await?;
            info!(payment_id = %record.id, retries = record.retry_count, "payment succeeded");
            Ok(Outcome::Success)
        } else {
            record.mark_failed()?;
            self.ledger.update(record.clone()).await?;
            warn!(payment_id = %record.id, retries = record.retry_count, "payment failed, retry budget exhausted");
            Ok(Outcome::Failed)
        }
    }
}
