use crate::error::PaymentError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A non-negative monetary amount submitted for charging.
///
/// Wraps `rust_decimal::Decimal`, so every `Amount` is finite by construction.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, PaymentError> {
        if value < Decimal::ZERO {
            Err(PaymentError::InvalidAmount(format!(
                "amount must not be negative, got {value}"
            )))
        } else {
            Ok(Self(value))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = PaymentError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Success,
    Failed,
}

impl PaymentStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }
}

/// Ledger entry for one logical payment.
///
/// Status only ever moves `Pending -> Success` or `Pending -> Failed`; every
/// mutator refuses to touch a record that has already reached a terminal state.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct PaymentRecord {
    /// Caller supplied identifier, unique within the ledger.
    pub id: String,
    pub amount: Amount,
    pub status: PaymentStatus,
    /// Number of failed gateway attempts so far.
    pub retry_count: u32,
}

impl PaymentRecord {
    pub fn new(id: impl Into<String>, amount: Amount) -> Self {
        Self {
            id: id.into(),
            amount,
            status: PaymentStatus::Pending,
            retry_count: 0,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Counts one failed charge attempt.
    pub fn record_failed_attempt(&mut self) -> Result<(), PaymentError> {
        self.ensure_pending()?;
        self.retry_count += 1;
        Ok(())
    }

    pub fn mark_succeeded(&mut self) -> Result<(), PaymentError> {
        self.ensure_pending()?;
        self.status = PaymentStatus::Success;
        Ok(())
    }

    pub fn mark_failed(&mut self) -> Result<(), PaymentError> {
        self.ensure_pending()?;
        self.status = PaymentStatus::Failed;
        Ok(())
    }

    fn ensure_pending(&self) -> Result<(), PaymentError> {
        if self.is_terminal() {
            Err(PaymentError::TerminalRecord(self.id.clone()))
        } else {
            Ok(())
        }
    }
}

/// Recorded proof that a payment id already completed successfully.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IdempotencyMarker {
    Success,
}

/// Result of a payment submission as seen by callers.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Outcome {
    Duplicate,
    Success,
    Failed,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Duplicate => "Duplicate",
            Self::Success => "Success",
            Self::Failed => "Failed",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
