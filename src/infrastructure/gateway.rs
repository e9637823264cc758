use crate::domain::payment::Amount;
use crate::domain::ports::ChargeGateway;
use async_trait::async_trait;
use rand::Rng;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::time::Duration;
use tracing::debug;

/// Largest amount the payment network accepts in a single charge.
pub const DEFAULT_CHARGE_CEILING: Decimal = dec!(10000);

#[derive(Debug, Clone, PartialEq)]
pub struct GatewayConfig {
    pub ceiling: Decimal,
    /// Probability in `[0, 1]` that an otherwise valid charge fails transiently.
    pub failure_rate: f64,
    pub latency: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            ceiling: DEFAULT_CHARGE_CEILING,
            failure_rate: 0.0,
            latency: Duration::ZERO,
        }
    }
}

/// Stand-in for the downstream payment network.
///
/// Always declines amounts above the ceiling and randomly declines the rest
/// according to `failure_rate`.
#[derive(Debug, Clone, Default)]
pub struct SimulatedGateway {
    config: GatewayConfig,
}

impl SimulatedGateway {
    pub fn new(config: GatewayConfig) -> Self {
        Self { config }
    }

    fn accepts(&self, amount: Amount) -> bool {
        if amount.value() > self.config.ceiling {
            debug!(%amount, ceiling = %self.config.ceiling, "charge above ceiling declined");
            return false;
        }
        if self.config.failure_rate <= 0.0 {
            return true;
        }
        let roll: f64 = rand::thread_rng().r#gen();
        let accepted = roll >= self.config.failure_rate;
        if !accepted {
            debug!(%amount, "transient charge failure");
        }
        accepted
    }
}

#[async_trait]
impl ChargeGateway for SimulatedGateway {
    async fn attempt_charge(&self, amount: Amount) -> bool {
        if !self.config.latency.is_zero() {
            tokio::time::sleep(self.config.latency).await;
        }
        self.accepts(amount)
    }
}
