use crate::application::engine::RetryPolicy;
use crate::application::forms::DEFAULT_FORM_LIMIT;
use crate::error::{PaymentError, Result};
use crate::infrastructure::gateway::{DEFAULT_CHARGE_CEILING, GatewayConfig};
use crate::infrastructure::rate_limiter::{RateLimitConfig, TokenBucketConfig};
use clap::{Parser, ValueEnum};
use rust_decimal::Decimal;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Service configuration, read from flags or `PAYSERVE_*` environment variables.
#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Address to bind the HTTP listener to
    #[arg(long, env = "PAYSERVE_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to bind the HTTP listener to
    #[arg(long, env = "PAYSERVE_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Charge attempts per payment before it is marked failed
    #[arg(long, env = "PAYSERVE_MAX_RETRIES", default_value_t = 3)]
    pub max_retries: u32,

    /// Backoff step in milliseconds; the n-th failure waits n times this
    #[arg(long, env = "PAYSERVE_BASE_DELAY_MS", default_value_t = 500)]
    pub base_delay_ms: u64,

    /// Number of admission lock shards (1 = one service-wide lock)
    #[arg(long, env = "PAYSERVE_ADMISSION_SHARDS", default_value_t = 1)]
    pub admission_shards: usize,

    /// Largest amount the gateway will charge
    #[arg(long, env = "PAYSERVE_GATEWAY_CEILING", default_value = "10000")]
    pub gateway_ceiling: Decimal,

    /// Probability that the simulated gateway fails a valid charge
    #[arg(long, env = "PAYSERVE_GATEWAY_FAILURE_RATE", default_value_t = 0.0)]
    pub gateway_failure_rate: f64,

    /// Simulated gateway latency in milliseconds
    #[arg(long, env = "PAYSERVE_GATEWAY_LATENCY_MS", default_value_t = 0)]
    pub gateway_latency_ms: u64,

    /// Requests per client allowed within one rate limit window
    #[arg(long, env = "PAYSERVE_RATE_LIMIT", default_value_t = 5)]
    pub rate_limit: usize,

    /// Rate limit window in seconds
    #[arg(long, env = "PAYSERVE_RATE_WINDOW_SECS", default_value_t = 60)]
    pub rate_window_secs: u64,

    /// Payments a single submitter may send in one burst
    #[arg(long, env = "PAYSERVE_PAYMENT_BURST", default_value_t = 5)]
    pub payment_burst: u32,

    /// Payment tokens regained per submitter per second
    #[arg(long, env = "PAYSERVE_PAYMENT_REFILL_PER_SEC", default_value_t = 5.0)]
    pub payment_refill_per_sec: f64,

    /// Interval in seconds between rate limiter sweeps
    #[arg(long, env = "PAYSERVE_SWEEP_INTERVAL_SECS", default_value_t = 60)]
    pub sweep_interval_secs: u64,

    /// Largest accepted application form, in bytes
    #[arg(long, env = "PAYSERVE_FORM_LIMIT", default_value_t = DEFAULT_FORM_LIMIT)]
    pub form_limit: usize,

    /// Log output format
    #[arg(long, env = "PAYSERVE_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            max_retries: 3,
            base_delay_ms: 500,
            admission_shards: 1,
            gateway_ceiling: DEFAULT_CHARGE_CEILING,
            gateway_failure_rate: 0.0,
            gateway_latency_ms: 0,
            rate_limit: 5,
            rate_window_secs: 60,
            payment_burst: 5,
            payment_refill_per_sec: 5.0,
            sweep_interval_secs: 60,
            form_limit: DEFAULT_FORM_LIMIT,
            log_format: LogFormat::Text,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(PaymentError::Config("port must be non-zero".to_string()));
        }
        if self.max_retries == 0 {
            return Err(PaymentError::Config(
                "max retries must be at least 1".to_string(),
            ));
        }
        if self.admission_shards == 0 {
            return Err(PaymentError::Config(
                "admission shards must be at least 1".to_string(),
            ));
        }
        if self.gateway_ceiling < Decimal::ZERO {
            return Err(PaymentError::Config(format!(
                "gateway ceiling must not be negative, got {}",
                self.gateway_ceiling
            )));
        }
        if !(0.0..=1.0).contains(&self.gateway_failure_rate) {
            return Err(PaymentError::Config(format!(
                "gateway failure rate must be within [0, 1], got {}",
                self.gateway_failure_rate
            )));
        }
        if self.rate_limit == 0 {
            return Err(PaymentError::Config(
                "rate limit must be at least 1".to_string(),
            ));
        }
        if self.rate_window_secs == 0 || self.sweep_interval_secs == 0 {
            return Err(PaymentError::Config(
                "rate window and sweep interval must be non-zero".to_string(),
            ));
        }
        if self.payment_burst == 0 {
            return Err(PaymentError::Config(
                "payment burst must be at least 1".to_string(),
            ));
        }
        if !self.payment_refill_per_sec.is_finite() || self.payment_refill_per_sec <= 0.0 {
            return Err(PaymentError::Config(format!(
                "payment refill rate must be positive, got {}",
                self.payment_refill_per_sec
            )));
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| PaymentError::Config(format!("invalid listen address: {e}")))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay: Duration::from_millis(self.base_delay_ms),
        }
    }

    pub fn gateway(&self) -> GatewayConfig {
        GatewayConfig {
            ceiling: self.gateway_ceiling,
            failure_rate: self.gateway_failure_rate,
            latency: Duration::from_millis(self.gateway_latency_ms),
        }
    }

    pub fn rate_limit(&self) -> RateLimitConfig {
        RateLimitConfig {
            limit: self.rate_limit,
            window: Duration::from_secs(self.rate_window_secs),
        }
    }

    pub fn payment_rate_limit(&self) -> TokenBucketConfig {
        TokenBucketConfig {
            capacity: self.payment_burst,
            refill_per_sec: self.payment_refill_per_sec,
        }
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_parser() {
        let parsed = Config::parse_from(["payserve"]);
        let defaults = Config::default();
        assert_eq!(parsed.port, defaults.port);
        assert_eq!(parsed.gateway_ceiling, defaults.gateway_ceiling);
        assert_eq!(parsed.retry_policy(), RetryPolicy::default());
        assert_eq!(parsed.rate_limit(), RateLimitConfig::default());
        assert_eq!(parsed.payment_rate_limit(), TokenBucketConfig::default());
        assert_eq!(parsed.gateway(), GatewayConfig::default());
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn test_flags_override_defaults() {
        let config = Config::parse_from([
            "payserve",
            "--port",
            "9090",
            "--max-retries",
            "5",
            "--base-delay-ms",
            "10",
            "--log-format",
            "json",
        ]);
        assert_eq!(config.port, 9090);
        assert_eq!(config.retry_policy().max_retries, 5);
        assert_eq!(config.retry_policy().backoff(2), Duration::from_millis(20));
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let config = Config {
            gateway_failure_rate: 1.5,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(PaymentError::Config(_))));

        let config = Config {
            max_retries: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(PaymentError::Config(_))));

        let config = Config {
            admission_shards: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            payment_refill_per_sec: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_socket_addr() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 3000,
            ..Default::default()
        };
        assert_eq!(config.socket_addr().unwrap().port(), 3000);

        let config = Config {
            host: "not a host".to_string(),
            ..Default::default()
        };
        assert!(config.socket_addr().is_err());
    }
}
