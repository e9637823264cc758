#![allow(dead_code)]

use async_trait::async_trait;
use payserve::application::engine::{PaymentEngine, RetryPolicy};
use payserve::domain::payment::Amount;
use payserve::domain::ports::{ChargeGateway, ChargeGatewayBox};
use payserve::infrastructure::in_memory::{InMemoryIdempotencyCache, InMemoryPaymentLedger};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Gateway that replays a fixed script of results and counts every attempt.
#[derive(Clone)]
pub struct ScriptedGateway {
    script: Arc<Mutex<VecDeque<bool>>>,
    fallback: bool,
    latency: Duration,
    attempts: Arc<AtomicUsize>,
}

impl ScriptedGateway {
    pub fn always(result: bool) -> Self {
        Self::scripted(Vec::new(), result)
    }

    pub fn scripted(script: Vec<bool>, fallback: bool) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into())),
            fallback,
            latency: Duration::ZERO,
            attempts: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChargeGateway for ScriptedGateway {
    async fn attempt_charge(&self, _amount: Amount) -> bool {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or(self.fallback)
    }
}

pub fn engine(gateway: ChargeGatewayBox) -> PaymentEngine {
    sharded_engine(gateway, 1)
}

pub fn sharded_engine(gateway: ChargeGatewayBox, shards: usize) -> PaymentEngine {
    PaymentEngine::new(
        Box::new(InMemoryIdempotencyCache::new()),
        Box::new(InMemoryPaymentLedger::new()),
        gateway,
        RetryPolicy::default(),
        shards,
    )
}
