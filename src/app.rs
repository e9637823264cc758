//! Application context and process lifecycle.
//!
//! Every service is built once at startup, handed to the router by reference
//! and torn down in order on shutdown: stop accepting connections, stop admitting
//! payments, drain running retry loops, then stop background tasks.

use crate::application::engine::PaymentEngine;
use crate::application::forms::ApplicationService;
use crate::application::users::UserService;
use crate::config::Config;
use crate::error::Result;
use crate::infrastructure::gateway::SimulatedGateway;
use crate::infrastructure::in_memory::{
    InMemoryIdempotencyCache, InMemoryPaymentLedger, InMemoryResponseCache,
};
use crate::infrastructure::rate_limiter::{
    SlidingWindowRateLimiter, Sweep, TokenBucketRateLimiter, spawn_sweeper,
};
use crate::interfaces::http;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::info;

/// Services shared by every request handler.
pub struct ServiceContext {
    pub engine: PaymentEngine,
    pub users: UserService,
    pub user_limiter: Arc<SlidingWindowRateLimiter>,
    pub payment_limiter: Arc<TokenBucketRateLimiter>,
    pub forms: ApplicationService,
    pub sweep_interval: Duration,
}

impl ServiceContext {
    /// Wires the in-memory adapters and the simulated gateway from `config`.
    pub fn from_config(config: &Config) -> Self {
        let engine = PaymentEngine::new(
            Box::new(InMemoryIdempotencyCache::new()),
            Box::new(InMemoryPaymentLedger::new()),
            Box::new(SimulatedGateway::new(config.gateway())),
            config.retry_policy(),
            config.admission_shards,
        );

        Self {
            engine,
            users: UserService::new(Box::new(InMemoryResponseCache::new())),
            user_limiter: Arc::new(SlidingWindowRateLimiter::new(config.rate_limit())),
            payment_limiter: Arc::new(TokenBucketRateLimiter::new(config.payment_rate_limit())),
            forms: ApplicationService::new(config.form_limit),
            sweep_interval: config.sweep_interval(),
        }
    }
}

/// Serves until SIGINT or SIGTERM, then shuts down cooperatively.
pub async fn run(config: Config) -> Result<()> {
    config.validate()?;
    let addr = config.socket_addr()?;
    let listener = TcpListener::bind(addr).await?;
    serve(listener, ServiceContext::from_config(&config), shutdown_signal()).await
}

/// Serves on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, ctx: ServiceContext, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let ctx = Arc::new(ctx);
    let (stop_tx, stop_rx) = watch::channel(false);
    let limiters: Vec<Arc<dyn Sweep>> = vec![
        Arc::clone(&ctx.user_limiter) as Arc<dyn Sweep>,
        Arc::clone(&ctx.payment_limiter) as Arc<dyn Sweep>,
    ];
    let sweeper = spawn_sweeper(limiters, ctx.sweep_interval, stop_rx);

    info!(addr = %listener.local_addr()?, "payment backend listening");
    let app = http::router(Arc::clone(&ctx));
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await?;

    info!("listener closed, draining payments");
    ctx.engine.close();
    ctx.engine.drain().await;

    let _ = stop_tx.send(true);
    if let Err(e) = sweeper.await {
        tracing::warn!(error = %e, "rate limiter sweeper ended abnormally");
    }
    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
