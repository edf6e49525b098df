//! Process entry point: loads config, constructs every component exactly
//! once, spawns the background workers, and serves the HTTP surface.

mod app;
mod http;
mod metrics;
mod reminder_transport;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

use jobsignal_core::{Clock, JobSignalConfig, SystemClock};
use jobsignal_dispatch::DeliveryDispatcher;
use jobsignal_embeddings::{CachingEmbeddingProvider, EmbeddingProvider, OpenAiEmbeddingProvider};
use jobsignal_enrichment::{AnthropicEnrichmentProvider, EnrichmentWorker};
use jobsignal_match::MatchEngine;
use jobsignal_scheduler::{ReminderDaemon, Scheduler};
use jobsignal_store::Store;
use jobsignal_window::WindowManager;

use crate::reminder_transport::ChatReminderTransport;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "jobsignal_gateway=info,tower_http=debug".into()),
        )
        .init();

    let config_path = std::env::var("JOBSIGNAL_CONFIG").ok();
    let config = JobSignalConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        tracing::warn!("config load failed ({}), using defaults", e);
        JobSignalConfig::default()
    });

    let store = Arc::new(Store::open(rusqlite::Connection::open(&config.store.path)?)?);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(CachingEmbeddingProvider::new(
        OpenAiEmbeddingProvider::new(
            config.embedding.api_key.clone().unwrap_or_default(),
            config.embedding.base_url.clone(),
            config.embedding.model.clone(),
            config.embedding.version.clone(),
            config.embedding.timeout_ms,
        ),
        config.embedding.cache_entries,
    ));

    let enrichment_provider = Arc::new(AnthropicEnrichmentProvider::new(
        config.enrichment.api_key.clone().unwrap_or_default(),
        config.enrichment.base_url.clone(),
        config.enrichment.model.clone(),
        config.enrichment.timeout_ms,
    ));

    let chat = app::build_chat_sender(&config.chat);

    let match_engine = Arc::new(MatchEngine::new(config.matching.clone()));
    let dispatcher = Arc::new(DeliveryDispatcher::new(
        store.clone(),
        match_engine,
        chat.clone(),
        clock.clone(),
        config.delivery.clone(),
    ));

    let enrichment_worker = Arc::new(EnrichmentWorker::new(
        store.clone(),
        enrichment_provider,
        embedder.clone(),
        dispatcher.clone(),
        clock.clone(),
        config.enrichment.clone(),
    ));

    let window_manager = Arc::new(WindowManager::new(store.clone(), clock.clone(), config.window.clone()));
    let reminder_transport = Arc::new(ChatReminderTransport::new(store.clone(), chat.clone()));

    let scheduler = Arc::new(Scheduler::new(
        store.clone(),
        enrichment_worker,
        embedder,
        dispatcher,
        clock.clone(),
        config.scheduler.clone(),
    ));
    let reminder_daemon = ReminderDaemon::new(
        window_manager.clone(),
        reminder_transport,
        config.scheduler.reminder_daemon_cadence_secs,
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let scheduler_handle = tokio::spawn(scheduler.run(shutdown_rx.clone()));
    let reminder_handle = tokio::spawn(reminder_daemon.run(shutdown_rx.clone()));

    let bind = config.gateway.bind.clone();
    let port = config.gateway.port;
    let state = Arc::new(app::AppState::new(config, store, window_manager, chat));
    let router = app::build_router(state);

    let addr: SocketAddr = format!("{}:{}", bind, port).parse()?;
    info!(%addr, "jobsignal gateway listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        })
        .await?;

    let _ = tokio::join!(scheduler_handle, reminder_handle);
    Ok(())
}
