// Main entry point - Dependency injection and server setup
mod domain;
mod application;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc};
use anyhow::Context;
use tokio::sync::Mutex;
use tower_http::{compression::CompressionLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

use crate::application::clock::{Clock, SystemClock};
use crate::application::reference_data::ReferenceDataProvider;
use crate::application::registry::ComponentRegistry;
use crate::application::report_store::ReportStore;
use crate::application::suggestions::KeywordSuggester;
use crate::application::ticket_store::TicketStore;
use crate::application::widget_data::WidgetDataService;
use crate::infrastructure::attachments::LocalAttachmentResolver;
use crate::infrastructure::config::load_app_config;
use crate::infrastructure::reference_file::load_reference_data;
use crate::infrastructure::storage::{FileStorage, KeyValueStorage, MemoryStorage};
use crate::presentation::app_state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = load_app_config()?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // Storage backend (infrastructure layer)
    let storage: Arc<dyn KeyValueStorage> = if config.storage.is_in_memory() {
        tracing::warn!("Using in-memory storage; reports and tickets are lost on exit");
        Arc::new(MemoryStorage::new())
    } else {
        Arc::new(FileStorage::open(config.storage.path())?)
    };
    let attachments_dir = if config.storage.is_in_memory() {
        std::env::temp_dir().join("station-reports-attachments")
    } else {
        config.storage.path().join("attachments")
    };

    let reference: Arc<dyn ReferenceDataProvider> = Arc::new(
        load_reference_data(&config.reference.path, clock.now())
            .with_context(|| format!("loading reference data from {}", config.reference.path))?,
    );

    // Create services (application layer)
    let registry = ComponentRegistry::with_builtin();
    let reports = ReportStore::open(storage.clone(), clock.clone())?;
    let tickets = TicketStore::open(storage, clock.clone())?;

    // Create application state
    let state = Arc::new(AppState {
        reports: Mutex::new(reports),
        tickets: Mutex::new(tickets),
        registry: registry.clone(),
        reference: reference.clone(),
        widget_data: WidgetDataService::new(reference.clone(), registry),
        suggester: Arc::new(KeywordSuggester::new(reference)),
        attachments: Arc::new(LocalAttachmentResolver::new(attachments_dir, clock.clone())),
        clock,
    });

    // Build router (presentation layer)
    let router = presentation::router(state)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr: SocketAddr = config
        .server
        .addr
        .parse()
        .with_context(|| format!("invalid server.addr {}", config.server.addr))?;
    tracing::info!("Starting station-reports service on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
