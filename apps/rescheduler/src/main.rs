mod config;
mod db;
mod errors;
mod models;
mod notifier;
mod participants;
mod routes;
mod state;
mod store;
mod workflow;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use aws_config::{BehaviorVersion, Region};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::notifier::sqs::SqsNotifier;
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::postgres::PgStore;
use crate::workflow::{CompletionWorkflow, WorkflowOptions};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting rescheduler v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let pool = create_pool(&config.database).await?;
    let store = Arc::new(PgStore::new(pool));

    // Initialize SQS
    let sqs = build_sqs_client(&config).await;
    let notifier = Arc::new(SqsNotifier::new(
        sqs,
        config.sqs_queue_url.clone(),
        config.notify_delay_seconds,
    ));
    info!("SQS notifier targeting {}", config.sqs_queue_url);

    let options = WorkflowOptions {
        mode: config.completion_mode,
        scope_to_study: config.scope_to_study,
    };
    info!(
        "Completion mode: {:?}, study-scoped lookups: {}",
        options.mode, options.scope_to_study
    );
    let workflow = CompletionWorkflow::new(
        store.clone(),
        store.clone(),
        store.clone(),
        notifier,
        options,
    );

    let state = AppState {
        workflow: Arc::new(workflow),
        participants: store.clone(),
        schedules: store,
    };

    let app = build_router(state).layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs an SQS client for AWS, or for a local emulator when
/// `SQS_ENDPOINT` is set.
async fn build_sqs_client(config: &Config) -> aws_sdk_sqs::Client {
    let mut loader = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(config.aws_region.clone()));
    if let Some(endpoint) = &config.sqs_endpoint {
        loader = loader.endpoint_url(endpoint);
    }
    let shared = loader.load().await;

    aws_sdk_sqs::Client::new(&shared)
}
