//! `fable-admin` -- serve the story authoring API.
//!
//! Configuration comes from `FABLE_STORIES_ROOT` and `FABLE_BIND`; log
//! verbosity from `RUST_LOG` (default `info`).

use std::sync::Arc;

use anyhow::Context;
use fable_admin::prelude::*;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = AdminConfig::from_env().context("reading configuration")?;

    let events = Arc::new(ClientRegistry::new());
    let gateway = StoryGateway::new(&config.stories_root, config.layout, Arc::clone(&events));
    let app = router(AppState::new(gateway, events));

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    tracing::info!(
        addr = %config.bind_addr,
        stories_root = %config.stories_root.display(),
        "admin API listening"
    );

    axum::serve(listener, app).await.context("serving admin API")?;
    Ok(())
}
