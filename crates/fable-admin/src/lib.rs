//! Fable Admin -- mutation gateway and HTTP admin API for story authoring.
//!
//! [`StoryGateway`](gateway::StoryGateway) validates every authoring
//! operation and performs it against the on-disk story tree, keeping each
//! character's manifest consistent with its scene files.
//! [`server::router`] exposes the gateway over HTTP under `/api/admin`, and
//! [`ClientRegistry`](events::ClientRegistry) fans out change notifications to
//! connected editors.
//!
//! # Modules
//!
//! - [`config`]: Server configuration and environment overrides.
//! - [`gateway`]: Validated create / read / update / delete and name normalization.
//! - [`events`]: Change events and the subscriber registry.
//! - [`server`]: axum routes, handlers and error rendering.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use fable_admin::prelude::*;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = AdminConfig::from_env()?;
//! let events = Arc::new(ClientRegistry::new());
//! let gateway = StoryGateway::new(&config.stories_root, config.layout, Arc::clone(&events));
//!
//! let app = router(AppState::new(gateway, events));
//! let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

pub mod config;
pub mod events;
pub mod gateway;
pub mod server;

use fable_store::StoreError;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors returned by gateway operations, each mapped to one HTTP status.
#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    /// The request is malformed: bad id, missing choice fields, bad body.
    #[error("{0}")]
    Validation(String),

    /// A path resolved outside the directory it was scoped to.
    #[error("{0}")]
    PathSecurity(String),

    /// The addressed character, manifest or scene does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The operation would overwrite or duplicate an existing record.
    #[error("{0}")]
    Conflict(String),

    /// Unexpected storage failure (I/O, corrupt record).
    #[error(transparent)]
    Store(StoreError),

    /// A background task failed to complete.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AdminError {
    /// The HTTP status code for this error.
    pub fn status(&self) -> u16 {
        match self {
            AdminError::Validation(_) => 400,
            AdminError::PathSecurity(_) => 403,
            AdminError::NotFound(_) => 404,
            AdminError::Conflict(_) => 409,
            AdminError::Store(_) | AdminError::Internal(_) => 500,
        }
    }
}

impl From<StoreError> for AdminError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::PathTraversal { .. } => AdminError::PathSecurity(err.to_string()),
            StoreError::NotFound { .. } => AdminError::NotFound(err.to_string()),
            StoreError::AlreadyExists { .. } => AdminError::Conflict(err.to_string()),
            other => AdminError::Store(other),
        }
    }
}

/// Result alias for admin operations.
pub type Result<T> = std::result::Result<T, AdminError>;

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::config::{AdminConfig, ConfigError};
    pub use crate::events::{ClientId, ClientRegistry, StoryEvent};
    pub use crate::gateway::{ManifestPatch, NewScene, NormalizeReport, StoryGateway, StoryPayload};
    pub use crate::server::{router, AppState};
    pub use crate::AdminError;
}
