pub mod http;
pub mod script;

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::info;

use crate::config::{ResponderConfig, ResponderKind};
use crate::error::ResponderError;

pub use self::http::HttpResponder;
pub use self::script::ScriptResponder;

/// Turns free-form user text into a reply.
#[async_trait]
pub trait Responder: Send + Sync {
    async fn respond(&self, query: &str) -> Result<String, ResponderError>;
}

/// Build the configured responder.
pub fn from_config(config: &ResponderConfig) -> Result<Arc<dyn Responder>> {
    info!("Responder: {}", config.kind);
    let responder: Arc<dyn Responder> = match config.kind {
        ResponderKind::Script => Arc::new(ScriptResponder::from_config(config)),
        ResponderKind::Http => {
            let url = config
                .url
                .as_deref()
                .context("responder.url is required for the http responder")?;
            Arc::new(HttpResponder::new(url, config.timeout())?)
        }
    };
    Ok(responder)
}
