//! HTTP front end for Keyword Clipper
//!
//! Serves the browser form and download pages plus a small JSON API.

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use crate::pipeline::ClipPipeline;
use crate::state::RunTracker;

pub mod handlers;
pub mod models;
pub mod pages;
pub mod server;

pub use server::{router, AppState};

/// API server bound to one pipeline and its run tracker
pub struct ApiServer {
    state: AppState,
    host: String,
    port: u16,
}

impl ApiServer {
    pub fn new(pipeline: Arc<ClipPipeline>, tracker: RunTracker, host: String, port: u16) -> Self {
        Self {
            state: AppState::new(pipeline, tracker),
            host,
            port,
        }
    }

    /// Start the API server
    pub async fn start(self) -> Result<()> {
        info!("🚀 Starting API server on {}:{}", self.host, self.port);
        server::start_http_server(self.state, &self.host, self.port).await
    }
}
