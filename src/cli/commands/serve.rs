//! Serve Command
//!
//! Start the HTTP grading service.

use std::sync::Arc;
use tracing::info;

use crate::ai::create_provider;
use crate::config::Config;
use crate::grading::BatchOrchestrator;
use crate::server;
use crate::types::Result;
use crate::workspace::GitFetcher;

pub async fn run(config: &Config, bind: Option<String>) -> Result<()> {
    config.require_credentials()?;

    let provider = create_provider(&config.llm)?;
    info!(
        "Grading with {} ({})",
        provider.name(),
        provider.model()
    );

    let fetcher = Arc::new(GitFetcher::from_config(&config.fetch));
    let orchestrator = Arc::new(BatchOrchestrator::from_config(config, fetcher, provider)?);

    let bind = bind.unwrap_or_else(|| config.server.bind.clone());
    server::serve(&bind, orchestrator).await
}
