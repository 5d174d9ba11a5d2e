//! Dreamscape server
//!
//! Loads configuration, wires the chat provider and mesh generator into a
//! session registry, and serves WebSocket sessions until interrupted.

mod config;

use std::sync::Arc;

use dream_agent::{
    ChatProvider, DisabledMeshGenerator, MeshGenerator, OpenAiProvider, ProcessMeshGenerator,
    ProviderError,
};
use dream_services::{DreamServer, ServerError, SessionRegistry, SharedSessionRegistry};
use thiserror::Error;

use config::DreamConfig;

/// Fatal startup errors
#[derive(Debug, Error)]
enum StartupError {
    #[error("Chat provider: {0}")]
    Provider(#[from] ProviderError),

    #[error("Server: {0}")]
    Server(#[from] ServerError),
}

#[tokio::main]
async fn main() {
    let config = match DreamConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.log_level.as_str()),
    )
    .init();

    log::info!("Dreamscape v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(config).await {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(config: DreamConfig) -> Result<(), StartupError> {
    let provider: Arc<dyn ChatProvider> = Arc::new(OpenAiProvider::new(config.llm.clone())?);
    log::info!("Chat model: {} via {}", config.llm.model, config.llm.api_base);

    let mesh: Arc<dyn MeshGenerator> = match config
        .mesh
        .command
        .as_deref()
        .and_then(|argv| ProcessMeshGenerator::from_argv(argv, config.generation_timeout()))
    {
        Some(generator) => Arc::new(generator),
        None => {
            log::info!("No mesh generator configured; generate_3d_model will report failures");
            Arc::new(DisabledMeshGenerator)
        }
    };

    let registry = SharedSessionRegistry::new(SessionRegistry::new(
        provider,
        mesh,
        config.session_settings(),
    ));
    let server = DreamServer::bind(&config.server.host, config.server.port, registry.clone()).await?;

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            log::info!("Shutdown requested...");
        }
    }

    let stats = registry.read().stats().clone();
    log::info!(
        "Served {} sessions (peak {} concurrent)",
        stats.total_created,
        stats.peak_sessions
    );
    Ok(())
}
