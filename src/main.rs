//! HealthPK AI - health guidance chat assistant
//!
//! Serves the chat session API. When no completion credential is configured the
//! assistant runs permanently in offline mode and answers from its fallback table.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use healthpk_ai::config::{Config, ConfigError, PromptTemplate};
use healthpk_ai::core::{SessionFactory, SessionRegistry};
use healthpk_ai::providers::{
    CompletionBackend, CompletionClient, CompletionConfig, OfflineBackend,
};
use healthpk_ai::{routes, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "healthpk_ai=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    let template = match &config.settings.prompt.file {
        Some(path) => PromptTemplate::load_from_file(path).await?,
        None => PromptTemplate::default(),
    };
    tracing::info!("🩺 Persona: {}", template.persona.name);

    let backend: Arc<dyn CompletionBackend> = match CompletionConfig::from_config(&config) {
        Ok(client_config) => {
            tracing::info!(
                "🔗 Completion endpoint {} (model {})",
                client_config.endpoint,
                client_config.model
            );
            Arc::new(CompletionClient::new(client_config)?)
        }
        Err(ConfigError::Missing(var)) => {
            tracing::warn!(
                "⚠️ {} is not set; running in offline mode, every reply comes from the fallback table",
                var
            );
            Arc::new(OfflineBackend::new(var))
        }
        Err(e) => return Err(e.into()),
    };

    let factory = SessionFactory::from_config(&config, template, backend);
    let sessions = Arc::new(SessionRegistry::new(factory));
    if let Some(idle_timeout) = sessions.factory().idle_timeout() {
        tracing::info!("🧹 Idle sessions expire after {}s", idle_timeout.as_secs());
        sessions
            .clone()
            .spawn_idle_sweep(idle_timeout.min(Duration::from_secs(60)));
    }

    let state = AppState {
        config: Arc::new(config),
        sessions,
    };

    let app = Router::new()
        .merge(routes::router())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    tracing::info!("🔥 HealthPK AI running at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
