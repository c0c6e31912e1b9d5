use linguaquest_backend::config::Config;
use linguaquest_backend::db::DocumentStore;
use linguaquest_backend::logging::init_tracing;
use linguaquest_backend::services::llm_provider::LLMProvider;
use linguaquest_backend::state::AppState;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let config = Config::from_env();
    let _log_guard = init_tracing(&config);

    let store = match DocumentStore::open(&config.database_path).await {
        Ok(store) => store,
        Err(err) => {
            tracing::error!(error = %err, path = %config.database_path.display(), "failed to open document store");
            std::process::exit(1);
        }
    };
    tracing::info!(path = %config.database_path.display(), "document store ready");

    if config.jwt_secret.is_none() {
        tracing::warn!("JWT_SECRET is not set, authenticated routes will be unavailable");
    }

    let llm = LLMProvider::from_env();
    if !llm.is_available() {
        tracing::warn!("LLM_API_KEY is not set, chat and deck generation are disabled");
    }

    let addr = config.bind_addr();
    let app = linguaquest_backend::create_app(AppState::new(config, store.clone(), llm));

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(error = %err, %addr, "failed to bind listener");
            std::process::exit(1);
        }
    };
    tracing::info!(%addr, "linguaquest backend listening");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "server error");
    }

    store.pool().close().await;
    tracing::info!("Graceful shutdown complete");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
