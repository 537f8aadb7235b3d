use std::sync::Arc;

use parcel_booking::api;
use parcel_booking::config::{Config, LogFormat, StoreBackend};
use parcel_booking::error::AppError;
use parcel_booking::provider::stripe::StripeClient;
use parcel_booking::state::AppState;
use parcel_booking::store::BookingStore;
use parcel_booking::store::memory::InMemoryStore;
use parcel_booking::store::mongo::MongoStore;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = Config::from_env()?;

    init_tracing(&config);

    let (store, mongo): (Arc<dyn BookingStore>, Option<MongoStore>) = match config.backend {
        StoreBackend::Mongo => {
            let mongo_config = config
                .mongo
                .as_ref()
                .ok_or_else(|| AppError::Internal("mongo backend without settings".to_string()))?;
            let mongo = MongoStore::connect(mongo_config)
                .await
                .map_err(|err| AppError::Internal(format!("failed to connect to mongodb: {err}")))?;
            let store: Arc<dyn BookingStore> = Arc::new(mongo.clone());
            (store, Some(mongo))
        }
        StoreBackend::Memory => {
            tracing::warn!("using in-memory store, data is lost on exit");
            let store: Arc<dyn BookingStore> = Arc::new(InMemoryStore::new());
            (store, None)
        }
    };

    let intents = Arc::new(StripeClient::new(config.stripe.clone()));
    let app = api::rest::router(Arc::new(AppState::new(store, intents)));

    let bind_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| AppError::Internal(format!("failed to bind {bind_addr}: {err}")))?;

    tracing::info!(http_port = config.http_port, "http server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::Internal(format!("server error: {err}")))?;

    if let Some(mongo) = mongo {
        mongo.shutdown().await;
    }

    Ok(())
}

fn init_tracing(config: &Config) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false);

    match config.log_format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for shutdown signal");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
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
