use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use visitor_echo::config::AppConfig;
use visitor_echo::geo::{GeoProvider, IpApiClient};
use visitor_echo::store::{DocumentStore, RecordStore, StaticTokenProvider, UnconfiguredStore};
use visitor_echo::{build_router, AppState};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    dotenvy::dotenv().ok();

    let config = AppConfig::from_env();

    let tera = tera::Tera::new("src/templates/**/*.html").expect("Failed to load templates");

    let geo: Arc<dyn GeoProvider> = Arc::new(
        IpApiClient::new(
            config.geo_api_base_url.clone(),
            Duration::from_secs(config.geo_timeout_secs),
        )
        .expect("Failed to create geolocation client"),
    );

    let store: Arc<dyn RecordStore> = match config.store_endpoint.clone() {
        Some(endpoint) => {
            let credentials = Arc::new(StaticTokenProvider::new(config.store_token.clone()));
            Arc::new(
                DocumentStore::new(
                    endpoint,
                    config.store_database_name.clone(),
                    config.store_container_name.clone(),
                    credentials,
                )
                .expect("Failed to create record store client"),
            )
        }
        None => {
            tracing::warn!("STORE_ENDPOINT is not set, visitor records will not be persisted");
            Arc::new(UnconfiguredStore)
        }
    };

    let state = AppState {
        config: config.clone(),
        tera,
        geo,
        store,
    };

    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("Starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Server error");
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install signal handler");
    tracing::info!("Shutting down...");
}
