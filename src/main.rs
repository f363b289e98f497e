use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::Method;
use axum::http::header::CONTENT_TYPE;
use axum_server::tls_rustls::RustlsConfig;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use s3gate::config::GatewayConfig;
use s3gate::storage::s3::S3Store;
use s3gate::{AppState, router};

#[tokio::main]
async fn main() {
    // Begin logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber).unwrap();

    // Read the configuration once, aborting start-up if it is incomplete
    let config = match GatewayConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{e}");
            return;
        }
    };

    // Allow browser clients from any origin; the gateway itself carries no
    // credentials
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .allow_origin(AllowOrigin::any());

    let store = S3Store::new(config.bucket.clone()).await;
    info!("Store client ready for bucket {}", config.bucket);

    let state = AppState {
        store: Arc::new(store),
        config: config.clone(),
    };

    let app = router(state)
        .layer(cors)
        .layer(DefaultBodyLimit::max(usize::MAX));

    // Serve over TLS when certificate material is configured, plain TCP
    // otherwise
    match &config.tls {
        Some((cert, key)) => {
            let rustls = match RustlsConfig::from_pem_file(cert, key).await {
                Ok(rustls) => rustls,
                Err(e) => {
                    tracing::error!("Could not load TLS certificate: {e}");
                    return;
                }
            };
            info!("Serving on https://{}", config.listen);
            axum_server::bind_rustls(config.listen, rustls)
                .serve(app.into_make_service())
                .await
                .unwrap();
        }
        None => {
            info!("Serving on http://{}", config.listen);
            axum_server::bind(config.listen)
                .serve(app.into_make_service())
                .await
                .unwrap();
        }
    }
}
