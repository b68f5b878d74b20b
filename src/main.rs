use axum::http::{header, HeaderValue, Method};
use log::*;
use service::config::Config;
use service::logging::Logger;
use service::AppState;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

#[tokio::main]
async fn main() {
    let config = Config::new();
    Logger::init_logger(&config);

    info!("Starting keyrelay authorization broker");

    let db = Arc::new(
        service::init_database(&config)
            .await
            .expect("Failed to connect to the database"),
    );

    let listen_addr = format!(
        "{}:{}",
        config.interface.as_deref().unwrap_or("127.0.0.1"),
        config.port
    );

    let allowed_origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_origin(allowed_origins);

    let app_state = AppState::new(config.clone(), &db);

    // Abandoned sessions are swept in the background; lazy expiry-on-read
    // keeps the protocol correct even if this task falls behind.
    tokio::spawn(domain::sweep::run(Arc::clone(&db), config.clone()));

    let router = web::router::define_routes(app_state).layer(cors);

    let listener = tokio::net::TcpListener::bind(&listen_addr)
        .await
        .expect("Failed to bind the listen interface");

    info!("Server starting... listening for connections on http://{listen_addr}");

    axum::serve(listener, router)
        .await
        .expect("Server stopped unexpectedly");
}
