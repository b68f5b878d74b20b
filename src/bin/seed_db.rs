//! Development fixture: registers a client application with one trusted
//! redirect URI and prints the client id and the raw API key (shown once).

use domain::application;
use domain::applications;
use domain::Id;
use service::config::Config;
use service::logging::Logger;

const SEED_APP_NAME: &str = "Development App";
const SEED_REDIRECT_URI: &str = "http://localhost:8080/callback";

#[tokio::main]
async fn main() {
    let config = Config::new();
    Logger::init_logger(&config);

    let db = service::init_database(&config)
        .await
        .expect("Failed to connect to the database");

    let api_key = application::generate_api_key();
    let now = chrono::Utc::now();

    let app = application::create(
        &db,
        applications::Model {
            id: Id::new_v4(),
            name: SEED_APP_NAME.to_string(),
            logo_url: None,
            api_key_hash: Some(application::api_key_digest(&api_key)),
            device_code_enabled: true,
            suspended_until: None,
            created_at: now.into(),
            updated_at: now.into(),
        },
    )
    .await
    .expect("Failed to create the seed application");

    application::add_trusted_redirect_uri(&db, app.id, SEED_REDIRECT_URI.to_string())
        .await
        .expect("Failed to register the seed redirect URI");

    println!("client_id:    {}", app.id);
    println!("redirect_uri: {SEED_REDIRECT_URI}");
    println!("api_key:      {api_key}");
}
