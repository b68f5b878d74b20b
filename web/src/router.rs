use crate::{controller::health_check_controller, AppState};
use axum::{
    routing::{get, post},
    Router,
};

use crate::controller::{authorize_request_controller, oauth_controller, sso_controller};

use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_rapidoc::RapiDoc;

// This is the global definition of our OpenAPI spec. To be a part
// of the rendered spec, a path and schema must be listed here.
#[derive(OpenApi)]
#[openapi(
        info(
            title = "Keyrelay SSO Broker API"
        ),
        paths(
            authorize_request_controller::read,
            authorize_request_controller::read_by_user_code,
            authorize_request_controller::consent,
            health_check_controller::health_check,
            oauth_controller::authorize,
            oauth_controller::devicecode,
            oauth_controller::token,
            oauth_controller::discovery,
            sso_controller::init,
        ),
        components(
            schemas(
                domain::applications::Model,
                domain::auth_sessions::Model,
                domain::flow_type::FlowType,
                domain::session_status::SessionStatus,
            )
        ),
        modifiers(&SecurityAddon),
        tags(
            (name = "keyrelay", description = "SSO authorization-session broker API")
        )
    )]
struct ApiDoc;

struct SecurityAddon;

// The consent endpoints take the end user's bearer identity; /sso/init takes
// the client backend's API key.
impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
            components.add_security_scheme(
                "api_key",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                    "x-api-key",
                    "Server-to-server API key issued at application registration",
                ))),
            );
        }
    }
}

pub fn define_routes(app_state: AppState) -> Router {
    Router::new()
        .merge(health_routes())
        .merge(oauth_routes(app_state.clone()))
        .merge(authorize_request_routes(app_state.clone()))
        .merge(sso_routes(app_state))
        .merge(RapiDoc::with_openapi("/api-docs/openapi.json", ApiDoc::openapi()).path("/rapidoc"))
}

fn health_routes() -> Router {
    Router::new().route("/health", get(health_check_controller::health_check))
}

fn oauth_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/oauth2/authorize", get(oauth_controller::authorize))
        .route("/oauth2/devicecode", post(oauth_controller::devicecode))
        .route("/oauth2/token", post(oauth_controller::token))
        .route(
            "/.well-known/openid-configuration",
            get(oauth_controller::discovery),
        )
        .with_state(app_state)
}

fn authorize_request_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/authorize/request", get(authorize_request_controller::read))
        .route(
            "/authorize/request/by-user-code",
            get(authorize_request_controller::read_by_user_code),
        )
        .route(
            "/authorize/request/consent",
            post(authorize_request_controller::consent),
        )
        .with_state(app_state)
}

fn sso_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/sso/init", post(sso_controller::init))
        .with_state(app_state)
}

#[cfg(test)]
#[cfg(feature = "mock")]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use domain::flow_type::FlowType;
    use domain::session_status::SessionStatus;
    use domain::Id;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use service::config::Config;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn test_config() -> Config {
        Config::from_defaults().set_token_signing_key("test-signing-key".to_string())
    }

    fn app_with_db(db: sea_orm::DatabaseConnection) -> Router {
        let app_state = AppState::new(test_config(), &Arc::new(db));
        define_routes(app_state)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn form_request(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn pending_device_session(application_id: Id) -> domain::auth_sessions::Model {
        let now = chrono::Utc::now();
        domain::auth_sessions::Model {
            id: Id::new_v4(),
            application_id,
            flow: FlowType::DeviceCode,
            status: SessionStatus::Pending,
            user_id: None,
            redirect_uri: None,
            code_challenge: None,
            code_challenge_method: None,
            authorization_code: None,
            state: None,
            device_code: Some("device-code-value".to_string()),
            user_code: Some("ABCD2345".to_string()),
            poll_interval_secs: Some(5),
            last_polled_at: None,
            created_at: now.into(),
            expires_at: (now + chrono::Duration::minutes(10)).into(),
        }
    }

    #[tokio::test]
    async fn health_endpoint_responds() {
        let app = app_with_db(
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
        );

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn token_endpoint_rejects_unsupported_grant_type() {
        let app = app_with_db(
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
        );

        let response = app
            .oneshot(form_request(
                "/oauth2/token",
                "grant_type=password&client_id=irrelevant",
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"error": "unsupported_grant_type"})
        );
    }

    #[tokio::test]
    async fn token_endpoint_requires_a_code_for_the_auth_code_grant() {
        let app = app_with_db(
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
        );

        let response = app
            .oneshot(form_request(
                "/oauth2/token",
                "grant_type=authorization_code&client_id=irrelevant",
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"error": "invalid_request"})
        );
    }

    #[tokio::test]
    async fn device_poll_of_a_pending_session_answers_authorization_pending() {
        let app_id = Id::new_v4();
        let session = pending_device_session(app_id);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![session]])
            .append_exec_results(vec![MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();
        let app = app_with_db(db);

        let body = format!(
            "grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Adevice_code&client_id={app_id}&device_code=device-code-value"
        );
        let response = app.oneshot(form_request("/oauth2/token", &body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"error": "authorization_pending"})
        );
    }

    #[tokio::test]
    async fn consent_without_a_bearer_token_is_unauthorized() {
        let app = app_with_db(
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
        );

        let request = Request::builder()
            .method("POST")
            .uri("/authorize/request/consent")
            .header("content-type", "application/json")
            .body(Body::from(
                serde_json::json!({"session_id": Id::new_v4(), "approve": true}).to_string(),
            ))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn session_view_requires_and_accepts_a_bearer_identity() {
        let config = test_config();
        let user_id = Id::new_v4();
        let app_id = Id::new_v4();
        let credential = domain::access_token::mint(&config, user_id, app_id).unwrap();

        let session = pending_device_session(app_id);
        let now = chrono::Utc::now();
        let application = domain::applications::Model {
            id: app_id,
            name: "Example App".to_string(),
            logo_url: None,
            api_key_hash: None,
            device_code_enabled: true,
            suspended_until: None,
            created_at: now.into(),
            updated_at: now.into(),
        };

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![session.clone()]])
            .append_query_results(vec![vec![application]])
            .into_connection();
        let app = app_with_db(db);

        let request = Request::builder()
            .uri(format!("/authorize/request?session_id={}", session.id))
            .header("authorization", format!("Bearer {}", credential.access_token))
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["data"]["app_name"], "Example App");
        assert_eq!(json["data"]["status"], "pending");
    }

    #[tokio::test]
    async fn sso_init_without_an_api_key_is_unauthorized() {
        let app = app_with_db(
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
        );

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/sso/init")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
