use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::auth::HttpAuthVerifier;
use super::handlers::{
    create_alert, delete_alert, delete_all_alerts, get_alert, health_check, list_alerts,
    stream_alerts, unread_count, update_read_state, AppState,
};
use crate::alerts::{AlertRepository, AlertService};
use crate::broadcast::{Broadcaster, Heartbeat, DEFAULT_CLIENT_BUFFER, DEFAULT_HEARTBEAT_INTERVAL};
use crate::storage::{InMemoryAlertRepository, JsonFileAlertRepository};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// JSON file backing the alert store; in-memory when unset
    pub data_file: Option<PathBuf>,
    pub user_service_uri: String,
    pub heartbeat_interval: Duration,
    pub delivery_timeout: Duration,
    pub client_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            data_file: None,
            user_service_uri: "http://user-service:3001".to_string(),
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            delivery_timeout: crate::alerts::service::DEFAULT_DELIVERY_TIMEOUT,
            client_buffer: DEFAULT_CLIENT_BUFFER,
        }
    }
}

/// Build the application router
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Internal: called by the measurement pipeline
        .route("/api/internal/alerts", post(create_alert))
        // Public
        .route("/api/alerts", get(list_alerts).delete(delete_all_alerts))
        .route("/api/alerts/stream", get(stream_alerts))
        .route("/api/alerts/unread-count", get(unread_count))
        .route(
            "/api/alerts/:id",
            get(get_alert).patch(update_read_state).delete(delete_alert),
        )
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Run the HTTP server
pub async fn run_server(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let repository: Arc<dyn AlertRepository> = match &config.data_file {
        Some(path) => Arc::new(JsonFileAlertRepository::open(path).await?),
        None => {
            tracing::warn!("No data file configured, alerts are kept in memory only");
            Arc::new(InMemoryAlertRepository::new())
        }
    };

    let broadcaster = Arc::new(Broadcaster::with_buffer(config.client_buffer));
    let heartbeat = Heartbeat::start(&broadcaster, config.heartbeat_interval);

    let service = Arc::new(
        AlertService::new(repository, broadcaster.clone())
            .with_delivery_timeout(config.delivery_timeout),
    );

    let state = Arc::new(AppState {
        service,
        broadcaster: Arc::clone(&broadcaster),
        auth: Arc::new(HttpAuthVerifier::new(config.user_service_uri.clone())),
    });

    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    tracing::info!("Starting alert server on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(Arc::clone(&broadcaster)))
        .await?;

    heartbeat.stop().await;

    tracing::info!("Alert server stopped");
    Ok(())
}

async fn shutdown_signal(broadcaster: Arc<Broadcaster>) {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C signal handler");

    tracing::info!("Shutdown signal received, closing live streams...");
    // Open streams would otherwise hold graceful shutdown forever
    broadcaster.disconnect_all();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::auth::{AuthError, AuthScope, AuthUser, AuthVerifier};
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use futures::StreamExt;
    use tower::util::ServiceExt;

    /// Accepts "user-token" for users and "admin-token" for everything
    struct StubVerifier;

    #[async_trait]
    impl AuthVerifier for StubVerifier {
        async fn verify(&self, token: &str, scope: AuthScope) -> Result<AuthUser, AuthError> {
            match (token, scope) {
                ("admin-token", _) => Ok(AuthUser {
                    id: "u-admin".to_string(),
                    role: "admin".to_string(),
                }),
                ("user-token", AuthScope::User) => Ok(AuthUser {
                    id: "u-1".to_string(),
                    role: "user".to_string(),
                }),
                ("user-token", AuthScope::Admin) => Err(AuthError::Forbidden),
                _ => Err(AuthError::Rejected),
            }
        }
    }

    fn create_test_app() -> (Router, Arc<Broadcaster>) {
        let broadcaster = Arc::new(Broadcaster::new());
        let service = Arc::new(AlertService::new(
            Arc::new(InMemoryAlertRepository::new()),
            broadcaster.clone(),
        ));
        let state = Arc::new(AppState {
            service,
            broadcaster: Arc::clone(&broadcaster),
            auth: Arc::new(StubVerifier),
        });
        (build_router(state), broadcaster)
    }

    fn request(method: &str, uri: &str, token: Option<&str>, body: Option<serde_json::Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::COOKIE, format!("authToken={}", token));
        }
        match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&json).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn create_body() -> serde_json::Value {
        serde_json::json!({
            "thresholdId": "t-1",
            "thresholdName": "High electricity usage",
            "utilityType": "Electricity",
            "thresholdType": "ACTUAL",
            "limitValue": 2.2,
            "detectedValue": 2.5
        })
    }

    async fn create(app: &Router) -> String {
        let response = app
            .clone()
            .oneshot(request("POST", "/api/internal/alerts", None, Some(create_body())))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = json_body(response).await;
        assert_eq!(body["success"], true);
        body["data"]["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health_check() {
        let (app, _) = create_test_app();

        let response = app.oneshot(request("GET", "/health", None, None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"OK");
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let (app, _) = create_test_app();
        let id = create(&app).await;

        let response = app
            .oneshot(request("GET", &format!("/api/alerts/{}", id), Some("user-token"), None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["data"]["id"], id.as_str());
        assert_eq!(body["data"]["status"], "SENT");
        assert!(body["data"]["sentAt"].is_string());
        assert!(body["data"]["message"]
            .as_str()
            .unwrap()
            .contains("exceeded by 0.30kWh"));
    }

    #[tokio::test]
    async fn test_create_validation_error() {
        let (app, _) = create_test_app();
        let mut body = create_body();
        body["thresholdName"] = serde_json::json!("");

        let response = app
            .clone()
            .oneshot(request("POST", "/api/internal/alerts", None, Some(body)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = json_body(response).await;
        assert_eq!(json["code"], "VALIDATION_ERROR");
        assert!(json["errors"]["thresholdName"].is_string());

        let response = app
            .oneshot(request(
                "POST",
                "/api/internal/alerts",
                None,
                Some(serde_json::json!({ "thresholdId": "t-1", "limitValue": "high" })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = json_body(response).await;
        assert_eq!(json["code"], "VALIDATION_ERROR");
        assert_eq!(json["errors"]["limitValue"], "Expected number, received string");
        assert_eq!(json["errors"]["thresholdName"], "Required");
        assert_eq!(json["errors"]["detectedValue"], "Required");
        assert!(json["errors"]["thresholdId"].is_null());
    }

    #[tokio::test]
    async fn test_missing_numeric_field_reported_by_name() {
        let (app, _) = create_test_app();
        let mut body = create_body();
        body.as_object_mut().unwrap().remove("limitValue");

        let response = app
            .oneshot(request("POST", "/api/internal/alerts", None, Some(body)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = json_body(response).await;
        assert_eq!(json["code"], "VALIDATION_ERROR");
        assert_eq!(json["message"], "Invalid request payload");
        assert_eq!(json["errors"], serde_json::json!({ "limitValue": "Required" }));
    }

    #[tokio::test]
    async fn test_update_read_state_requires_boolean() {
        let (app, _) = create_test_app();
        let id = create(&app).await;

        let response = app
            .oneshot(request(
                "PATCH",
                &format!("/api/alerts/{}", id),
                Some("user-token"),
                Some(serde_json::json!({ "read": "yes" })),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = json_body(response).await;
        assert_eq!(json["errors"]["read"], "Expected boolean, received string");
    }

    #[tokio::test]
    async fn test_requires_token() {
        let (app, _) = create_test_app();

        let response = app
            .clone()
            .oneshot(request("GET", "/api/alerts", None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["code"], "UNAUTHORIZED");

        let response = app
            .oneshot(request("GET", "/api/alerts", Some("bogus"), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_not_found() {
        let (app, _) = create_test_app();

        let response = app
            .oneshot(request("GET", "/api/alerts/nonexistent", Some("user-token"), None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = json_body(response).await;
        assert_eq!(body["code"], "RESOURCE_NOT_FOUND");
        assert_eq!(body["message"], "Alert with id nonexistent not found");
    }

    #[tokio::test]
    async fn test_blank_id_is_bad_request() {
        let (app, _) = create_test_app();

        let response = app
            .oneshot(request("GET", "/api/alerts/%20%20", Some("user-token"), None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn test_mark_read_and_unread_count() {
        let (app, _) = create_test_app();
        let id = create(&app).await;
        create(&app).await;

        let response = app
            .clone()
            .oneshot(request("GET", "/api/alerts/unread-count", Some("user-token"), None))
            .await
            .unwrap();
        assert_eq!(json_body(response).await["data"]["count"], 2);

        let response = app
            .clone()
            .oneshot(request(
                "PATCH",
                &format!("/api/alerts/{}", id),
                Some("user-token"),
                Some(serde_json::json!({ "read": true })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .clone()
            .oneshot(request("GET", "/api/alerts/unread-count", Some("user-token"), None))
            .await
            .unwrap();
        assert_eq!(json_body(response).await["data"]["count"], 1);

        let response = app
            .oneshot(request("GET", "/api/alerts", Some("user-token"), None))
            .await
            .unwrap();
        let body = json_body(response).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_delete_requires_admin() {
        let (app, _) = create_test_app();
        let id = create(&app).await;
        let uri = format!("/api/alerts/{}", id);

        let response = app
            .clone()
            .oneshot(request("DELETE", &uri, Some("user-token"), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app
            .clone()
            .oneshot(request("DELETE", &uri, Some("admin-token"), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["success"], true);

        let response = app
            .clone()
            .oneshot(request("GET", &uri, Some("user-token"), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        create(&app).await;
        let response = app
            .clone()
            .oneshot(request("DELETE", "/api/alerts", Some("admin-token"), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(request("GET", "/api/alerts", Some("user-token"), None))
            .await
            .unwrap();
        assert!(json_body(response).await["data"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stream_receives_created_alert() {
        let (app, broadcaster) = create_test_app();

        let response = app
            .clone()
            .oneshot(request("GET", "/api/alerts/stream", Some("user-token"), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/event-stream");
        assert_eq!(broadcaster.client_count(), 1);

        let mut frames = response.into_body().into_data_stream();
        let first = frames.next().await.unwrap().unwrap();
        assert_eq!(&first[..], b"data: {\"type\":\"CONNECTED\"}\n\n");

        let id = create(&app).await;
        let second = frames.next().await.unwrap().unwrap();
        let text = String::from_utf8(second.to_vec()).unwrap();
        assert!(text.starts_with("data: {\"type\":\"NEW_ALERT\""));
        assert!(text.contains(&id));

        drop(frames);
        assert_eq!(broadcaster.client_count(), 0);
    }
}
