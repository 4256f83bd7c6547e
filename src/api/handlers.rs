use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::auth::{AdminUser, AuthError, AuthVerifier, AuthenticatedUser};
use super::presenter::AlertResponse;
use crate::alerts::{AlertService, AlertServiceError, CreateAlertCommand};
use crate::broadcast::{Broadcaster, ClientStream};

/// Application state shared across handlers
pub struct AppState {
    pub service: Arc<AlertService>,
    pub broadcaster: Arc<Broadcaster>,
    pub auth: Arc<dyn AuthVerifier>,
}

/// Success envelope used by every JSON endpoint
#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    fn data(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
        })
    }
}

impl ApiResponse<()> {
    fn ok() -> Json<Self> {
        Json(Self {
            success: true,
            data: None,
        })
    }
}

// ============================================================================
// Health Check
// ============================================================================

pub async fn health_check() -> &'static str {
    "OK"
}

// ============================================================================
// Internal: alert creation
// ============================================================================

/// Field-by-field reader over a JSON request body.
///
/// Every problem is collected under the offending field's name, so one
/// response reports all of them.
struct BodyFields<'a> {
    body: &'a Map<String, Value>,
    errors: BTreeMap<String, String>,
}

impl<'a> BodyFields<'a> {
    fn new(body: &'a Value) -> Result<Self, ApiError> {
        match body {
            Value::Object(body) => Ok(Self {
                body,
                errors: BTreeMap::new(),
            }),
            other => {
                let mut errors = BTreeMap::new();
                errors.insert("body".to_string(), expected("object", other));
                Err(ApiError::Validation(errors))
            }
        }
    }

    fn reject(&mut self, field: &str, message: String) {
        self.errors.insert(field.to_string(), message);
    }

    fn required_string(&mut self, field: &str) -> Option<String> {
        match self.body.get(field) {
            None => self.reject(field, "Required".to_string()),
            Some(Value::String(s)) if s.is_empty() => {
                self.reject(field, "String must contain at least 1 character(s)".to_string())
            }
            Some(Value::String(s)) => return Some(s.clone()),
            Some(other) => self.reject(field, expected("string", other)),
        }
        None
    }

    fn optional_string(&mut self, field: &str) -> Option<String> {
        match self.body.get(field) {
            None => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => {
                self.reject(field, expected("string", other));
                None
            }
        }
    }

    fn number(&mut self, field: &str) -> Option<f64> {
        match self.body.get(field) {
            None => self.reject(field, "Required".to_string()),
            Some(Value::Number(n)) => match n.as_f64() {
                Some(n) => return Some(n),
                None => self.reject(field, "Expected number, received bigint".to_string()),
            },
            Some(other) => self.reject(field, expected("number", other)),
        }
        None
    }

    fn boolean(&mut self, field: &str) -> Option<bool> {
        match self.body.get(field) {
            None => self.reject(field, "Required".to_string()),
            Some(Value::Bool(b)) => return Some(*b),
            Some(other) => self.reject(field, expected("boolean", other)),
        }
        None
    }

    fn finish(self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(self.errors))
        }
    }
}

fn expected(kind: &str, received: &Value) -> String {
    let received = match received {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    };
    format!("Expected {}, received {}", kind, received)
}

/// Validate a create-alert body into a command
fn create_command(body: &Value) -> Result<CreateAlertCommand, ApiError> {
    let mut fields = BodyFields::new(body)?;

    let threshold_id = fields.required_string("thresholdId");
    let threshold_name = fields.required_string("thresholdName");
    let utility_type = fields.required_string("utilityType");
    let threshold_type = fields.required_string("thresholdType");
    let period_type = fields.optional_string("periodType");
    let limit_value = fields.number("limitValue");
    let detected_value = fields.number("detectedValue");

    fields.finish()?;

    // Every required field is present once no errors were recorded
    Ok(CreateAlertCommand {
        threshold_id: threshold_id.unwrap_or_default(),
        threshold_name: threshold_name.unwrap_or_default(),
        utility_type: utility_type.unwrap_or_default(),
        threshold_type: threshold_type.unwrap_or_default(),
        period_type,
        limit_value: limit_value.unwrap_or_default(),
        detected_value: detected_value.unwrap_or_default(),
    })
}

#[derive(Serialize)]
pub struct CreatedAlert {
    pub id: String,
}

pub async fn create_alert(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = payload?;
    let command = create_command(&body)?;

    let id = state.service.create_and_send(command).await?;

    Ok((
        StatusCode::CREATED,
        ApiResponse::data(CreatedAlert { id: id.to_string() }),
    ))
}

// ============================================================================
// Public: queries
// ============================================================================

pub async fn list_alerts(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
) -> Result<Json<ApiResponse<Vec<AlertResponse>>>, ApiError> {
    let alerts = state.service.get_all().await?;
    Ok(ApiResponse::data(
        alerts.iter().map(AlertResponse::from).collect(),
    ))
}

pub async fn get_alert(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<AlertResponse>>, ApiError> {
    let alert = state.service.get_by_id(&id).await?;
    Ok(ApiResponse::data(AlertResponse::from(&alert)))
}

#[derive(Serialize)]
pub struct UnreadCount {
    pub count: u64,
}

pub async fn unread_count(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
) -> Result<Json<ApiResponse<UnreadCount>>, ApiError> {
    let count = state.service.get_unread_count().await?;
    Ok(ApiResponse::data(UnreadCount { count }))
}

/// Attach the caller to the live alert stream
pub async fn stream_alerts(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
) -> ClientStream {
    state.broadcaster.add_client()
}

// ============================================================================
// Public: mutations
// ============================================================================

pub async fn update_read_state(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(body) = payload?;
    let mut fields = BodyFields::new(&body)?;
    let read = fields.boolean("read");
    fields.finish()?;

    if read == Some(true) {
        state.service.mark_as_read(&id).await?;
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_alert(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.service.delete_one(&id).await?;
    Ok(ApiResponse::ok())
}

pub async fn delete_all_alerts(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.service.delete_all().await?;
    Ok(ApiResponse::ok())
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Validation(BTreeMap<String, String>),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    Internal(String),
}

impl From<AlertServiceError> for ApiError {
    fn from(err: AlertServiceError) -> Self {
        match err {
            AlertServiceError::Domain(e) => ApiError::BadRequest(e.to_string()),
            AlertServiceError::NotFound(_) => ApiError::NotFound(err.to_string()),
            AlertServiceError::Repository(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingToken | AuthError::Rejected => ApiError::Unauthorized(err.to_string()),
            AuthError::Forbidden => ApiError::Forbidden(err.to_string()),
            AuthError::Service(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let mut errors = BTreeMap::new();
        errors.insert("body".to_string(), rejection.body_text());
        ApiError::Validation(errors)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, code, message, errors) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg, BTreeMap::new()),
            ApiError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                "Invalid request payload".to_string(),
                errors,
            ),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg, BTreeMap::new()),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg, BTreeMap::new()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "RESOURCE_NOT_FOUND", msg, BTreeMap::new()),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "Unhandled error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal Server Error".to_string(),
                    BTreeMap::new(),
                )
            }
        };

        let body = serde_json::json!({
            "code": code,
            "message": message,
            "errors": errors,
        });

        (status, Json(body)).into_response()
    }
}
