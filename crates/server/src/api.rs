//! HTTP surface of the chat widget and the admin dashboard.
//!
//! Public routes are `GET /api/` and `POST /api/chat`. Everything under
//! `/api/leads`, `/api/stats`, `/api/sms` and `/api/email` is admin-only and
//! sits behind the bearer token when one is configured.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header::HeaderName, HeaderMap, HeaderValue, Method, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, warn};
use uuid::Uuid;

use sparky_core::audit::AuditContext;
use sparky_core::domain::lead::{Lead, LeadDraft, LeadId, LeadSlot, LeadStats, LeadStatus};
use sparky_core::domain::notification::EmailLog;
use sparky_core::errors::{ApplicationError, InterfaceError};

use crate::auth::{require_admin_token, AdminAuth};
use crate::chat::{ChatRequest, ChatResponse, ChatService};
use crate::email::EmailPreview;
use crate::leads::LeadService;

const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Clone)]
pub struct AppState {
    pub chat: Arc<ChatService>,
    pub leads: Arc<LeadService>,
    pub business_name: String,
}

/// Interface error carried to the HTTP boundary.
#[derive(Debug)]
pub struct ApiError(pub InterfaceError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            InterfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
            InterfaceError::Conflict { .. } => StatusCode::CONFLICT,
            InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!(
                event_name = "system.api.error",
                correlation_id = %self.0.correlation_id(),
                error = %self.0,
                "request failed"
            );
        }

        let body = json!({
            "detail": self.0.message(),
            "error": self.0.user_message(),
            "correlation_id": self.0.correlation_id(),
        });
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

fn api_error(correlation_id: &str, error: ApplicationError) -> ApiError {
    ApiError(error.into_interface(correlation_id))
}

fn correlation_id(headers: &HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

fn admin_context(correlation_id: &str) -> AuditContext {
    AuditContext::new(None, None, correlation_id, "admin")
}

pub fn router(state: AppState, auth: AdminAuth, cors_origins: &[String]) -> Router {
    let admin = Router::new()
        .route("/api/leads", get(list_leads).post(create_lead))
        .route("/api/leads/{id}", delete(delete_lead))
        .route("/api/leads/{id}/status", patch(update_lead_status))
        .route("/api/stats", get(stats))
        .route("/api/sms/send", post(send_sms))
        .route("/api/email/send-quote", post(send_quote_email))
        .route("/api/email/send-review-request", post(send_review_request))
        .route("/api/email/preview/{id}", get(preview_emails))
        .route("/api/email/logs", get(email_logs))
        .route_layer(middleware::from_fn_with_state(auth, require_admin_token));

    Router::new()
        .route("/api/", get(root))
        .route("/api/chat", post(chat))
        .merge(admin)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(cors_origins))
}

fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let methods = [Method::GET, Method::POST, Method::PATCH, Method::DELETE, Method::OPTIONS];

    if origins.iter().any(|origin| origin.trim() == "*") {
        return CorsLayer::new().allow_origin(Any).allow_methods(methods).allow_headers(Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            origin.trim().parse::<HeaderValue>().ok().or_else(|| {
                warn!(event_name = "system.cors.invalid_origin", origin = %origin, "ignoring CORS origin");
                None
            })
        })
        .collect();

    CorsLayer::new()
        .allow_origin(parsed)
        .allow_methods(methods)
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            HeaderName::from_static(REQUEST_ID_HEADER),
        ])
        .allow_credentials(true)
}

// ---------------------------------------------------------------------------
// Public handlers
// ---------------------------------------------------------------------------

async fn root(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "message": format!("{} Chatbot API", state.business_name),
        "status": "online",
    }))
}

async fn chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ChatRequest>,
) -> Response {
    let correlation_id = correlation_id(&headers);

    if request.message.trim().is_empty() || request.session_id.trim().is_empty() {
        return ApiError(InterfaceError::BadRequest {
            message: "message and session_id must not be empty".to_string(),
            correlation_id,
        })
        .into_response();
    }

    match state.chat.handle(&request, &correlation_id).await {
        Ok(response) => Json(response).into_response(),
        Err(error) => {
            error!(
                event_name = "chat.turn.failed",
                correlation_id = %correlation_id,
                session_id = %request.session_id,
                error = %error,
                "chat turn failed; returning fallback reply"
            );
            let fallback: ChatResponse = state.chat.fallback();
            (StatusCode::SERVICE_UNAVAILABLE, Json(fallback)).into_response()
        }
    }
}

// ---------------------------------------------------------------------------
// Admin handlers
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct LeadCreate {
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub suburb: Option<String>,
    pub job_description: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct LeadQuery {
    pub lead_id: String,
}

#[derive(Debug, Deserialize)]
pub struct LogQuery {
    pub lead_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StatusUpdated {
    pub message: &'static str,
    pub status: LeadStatus,
    pub lead: Lead,
}

#[derive(Debug, Serialize)]
pub struct SmsSent {
    pub message: &'static str,
    pub lead_id: LeadId,
    pub sms_sent: bool,
}

#[derive(Debug, Serialize)]
pub struct EmailSent {
    pub message: &'static str,
    pub lead_id: LeadId,
    pub email: EmailLog,
}

async fn list_leads(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Vec<Lead>> {
    let correlation_id = correlation_id(&headers);
    state.leads.list().await.map(Json).map_err(|error| api_error(&correlation_id, error))
}

async fn create_lead(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<LeadCreate>,
) -> ApiResult<Lead> {
    let correlation_id = correlation_id(&headers);
    let mut draft = LeadDraft::default();
    draft.fill(LeadSlot::Name, body.name);
    draft.fill(LeadSlot::Phone, body.phone);
    if let Some(suburb) = body.suburb {
        draft.fill(LeadSlot::Suburb, suburb);
    }
    draft.fill(LeadSlot::JobDescription, body.job_description);

    state
        .leads
        .create(&draft, &admin_context(&correlation_id))
        .await
        .map(Json)
        .map_err(|error| api_error(&correlation_id, error))
}

async fn update_lead_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(query): Query<StatusQuery>,
) -> ApiResult<StatusUpdated> {
    let correlation_id = correlation_id(&headers);
    let status = query
        .status
        .parse::<LeadStatus>()
        .map_err(|error| api_error(&correlation_id, error.into()))?;

    let lead = state
        .leads
        .update_status(&LeadId(id), status, &admin_context(&correlation_id))
        .await
        .map_err(|error| api_error(&correlation_id, error))?;
    Ok(Json(StatusUpdated { message: "Status updated", status: lead.status, lead }))
}

async fn delete_lead(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<serde_json::Value> {
    let correlation_id = correlation_id(&headers);
    state
        .leads
        .delete(&LeadId(id), &admin_context(&correlation_id))
        .await
        .map_err(|error| api_error(&correlation_id, error))?;
    Ok(Json(json!({ "message": "Lead deleted" })))
}

async fn stats(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<LeadStats> {
    let correlation_id = correlation_id(&headers);
    state.leads.stats().await.map(Json).map_err(|error| api_error(&correlation_id, error))
}

async fn send_sms(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<LeadQuery>,
) -> ApiResult<SmsSent> {
    let correlation_id = correlation_id(&headers);
    let lead = state
        .leads
        .send_sms(&LeadId(query.lead_id), &admin_context(&correlation_id))
        .await
        .map_err(|error| api_error(&correlation_id, error))?;
    Ok(Json(SmsSent {
        message: "SMS notification simulated",
        lead_id: lead.id,
        sms_sent: lead.sms_sent,
    }))
}

async fn send_quote_email(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<LeadQuery>,
) -> ApiResult<EmailSent> {
    let correlation_id = correlation_id(&headers);
    let email = state
        .leads
        .send_quote_email(&LeadId(query.lead_id), &admin_context(&correlation_id))
        .await
        .map_err(|error| api_error(&correlation_id, error))?;
    Ok(Json(EmailSent { message: "Quote email sent", lead_id: email.lead_id.clone(), email }))
}

async fn send_review_request(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<LeadQuery>,
) -> ApiResult<EmailSent> {
    let correlation_id = correlation_id(&headers);
    let email = state
        .leads
        .send_review_request(&LeadId(query.lead_id), &admin_context(&correlation_id))
        .await
        .map_err(|error| api_error(&correlation_id, error))?;
    Ok(Json(EmailSent {
        message: "Review request email sent",
        lead_id: email.lead_id.clone(),
        email,
    }))
}

async fn preview_emails(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<EmailPreview> {
    let correlation_id = correlation_id(&headers);
    state.leads.preview_emails(&LeadId(id)).await.map(Json).map_err(|error| api_error(&correlation_id, error))
}

async fn email_logs(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<LogQuery>,
) -> ApiResult<Vec<EmailLog>> {
    let correlation_id = correlation_id(&headers);
    let lead_id = query.lead_id.filter(|id| !id.trim().is_empty()).map(LeadId);
    state.leads.email_logs(lead_id.as_ref()).await.map(Json).map_err(|error| api_error(&correlation_id, error))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
        Router,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use sparky_agent::AgentRuntime;
    use sparky_core::config::AdminConfig;
    use sparky_db::repositories::{InMemoryAuditRepository, InMemoryChatSessionRepository};

    use super::{router, AppState};
    use crate::auth::AdminAuth;
    use crate::chat::ChatService;
    use crate::leads::tests::in_memory_service;
    use crate::notify::SimulatedNotifier;

    fn app(admin: AdminConfig) -> Router {
        let leads = Arc::new(in_memory_service(Arc::new(SimulatedNotifier)));
        let chat = Arc::new(ChatService::new(
            AgentRuntime::default(),
            Arc::new(InMemoryChatSessionRepository::default()),
            leads.clone(),
            Arc::new(InMemoryAuditRepository::default()),
        ));
        let state = AppState { chat, leads, business_name: "Add Power Electrics".to_string() };
        router(state, AdminAuth::from_config(&admin), &["*".to_string()])
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        send_with_token(app, method, uri, body, None).await
    }

    async fn send_with_token(
        app: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .expect("request"),
            None => builder.body(Body::empty()).expect("request"),
        };

        let response = app.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, value)
    }

    fn chat_body(message: &str) -> Option<Value> {
        Some(serde_json::json!({ "message": message, "session_id": "api-session" }))
    }

    #[tokio::test]
    async fn root_reports_online() {
        let app = app(AdminConfig::default());
        let (status, body) = send(&app, Method::GET, "/api/", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "online");
    }

    #[tokio::test]
    async fn chat_flow_creates_lead_visible_to_admin_routes() {
        let app = app(AdminConfig::default());

        let (status, first) = send(&app, Method::POST, "/api/chat", chat_body("My name is Sam")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["action"], "collect_phone");
        assert_eq!(first["state"], "COLLECTING_PHONE");

        send(&app, Method::POST, "/api/chat", chat_body("0412 345 678")).await;
        let (_, last) = send(
            &app,
            Method::POST,
            "/api/chat",
            chat_body("Clyde North, fix a broken switchboard"),
        )
        .await;
        assert_eq!(last["action"], "lead_saved");
        assert_eq!(last["state"], "COMPLETE");

        let (status, leads) = send(&app, Method::GET, "/api/leads", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(leads.as_array().map(Vec::len), Some(1));
        assert_eq!(leads[0]["name"], "Sam");
        assert_eq!(leads[0]["status"], "new");
        assert_eq!(leads[0]["email_sent"], true);

        let (_, stats) = send(&app, Method::GET, "/api/stats", None).await;
        assert_eq!(stats["total_leads"], 1);
        assert_eq!(stats["new_leads"], 1);

        let (_, logs) = send(&app, Method::GET, "/api/email/logs", None).await;
        assert_eq!(logs[0]["kind"], "confirmation");
    }

    #[tokio::test]
    async fn empty_chat_message_is_rejected() {
        let app = app(AdminConfig::default());
        let (status, body) = send(&app, Method::POST, "/api/chat", chat_body("   ")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["correlation_id"].is_string());
    }

    #[tokio::test]
    async fn admin_lead_lifecycle_over_http() {
        let app = app(AdminConfig::default());
        let (status, lead) = send(
            &app,
            Method::POST,
            "/api/leads",
            Some(serde_json::json!({
                "name": "Priya",
                "phone": "03 9876 5432",
                "job_description": "install downlights"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let id = lead["id"].as_str().expect("lead id").to_string();
        assert_eq!(lead["phone"], "0398765432");

        let (status, _) = send(&app, Method::POST, &format!("/api/sms/send?lead_id={id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) =
            send(&app, Method::POST, &format!("/api/sms/send?lead_id={id}"), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["detail"].as_str().is_some_and(|detail| detail.contains("already sent")));

        let (status, _) = send(
            &app,
            Method::POST,
            &format!("/api/email/send-review-request?lead_id={id}"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, updated) = send(
            &app,
            Method::PATCH,
            &format!("/api/leads/{id}/status?status=completed"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["status"], "completed");

        let (status, backwards) =
            send(&app, Method::PATCH, &format!("/api/leads/{id}/status?status=new"), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(backwards["detail"].is_string());

        let (status, invalid) =
            send(&app, Method::PATCH, &format!("/api/leads/{id}/status?status=done"), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(invalid["detail"].as_str().is_some_and(|detail| detail.contains("done")));

        let (status, review) = send(
            &app,
            Method::POST,
            &format!("/api/email/send-review-request?lead_id={id}"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(review["email"]["kind"], "review_request");

        let (status, preview) =
            send(&app, Method::GET, &format!("/api/email/preview/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(preview["quote"]["body"].as_str().is_some_and(|body| body.contains("Priya")));

        let (status, _) = send(&app, Method::DELETE, &format!("/api/leads/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = send(&app, Method::DELETE, &format!("/api/leads/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "Lead not found");
    }

    #[tokio::test]
    async fn unknown_lead_status_update_is_not_found() {
        let app = app(AdminConfig::default());
        let (status, body) =
            send(&app, Method::PATCH, "/api/leads/nope/status?status=booked", None).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "Lead not found");
    }

    #[tokio::test]
    async fn admin_routes_require_configured_token() {
        let app = app(AdminConfig { api_token: Some("s3cret".to_string().into()) });

        let (status, _) = send(&app, Method::GET, "/api/leads", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) =
            send_with_token(&app, Method::GET, "/api/leads", None, Some("wrong")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) =
            send_with_token(&app, Method::GET, "/api/leads", None, Some("s3cret")).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(&app, Method::POST, "/api/chat", chat_body("hello")).await;
        assert_eq!(status, StatusCode::OK);
    }
}
