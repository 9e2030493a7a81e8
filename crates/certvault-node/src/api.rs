//! HTTP API for the CertVault node.
//!
//! Exposes the auth, certificate, share-link, and verification endpoints.
//! Service errors map to stable machine-readable codes; verification
//! endpoints answer 200 with a structured negative report rather than an
//! error status for not-found or revoked certificates.

use axum::{
    extract::{Json, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use certvault_core::{CertificateContent, Role, User};
use certvault_service::{
    CertificateIssuer, IssueRequest, ServiceError, ShareLinkManager, VerificationEngine,
    VerifyRequest,
};
use certvault_store::{StoreError, UserDirectory};

use crate::auth::{self, AuthError};

/// Shared state behind every handler.
pub struct AppState {
    pub directory: Arc<UserDirectory>,
    pub issuer: Arc<CertificateIssuer>,
    pub shares: Arc<ShareLinkManager>,
    pub engine: Arc<VerificationEngine>,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
}

// --- Error mapping ---

/// API-level error: a status code plus a stable machine code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    fn unauthenticated(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            "AUTHENTICATION_REQUIRED",
            message,
        )
    }

    fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, axum::Json(body)).into_response()
    }
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::Validation(msg) => Self::validation(msg),
            ServiceError::Forbidden(msg) => Self::new(StatusCode::FORBIDDEN, "FORBIDDEN", msg),
            ServiceError::NotFound(msg) => Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ServiceError::LinkExpired => Self::new(
                StatusCode::GONE,
                "LINK_EXPIRED",
                "share link has expired",
            ),
            ServiceError::LinkRevoked => Self::new(
                StatusCode::GONE,
                "LINK_REVOKED",
                "share link has been revoked",
            ),
            ServiceError::Conflict(msg) => Self::new(StatusCode::CONFLICT, "CONFLICT", msg),
            ServiceError::Internal(msg) => {
                tracing::error!(error = %msg, "internal service error");
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "internal error",
                )
            }
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        ServiceError::from(e).into()
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidToken => {
                Self::new(StatusCode::UNAUTHORIZED, "INVALID_TOKEN", e.to_string())
            }
            AuthError::Hashing(msg) => {
                tracing::error!(error = %msg, "password hashing failure");
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "internal error",
                )
            }
        }
    }
}

// --- Authentication helpers ---

/// Resolve the caller from the `Authorization` header; error when absent
/// or invalid. Authentication failures (401) are distinct from capability
/// failures (403), which the services raise.
fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<User, ApiError> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::unauthenticated("missing Authorization header"))?;

    let token = auth::bearer_token(header)
        .ok_or_else(|| ApiError::unauthenticated("expected a bearer token"))?;

    let claims = auth::decode_token(&state.jwt_secret, token)?;

    let stored = state.directory.get(&claims.sub).map_err(|_| {
        ApiError::new(
            StatusCode::UNAUTHORIZED,
            "INVALID_TOKEN",
            "token subject no longer exists",
        )
    })?;
    Ok(stored.user)
}

/// Resolve the caller when a token is present; anonymous otherwise. A
/// present-but-invalid token is still an authentication error.
fn authenticate_optional(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<Option<User>, ApiError> {
    if headers.get(axum::http::header::AUTHORIZATION).is_none() {
        return Ok(None);
    }
    authenticate(state, headers).map(Some)
}

// --- Request/response types ---

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub access_token: String,
    pub user: User,
}

#[derive(Serialize)]
pub struct MeResponse {
    pub user: User,
}

#[derive(Serialize)]
pub struct UsersResponse {
    pub users: Vec<User>,
}

#[derive(Deserialize)]
pub struct ShareRequest {
    #[serde(default = "default_share_days")]
    pub expires_in_days: i64,
}

fn default_share_days() -> i64 {
    7
}

#[derive(Serialize)]
pub struct ShareLinkBody {
    pub link_token: String,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Serialize)]
pub struct ShareResponse {
    pub share_link: ShareLinkBody,
    pub share_url: String,
}

#[derive(Deserialize)]
pub struct VerifyBody {
    pub certificate_id: Option<String>,
    pub certificate_hash: Option<String>,
    pub content: Option<CertificateContent>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

// --- Handlers ---

async fn handle_health() -> axum::Json<HealthResponse> {
    axum::Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn handle_register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<Response, ApiError> {
    if req.username.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::validation("username and password are required"));
    }
    let role = Role::parse(&req.role)
        .map_err(|_| ApiError::validation(format!("invalid role '{}'", req.role)))?;

    let password_hash = auth::hash_password(&req.password)?;
    let user = state
        .directory
        .create_user(req.username.trim(), req.email.trim(), role, &password_hash)?;

    let access_token = auth::issue_token(&state.jwt_secret, &user, state.token_ttl_hours)?;
    Ok((
        StatusCode::CREATED,
        axum::Json(SessionResponse { access_token, user }),
    )
        .into_response())
}

async fn handle_login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<axum::Json<SessionResponse>, ApiError> {
    let stored = state.directory.get_by_username(&req.username).map_err(|_| {
        ApiError::unauthenticated("invalid username or password")
    })?;

    if !auth::verify_password(&req.password, &stored.password_hash) {
        return Err(ApiError::unauthenticated("invalid username or password"));
    }

    let access_token =
        auth::issue_token(&state.jwt_secret, &stored.user, state.token_ttl_hours)?;
    tracing::info!(user_id = %stored.user.id, "user logged in");
    Ok(axum::Json(SessionResponse {
        access_token,
        user: stored.user,
    }))
}

async fn handle_me(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<axum::Json<MeResponse>, ApiError> {
    let user = authenticate(&state, &headers)?;
    Ok(axum::Json(MeResponse { user }))
}

async fn handle_list_users(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<axum::Json<UsersResponse>, ApiError> {
    let caller = authenticate(&state, &headers)?;
    if caller.role != Role::Issuer {
        return Err(ApiError::new(
            StatusCode::FORBIDDEN,
            "FORBIDDEN",
            "only issuers can list users",
        ));
    }
    let users = state.directory.list()?;
    Ok(axum::Json(UsersResponse { users }))
}

async fn handle_issue(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<IssueRequest>,
) -> Result<Response, ApiError> {
    let caller = authenticate(&state, &headers)?;
    let cert = state.issuer.issue(&caller, req).await?;
    Ok((
        StatusCode::CREATED,
        axum::Json(serde_json::json!({ "certificate": cert })),
    )
        .into_response())
}

async fn handle_my_certificates(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<axum::Json<serde_json::Value>, ApiError> {
    let caller = authenticate(&state, &headers)?;
    let certs = state.issuer.list_owned(&caller)?;
    Ok(axum::Json(serde_json::json!({ "certificates": certs })))
}

async fn handle_issued_certificates(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<axum::Json<serde_json::Value>, ApiError> {
    let caller = authenticate(&state, &headers)?;
    let certs = state.issuer.list_issued(&caller)?;
    Ok(axum::Json(serde_json::json!({ "certificates": certs })))
}

async fn handle_get_certificate(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(certificate_id): Path<String>,
) -> Result<axum::Json<serde_json::Value>, ApiError> {
    let caller = authenticate_optional(&state, &headers)?;
    let view = state.issuer.view(caller.as_ref(), &certificate_id)?;
    Ok(axum::Json(serde_json::json!({ "certificate": view })))
}

async fn handle_shared_certificate(
    State(state): State<Arc<AppState>>,
    Path(link_token): Path<String>,
) -> Result<axum::Json<serde_json::Value>, ApiError> {
    // A valid link grants the direct certificate view, scoped to exactly
    // this record.
    let (link, cert) = state.shares.resolve(&link_token)?;
    Ok(axum::Json(serde_json::json!({
        "certificate": cert,
        "share_link": ShareLinkBody {
            link_token: link.link_token,
            expires_at: link.expires_at,
        },
    })))
}

async fn handle_create_share(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(certificate_id): Path<String>,
    Json(req): Json<ShareRequest>,
) -> Result<Response, ApiError> {
    let caller = authenticate(&state, &headers)?;
    let link = state
        .shares
        .issue(&caller, &certificate_id, req.expires_in_days)?;

    let share_url = format!("/verify/share/{}", link.link_token);
    Ok((
        StatusCode::CREATED,
        axum::Json(ShareResponse {
            share_link: ShareLinkBody {
                link_token: link.link_token,
                expires_at: link.expires_at,
            },
            share_url,
        }),
    )
        .into_response())
}

async fn handle_revoke(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(certificate_id): Path<String>,
) -> Result<axum::Json<serde_json::Value>, ApiError> {
    let caller = authenticate(&state, &headers)?;
    let cert = state.issuer.revoke(&caller, &certificate_id).await?;
    Ok(axum::Json(serde_json::json!({ "certificate": cert })))
}

async fn handle_verify(
    State(state): State<Arc<AppState>>,
    Json(body): Json<VerifyBody>,
) -> Result<axum::Json<serde_json::Value>, ApiError> {
    let request = match (body.certificate_id, body.certificate_hash, body.content) {
        (Some(id), None, None) => VerifyRequest::ById(id),
        (None, Some(hash), None) => VerifyRequest::ByHash(hash),
        (None, None, Some(content)) => VerifyRequest::ByContent(content),
        _ => {
            return Err(ApiError::validation(
                "provide exactly one of certificate_id, certificate_hash, or content",
            ))
        }
    };

    let report = state.engine.verify(request)?;
    Ok(axum::Json(serde_json::json!({
        "verified": report.verified,
        "message": report.message,
        "certificate": report.certificate,
        "blockchain_verified": report.blockchain_verified,
    })))
}

// --- Router ---

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(handle_health))
        .route("/api/auth/register", post(handle_register))
        .route("/api/auth/login", post(handle_login))
        .route("/api/auth/me", get(handle_me))
        .route("/api/auth/users", get(handle_list_users))
        .route("/api/certificates/issue", post(handle_issue))
        .route(
            "/api/certificates/my-certificates",
            get(handle_my_certificates),
        )
        .route("/api/certificates/issued", get(handle_issued_certificates))
        .route(
            "/api/certificates/share/{link_token}",
            get(handle_shared_certificate),
        )
        .route("/api/certificates/verify", post(handle_verify))
        .route("/api/certificates/{id}", get(handle_get_certificate))
        .route("/api/certificates/{id}/share", post(handle_create_share))
        .route("/api/certificates/{id}/revoke", post(handle_revoke))
        .with_state(state)
}

pub async fn start_api_server(
    listen_addr: std::net::SocketAddr,
    state: Arc<AppState>,
) -> anyhow::Result<()> {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    tracing::info!(%listen_addr, "HTTP API server started");
    axum::serve(listener, app).await?;
    Ok(())
}
