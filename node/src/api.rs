//! # REST API
//!
//! Builds the axum router for the DocAuth node. All endpoints share
//! application state through axum's `State` extractor.
//!
//! ## Endpoints
//!
//! | Method | Path                    | Description                               |
//! |--------|-------------------------|-------------------------------------------|
//! | GET    | `/health`               | Liveness probe                            |
//! | GET    | `/status`               | Node status summary                       |
//! | POST   | `/identities`           | Generate an identity and keypair          |
//! | GET    | `/challenges/:identity` | Issue a challenge                         |
//! | POST   | `/assertions/sign`      | Server-side signing (opt-in, demo only)   |
//! | POST   | `/assertions/verify`    | Verify a signed assertion                 |
//! | POST   | `/documents`            | Register raw bytes (bearer session)       |
//! | POST   | `/documents/verify`     | Look up raw bytes                         |
//! | GET    | `/documents/:digest`    | Version history for a hex digest          |

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, DefaultBodyLimit, Path, State},
    http::{header::AUTHORIZATION, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use docauth_protocol::anchor::Anchor;
use docauth_protocol::auth::{
    sign_assertion, AuthError, Authenticator, Challenge, SignedAssertion,
};
use docauth_protocol::crypto::hash::ContentDigest;
use docauth_protocol::crypto::keys::IdentityKeypair;
use docauth_protocol::identity::{GeneratedIdentity, GeneratedIdentityExport, Identity};
use docauth_protocol::ledger::{DocumentLedger, DocumentRecord, LedgerError};
use docauth_protocol::resolver::KeyRegistry;

use crate::metrics::SharedMetrics;
use crate::session::SessionStore;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
///
/// Cheap to clone: everything behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The node's reported version string.
    pub version: String,
    pub auth: Arc<Authenticator>,
    pub ledger: Arc<DocumentLedger>,
    /// Keys for identities this node generated.
    pub registry: Arc<KeyRegistry>,
    pub anchor: Arc<dyn Anchor>,
    /// Bearer sessions minted by successful verifications.
    pub sessions: Arc<SessionStore>,
    pub metrics: SharedMetrics,
    /// Whether `POST /assertions/sign` is enabled.
    pub allow_server_signing: bool,
    /// Request body limit, in bytes.
    pub max_document_bytes: usize,
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all API routes, CORS, and tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);
    let body_limit = DefaultBodyLimit::max(state.max_document_bytes);

    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/identities", post(create_identity_handler))
        .route("/challenges/:identity", get(issue_challenge_handler))
        .route("/assertions/sign", post(sign_assertion_handler))
        .route("/assertions/verify", post(verify_assertion_handler))
        .route("/documents", post(register_document_handler))
        .route("/documents/verify", post(verify_document_handler))
        .route("/documents/:digest", get(document_history_handler))
        .layer(body_limit)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / Response Types
// ---------------------------------------------------------------------------

/// Response payload for `GET /status`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub version: String,
    pub pending_challenges: usize,
    /// Distinct document digests.
    pub documents: usize,
    /// Document versions across all digests.
    pub records: usize,
    /// Records held in memory that the store has not yet accepted.
    pub unpersisted_records: usize,
    pub authenticated_sessions: usize,
    pub persistent: bool,
    /// RFC 3339 timestamp of the response.
    pub timestamp: String,
}

/// Response payload for `GET /challenges/:identity`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChallengeResponse {
    pub identity: String,
    /// Hex-encoded 32-byte challenge.
    pub challenge: String,
}

/// Request body for `POST /assertions/sign`.
#[derive(Debug, Serialize, Deserialize)]
pub struct SignRequest {
    pub identity: String,
    pub challenge: String,
    pub private_key: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SignResponse {
    pub assertion: SignedAssertion,
}

/// Response payload for `POST /assertions/verify`.
#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,
    /// Bearer token for `POST /documents`. Present only on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Response payload for `POST /documents/verify`.
#[derive(Debug, Serialize, Deserialize)]
pub struct LookupResponse {
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<DocumentRecord>,
}

/// Response payload for `GET /documents/:digest`.
#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub digest: String,
    pub versions: Vec<DocumentRecord>,
}

/// Generic error body returned by REST endpoints on failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, error: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
        .into_response()
}

/// HTTP status for an authentication failure.
fn auth_status(err: &AuthError) -> StatusCode {
    match err {
        AuthError::InvalidIdentity(_) | AuthError::MalformedAssertion(_) => {
            StatusCode::BAD_REQUEST
        }
        AuthError::UnknownOrExpiredChallenge
        | AuthError::ChallengeMismatch
        | AuthError::InvalidSignature => StatusCode::UNAUTHORIZED,
    }
}

fn ledger_error_response(err: LedgerError) -> Response {
    match err {
        LedgerError::MissingContent | LedgerError::InvalidIdentity(_) => {
            error_response(StatusCode::BAD_REQUEST, err.to_string())
        }
        LedgerError::Storage(e) => {
            tracing::error!(error = %e, "ledger storage error");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health`: returns 200 if the node is alive.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// `GET /status`: returns node status summary.
async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(StatusResponse {
        version: state.version.clone(),
        pending_challenges: state.auth.pending_count(),
        documents: state.ledger.document_count(),
        records: state.ledger.record_count(),
        unpersisted_records: state.ledger.unpersisted_count(),
        authenticated_sessions: state.sessions.len(),
        persistent: state.ledger.is_persistent(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// `POST /identities`: generates an identity bundle and registers its
/// public key, so the `registry` resolver accepts it.
///
/// The response carries the private key. It is shown once and not kept.
async fn create_identity_handler(State(state): State<AppState>) -> impl IntoResponse {
    let generated = GeneratedIdentity::new();
    state
        .registry
        .register(generated.identity.clone(), generated.keypair.public_key());
    tracing::info!(identity = %generated.identity, "identity generated");

    let export: GeneratedIdentityExport = generated.export();
    (StatusCode::CREATED, Json(export))
}

/// `GET /challenges/:identity`: issues a fresh challenge, superseding any
/// outstanding one for the same identity.
async fn issue_challenge_handler(
    Path(identity): Path<String>,
    State(state): State<AppState>,
) -> Response {
    match state.auth.issue_challenge(&identity) {
        Ok(challenge) => {
            state.metrics.challenges_issued_total.inc();
            state
                .metrics
                .pending_challenges
                .set(state.auth.pending_count() as i64);
            Json(ChallengeResponse {
                identity: identity.trim().to_string(),
                challenge: challenge.to_hex(),
            })
            .into_response()
        }
        Err(e) => error_response(auth_status(&e), e.to_string()),
    }
}

/// `POST /assertions/sign`: signs a challenge with a caller-supplied
/// private key.
///
/// Exists for browser demos that cannot sign locally. Disabled unless the
/// node runs with `--allow-server-signing`.
async fn sign_assertion_handler(
    State(state): State<AppState>,
    payload: Result<Json<SignRequest>, JsonRejection>,
) -> Response {
    if !state.allow_server_signing {
        return error_response(
            StatusCode::FORBIDDEN,
            "server-side signing is disabled; sign locally",
        );
    }
    let Json(req) = match payload {
        Ok(body) => body,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.body_text()),
    };

    let identity = match Identity::new(&req.identity) {
        Ok(identity) => identity,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
    };
    let challenge: Challenge = match req.challenge.parse() {
        Ok(challenge) => challenge,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, format!("{e}")),
    };
    let keypair = match IdentityKeypair::from_hex(&req.private_key) {
        Ok(keypair) => keypair,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
    };

    let assertion = sign_assertion(&keypair, &identity, &challenge);
    Json(SignResponse { assertion }).into_response()
}

/// `POST /assertions/verify`: verifies an assertion and, on success,
/// opens a session for its identity.
async fn verify_assertion_handler(
    State(state): State<AppState>,
    payload: Result<Json<SignedAssertion>, JsonRejection>,
) -> Response {
    let result = match payload {
        Ok(Json(assertion)) => {
            let timer = state.metrics.assertion_verify_seconds.start_timer();
            let result = state.auth.verify_assertion(&assertion);
            timer.observe_duration();
            result
        }
        Err(e) => Err(AuthError::MalformedAssertion(e.body_text())),
    };
    state
        .metrics
        .pending_challenges
        .set(state.auth.pending_count() as i64);

    match result {
        Ok(identity) => {
            state.metrics.assertions_verified_total.inc();
            let token = state.sessions.create(identity.clone());
            Json(VerifyResponse {
                success: true,
                identity: Some(identity.to_string()),
                session_token: Some(token.to_string()),
                error: None,
            })
            .into_response()
        }
        Err(e) => {
            state
                .metrics
                .assertion_failures_total
                .with_label_values(&[e.reason()])
                .inc();
            (
                auth_status(&e),
                Json(VerifyResponse {
                    success: false,
                    identity: None,
                    session_token: None,
                    error: Some(e.to_string()),
                }),
            )
                .into_response()
        }
    }
}

/// Session token from an `Authorization: Bearer <token>` header.
fn bearer_token(headers: &HeaderMap) -> Option<Uuid> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?;
    Uuid::parse_str(token.trim()).ok()
}

/// `POST /documents`: registers the raw request body as a new version
/// owned by the identity behind the caller's session.
async fn register_document_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(token) = bearer_token(&headers) else {
        return error_response(StatusCode::UNAUTHORIZED, "missing bearer session token");
    };
    let Some(owner) = state.sessions.authenticate(&token) else {
        return error_response(StatusCode::UNAUTHORIZED, "unknown or expired session");
    };

    let record = match state.ledger.register_document(&body, owner.as_str()) {
        Ok(record) => record,
        Err(e) => return ledger_error_response(e),
    };
    state.metrics.documents_registered_total.inc();

    match state.anchor.anchor(&record).await {
        Ok(ack) => tracing::debug!(digest = %record.digest, receipt = %ack.receipt, "anchored"),
        Err(e) => tracing::warn!(digest = %record.digest, error = %e, "anchoring failed"),
    }

    (StatusCode::CREATED, Json(record)).into_response()
}

/// `POST /documents/verify`: reports whether the raw body has been
/// registered, and its latest version.
async fn verify_document_handler(State(state): State<AppState>, body: Bytes) -> Response {
    state.metrics.document_lookups_total.inc();
    let record = state.ledger.lookup_latest(&body);
    Json(LookupResponse {
        exists: record.is_some(),
        version: record.as_ref().map(|r| r.version),
        record,
    })
    .into_response()
}

/// `GET /documents/:digest`: every version of a digest, oldest first.
async fn document_history_handler(
    Path(digest): Path<String>,
    State(state): State<AppState>,
) -> Response {
    let digest: ContentDigest = match digest.parse() {
        Ok(digest) => digest,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, format!("invalid digest: {e}")),
    };
    state.metrics.document_lookups_total.inc();

    let versions = state.ledger.history(&digest);
    if versions.is_empty() {
        return error_response(
            StatusCode::NOT_FOUND,
            format!("document not found: {digest}"),
        );
    }
    Json(HistoryResponse {
        digest: digest.to_hex(),
        versions,
    })
    .into_response()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
