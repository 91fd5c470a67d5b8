//! # Registra HTTP API Module
//!
//! This module implements the HTTP REST API server using axum.
//!
//! ## Endpoints
//!
//! - `GET  /health` - Health check
//! - `GET  /status` - Registry counts and window state
//! - `POST /users` - Create a user (Admin)
//! - `POST /users/role` - Reassign a role (Admin)
//! - `POST /subjects` - Create a subject (Admin or Faculty)
//! - `GET  /subjects` - List the catalog
//! - `POST /register` - Register a batch of subjects (Student)
//! - `POST /window` - Open/close the registration window (Admin)
//! - `GET  /timetable/{user_id}?view=student|faculty` - Derived grid
//! - `POST /attendance` - Mark one session (assigned Faculty)
//! - `GET  /attendance/{enrollment_id}` - Summary plus session records
//! - `GET  /attendance/student/{user_id}` - Per-subject listing
//! - `POST /grades/submit` - Submit/update a draft score
//! - `POST /grades/finalize` - Finalize a draft grade
//! - `POST /grades/reeval/request` - Contest a finalized grade
//! - `POST /grades/reeval/resolve` - Approve/deny (Admin)
//! - `POST /grades/reeval/apply` - Apply the revised score
//! - `GET  /grades/{student_id}?viewer_role=...` - Filtered grade views
//! - `GET  /audit/{enrollment_id}` - Score revision log
//!
//! ## Security Configuration (Environment Variables)
//!
//! - `REGISTRA_CORS_ORIGINS`: Comma-separated list of allowed origins, or "*" for all (default: localhost only)
//! - `REGISTRA_RATE_LIMIT`: Requests per second (default: 100, 0 to disable)
//! - `REGISTRA_API_KEY`: If set, requires Bearer token authentication

mod auth;
mod handlers;
mod middleware;
mod types;

// Re-exports for external use
pub use auth::get_api_key_from_env;
pub use middleware::{create_rate_limiter, get_rate_limit_from_env};
// Re-export handlers and types for integration tests (via `registra::api::*`)
#[allow(unused_imports)]
pub use handlers::{
    apply_reeval_handler, assign_role_handler, attendance_summary_handler, audit_handler,
    create_subject_handler, create_user_handler, finalize_grade_handler, grades_handler,
    health_handler, list_subjects_handler, mark_attendance_handler, register_handler,
    request_reeval_handler, resolve_reeval_handler, status_handler, student_attendance_handler,
    submit_grade_handler, timetable_handler, window_handler,
};
#[allow(unused_imports)]
pub use types::{
    AssignRoleRequest, AttendanceRecordJson, AttendanceResponse, AuditResponse, CallerJson,
    CreateSubjectRequest, CreateSubjectResponse, CreateUserRequest, CreateUserResponse,
    ErrorResponse, GradeActionRequest, GradeScoreRequest, GradeStatusResponse, GradeViewJson,
    GradesResponse, HealthResponse, MarkAttendanceRequest, ReevalResolveRequest, RegisterRequest,
    RegisterResponse, RejectedSubjectJson, ScoreRevisionJson, StatusResponse, StudentAttendanceJson,
    StudentAttendanceResponse, SubjectJson, TimetableCellJson, TimetableResponse, WindowRequest,
    error_status,
};

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, post},
};
use registra_core::{Registry, RegistryError};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state containing the registry.
#[derive(Clone)]
pub struct AppState {
    /// The academic-state aggregate behind a reader/writer lock.
    pub registry: Arc<RwLock<Registry>>,
}

impl AppState {
    /// Create new app state with a registry.
    #[must_use]
    pub fn new(registry: Registry) -> Self {
        Self {
            registry: Arc::new(RwLock::new(registry)),
        }
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

/// Build CORS layer from environment configuration.
///
/// Reads `REGISTRA_CORS_ORIGINS` environment variable:
/// - If "*": allows all origins (development mode - use with caution!)
/// - If not set: defaults to localhost only (restrictive default)
/// - Otherwise: parses comma-separated list of allowed origins
fn build_cors_layer() -> CorsLayer {
    let origins_env = std::env::var("REGISTRA_CORS_ORIGINS").ok();

    match origins_env.as_deref() {
        Some("*") => {
            tracing::warn!(
                "CORS: Allowing ALL origins (REGISTRA_CORS_ORIGINS=*). This is insecure for production!"
            );
            CorsLayer::permissive()
        }
        Some(origins) => {
            // Parse comma-separated origins
            let allowed_origins: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|s| {
                    let trimmed = s.trim();
                    match trimmed.parse::<HeaderValue>() {
                        Ok(hv) => {
                            tracing::info!("CORS: Allowing origin: {}", trimmed);
                            Some(hv)
                        }
                        Err(e) => {
                            tracing::warn!("CORS: Invalid origin '{}': {}", trimmed, e);
                            None
                        }
                    }
                })
                .collect();

            if allowed_origins.is_empty() {
                tracing::warn!(
                    "CORS: No valid origins in REGISTRA_CORS_ORIGINS, defaulting to localhost only"
                );
                build_localhost_cors()
            } else {
                CorsLayer::new()
                    .allow_origin(allowed_origins)
                    .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                    .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            }
        }
        None => {
            tracing::info!("CORS: No REGISTRA_CORS_ORIGINS set, defaulting to localhost only");
            build_localhost_cors()
        }
    }
}

/// Build a restrictive CORS layer that only allows localhost origins.
fn build_localhost_cors() -> CorsLayer {
    let localhost_origins = vec![
        "http://localhost:3000".parse::<HeaderValue>().ok(),
        "http://localhost:8080".parse::<HeaderValue>().ok(),
        "http://127.0.0.1:3000".parse::<HeaderValue>().ok(),
        "http://127.0.0.1:8080".parse::<HeaderValue>().ok(),
    ];
    let origins: Vec<HeaderValue> = localhost_origins.into_iter().flatten().collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner):
/// 1. CORS - handles preflight requests
/// 2. Tracing - logs all requests
/// 3. Rate Limiting - protects against DoS (if enabled)
/// 4. Authentication - validates API key (if configured)
pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer();

    // Check if rate limiting is enabled
    let rate_limit = get_rate_limit_from_env();
    let rate_limiter = if rate_limit > 0 {
        tracing::info!("Rate limiting enabled: {} requests/second", rate_limit);
        Some(create_rate_limiter(rate_limit))
    } else {
        tracing::info!("Rate limiting disabled");
        None
    };

    // Check if authentication is enabled
    let has_auth = get_api_key_from_env().is_some();
    if has_auth {
        tracing::info!("API key authentication enabled");
    } else {
        tracing::warn!(
            "API key authentication DISABLED - all endpoints are publicly accessible! \
             Set REGISTRA_API_KEY environment variable to enable authentication."
        );
    }

    // Build base router with routes
    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/status", get(handlers::status_handler))
        .route("/users", post(handlers::create_user_handler))
        .route("/users/role", post(handlers::assign_role_handler))
        .route(
            "/subjects",
            get(handlers::list_subjects_handler).post(handlers::create_subject_handler),
        )
        .route("/register", post(handlers::register_handler))
        .route("/window", post(handlers::window_handler))
        .route("/timetable/{user_id}", get(handlers::timetable_handler))
        .route("/attendance", post(handlers::mark_attendance_handler))
        .route(
            "/attendance/{enrollment_id}",
            get(handlers::attendance_summary_handler),
        )
        .route(
            "/attendance/student/{user_id}",
            get(handlers::student_attendance_handler),
        )
        .route("/grades/submit", post(handlers::submit_grade_handler))
        .route("/grades/finalize", post(handlers::finalize_grade_handler))
        .route(
            "/grades/reeval/request",
            post(handlers::request_reeval_handler),
        )
        .route(
            "/grades/reeval/resolve",
            post(handlers::resolve_reeval_handler),
        )
        .route("/grades/reeval/apply", post(handlers::apply_reeval_handler))
        .route("/grades/{student_id}", get(handlers::grades_handler))
        .route("/audit/{enrollment_id}", get(handlers::audit_handler));

    // Apply authentication middleware (innermost - runs last on request)
    if has_auth {
        router = router.layer(axum_middleware::from_fn(auth::api_key_auth_middleware));
    }

    // Apply rate limiting middleware
    if let Some(limiter) = rate_limiter {
        router = router.layer(axum_middleware::from_fn_with_state(
            limiter,
            middleware::rate_limit_middleware,
        ));
    }

    // Apply CORS, body limit, and tracing (outermost layers)
    router
        .layer(axum::extract::DefaultBodyLimit::max(2 * 1024 * 1024))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Start the HTTP server.
pub async fn run_server(addr: &str, registry: Registry) -> Result<(), RegistryError> {
    let state = AppState::new(registry);
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| RegistryError::Io(format!("Bind failed: {}", e)))?;

    tracing::info!("Registra HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .await
        .map_err(|e| RegistryError::Io(format!("Server error: {}", e)))
}
