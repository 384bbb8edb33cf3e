//! # API REST
//!
//! REST API implementation for the handoff broker.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON bodies, status codes, CORS)
//!
//! Uses `api-shared` for wire types and `handoff-core` for the services.

#![warn(rust_2018_idioms)]

use api_shared::{
    FileRes, HealthRes, HealthService, RegisterReq, RegisterRes, ValidateReq, ValidateRes,
};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use handoff_core::{
    CodeGenerator, CoreConfig, ReferenceStore, RegistrationError, RegistrationService,
    ValidationError, ValidationService,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Application state shared across REST API handlers
///
/// Holds the configuration, the store handle constructed at startup and the two services built
/// on top of it.
#[derive(Clone)]
pub struct AppState {
    cfg: Arc<CoreConfig>,
    store: Arc<dyn ReferenceStore>,
    registration: RegistrationService,
    validation: ValidationService,
}

impl AppState {
    pub fn new(
        cfg: Arc<CoreConfig>,
        store: Arc<dyn ReferenceStore>,
        generator: Arc<dyn CodeGenerator>,
    ) -> Self {
        Self {
            registration: RegistrationService::new(cfg.clone(), store.clone(), generator),
            validation: ValidationService::new(cfg.clone(), store.clone()),
            cfg,
            store,
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(health, register, validate),
    components(schemas(HealthRes, RegisterReq, RegisterRes, ValidateReq, ValidateRes, FileRes))
)]
pub struct ApiDoc;

/// Builds the full REST application: API routes, OpenAPI document and Swagger UI.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/storefile", post(register))
        .route("/api/validate", post(validate))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn registration_status(err: &RegistrationError) -> StatusCode {
    match err {
        RegistrationError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        RegistrationError::RegistrationFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        RegistrationError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

fn validation_status(err: &ValidationError) -> StatusCode {
    match err {
        ValidationError::InvalidFormat(_) => StatusCode::BAD_REQUEST,
        ValidationError::NotFound => StatusCode::NOT_FOUND,
        ValidationError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service and store are healthy", body = HealthRes),
        (status = 503, description = "Store is unreachable", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
///
/// Probes the reference store. Used for monitoring and load balancer health checks.
#[axum::debug_handler]
async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthRes>) {
    let res = HealthService::check_health(state.store.as_ref(), state.cfg.store_timeout()).await;
    let status = if res.ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(res))
}

#[utoipa::path(
    post,
    path = "/api/storefile",
    request_body = RegisterReq,
    responses(
        (status = 200, description = "Share registered", body = RegisterRes),
        (status = 400, description = "Missing or invalid pointer/name", body = RegisterRes),
        (status = 500, description = "No free access code found", body = RegisterRes),
        (status = 503, description = "Store unavailable", body = RegisterRes)
    )
)]
/// Register an uploaded file and return its access code
///
/// The file bytes must already be in object storage; the body carries only the location
/// pointer and the original file name.
#[axum::debug_handler]
async fn register(
    State(state): State<AppState>,
    req: Result<Json<RegisterReq>, JsonRejection>,
) -> (StatusCode, Json<RegisterRes>) {
    let Json(req) = match req {
        Ok(req) => req,
        Err(rejection) => {
            tracing::warn!("Rejected register body: {}", rejection.body_text());
            return (
                StatusCode::BAD_REQUEST,
                Json(RegisterRes {
                    error: true,
                    code: None,
                    message: Some("Malformed upload request".into()),
                }),
            );
        }
    };

    match state
        .registration
        .register(&req.location_pointer, &req.display_name)
        .await
    {
        Ok(code) => (StatusCode::OK, Json(RegisterRes::registered(&code))),
        Err(e) => {
            tracing::error!("Register error: {:?}", e);
            (registration_status(&e), Json(RegisterRes::failed(&e)))
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/validate",
    request_body = ValidateReq,
    responses(
        (status = 200, description = "Code resolved", body = ValidateRes),
        (
            status = 400,
            description = "Code is not the configured number of digits",
            body = ValidateRes
        ),
        (status = 404, description = "No file registered under the code", body = ValidateRes),
        (status = 503, description = "Store unavailable", body = ValidateRes)
    )
)]
/// Resolve an access code to its file
///
/// Returns the location pointer and display name so the client can fetch and save the blob.
#[axum::debug_handler]
async fn validate(
    State(state): State<AppState>,
    req: Result<Json<ValidateReq>, JsonRejection>,
) -> (StatusCode, Json<ValidateRes>) {
    let Json(req) = match req {
        Ok(req) => req,
        Err(rejection) => {
            tracing::warn!("Rejected validate body: {}", rejection.body_text());
            return (
                StatusCode::BAD_REQUEST,
                Json(ValidateRes {
                    error: true,
                    file: None,
                    message: Some("Malformed code request".into()),
                }),
            );
        }
    };

    match state.validation.validate(&req.submitted_code).await {
        Ok(reference) => (StatusCode::OK, Json(ValidateRes::found(&reference))),
        Err(e) => {
            match &e {
                ValidationError::StoreUnavailable(_) => tracing::error!("Validate error: {:?}", e),
                _ => tracing::debug!("Validate rejected: {}", e),
            }
            (validation_status(&e), Json(ValidateRes::failed(&e)))
        }
    }
}
