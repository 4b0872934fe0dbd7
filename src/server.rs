use crate::config::Config;
use crate::db::{EntityRecord, EntityRef, StoreError};
use crate::i18n::{
    negotiate, FieldViolation, LanguageConfig, LanguageSignals, LanguageSource, MetricsReport,
    Negotiation, TranslationInput,
};
use crate::security;
use crate::service::{ResolvedContent, ServiceError, TranslationService, TranslationUpdated};
use anyhow::Result;
use axum::{
    body::Body,
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, HeaderMap, HeaderValue, Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Response header flagging that the requested language was not available
pub const FALLBACK_HEADER: &str = "x-language-fallback";

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub service: TranslationService,
}

// ==================== Errors ====================

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    violations: Vec<FieldViolation>,
}

#[derive(Debug)]
enum ApiError {
    NotFound(String),
    Unauthorized(String),
    Conflict(String),
    Unprocessable(String, Vec<FieldViolation>),
    /// A body that is not the expected JSON shape
    Malformed(StatusCode, String),
    Unavailable(String),
    Internal(String),
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::UnknownEntityType(_)
            | ServiceError::UnknownField { .. }
            | ServiceError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            ServiceError::Invalid(e) => ApiError::Unprocessable(e.to_string(), e.violations),
            ServiceError::Store(e @ StoreError::AlreadyExists { .. }) => {
                ApiError::Conflict(e.to_string())
            }
            ServiceError::Store(e) => {
                error!("Storage failure: {}", e);
                ApiError::Internal("storage failure".to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Malformed(rejection.status(), rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, violations) = match self {
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message, Vec::new()),
            ApiError::Unauthorized(message) => (StatusCode::UNAUTHORIZED, message, Vec::new()),
            ApiError::Conflict(message) => (StatusCode::CONFLICT, message, Vec::new()),
            ApiError::Unprocessable(message, violations) => {
                (StatusCode::UNPROCESSABLE_ENTITY, message, violations)
            }
            ApiError::Malformed(status, message) => (status, message, Vec::new()),
            ApiError::Unavailable(message) => {
                (StatusCode::SERVICE_UNAVAILABLE, message, Vec::new())
            }
            ApiError::Internal(message) => {
                (StatusCode::INTERNAL_SERVER_ERROR, message, Vec::new())
            }
        };
        let body = Json(ErrorResponse {
            error: message,
            violations,
        });
        (status, body).into_response()
    }
}

// ==================== Router ====================

pub fn build_router(state: AppState) -> Router {
    let admin = Router::new()
        .route(
            "/api/content/:entity_type/:entity_id",
            post(create_content)
                .patch(update_content)
                .delete(delete_content),
        )
        .route(
            "/api/content/:entity_type/:entity_id/translations",
            get(get_translations),
        )
        .route(
            "/api/content/:entity_type/:entity_id/translations/:field/:language",
            put(put_translation),
        )
        .route("/api/metrics/translations", get(get_metrics))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    Router::new()
        .route("/health", get(get_health))
        .route("/api/languages", get(list_languages))
        .route("/api/content/:entity_type/:entity_id", get(get_content))
        .merge(admin)
        .layer(middleware::from_fn_with_state(state.clone(), negotiate_language))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(state: AppState) -> Result<()> {
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], state.config.port));
    let router = build_router(state);
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", listener.local_addr()?);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
}

// ==================== Middleware ====================

/// Negotiate the request language, expose it to handlers and describe it on
/// the response.
async fn negotiate_language(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let config = &state.config;

    let query = Query::<HashMap<String, String>>::try_from_uri(req.uri())
        .map(|Query(params)| params)
        .unwrap_or_default();
    let headers = req.headers();
    let cookies = cookie_value(headers, &config.language_cookie_name);

    let signals = LanguageSignals {
        query: query.get(&config.language_query_param).map(String::as_str),
        cookie: cookies.as_deref(),
        header: header_str(headers, &config.language_header),
        accept_language: header_str(headers, header::ACCEPT_LANGUAGE.as_str()),
    };
    let negotiation = negotiate(state.service.registry(), &signals);

    if negotiation.is_fallback {
        state.service.metrics().record_negotiation_fallback();
    }

    req.extensions_mut().insert(negotiation.clone());
    let mut response = next.run(req).await;
    let headers = response.headers_mut();

    headers.insert(
        header::CONTENT_LANGUAGE,
        HeaderValue::from_static(negotiation.language.code()),
    );
    headers.append(header::VARY, HeaderValue::from_static("accept-language, cookie"));
    if let Ok(value) = HeaderValue::from_str(&config.language_header) {
        headers.append(header::VARY, value);
    }
    if negotiation.is_fallback {
        headers.insert(FALLBACK_HEADER, HeaderValue::from_static("true"));
    }

    // An explicit choice becomes the persisted preference
    if negotiation.source == LanguageSource::Query {
        let cookie = format!(
            "{}={}; Max-Age={}; Path=/; SameSite=Lax",
            config.language_cookie_name,
            negotiation.language.code(),
            config.language_cookie_max_age_secs()
        );
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            headers.append(header::SET_COOKIE, value);
        }
    }

    response
}

/// Reject callers without the admin key before any payload is looked at.
async fn require_admin(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let authorization = header_str(req.headers(), header::AUTHORIZATION.as_str());

    if !security::is_authorized(&state.config.admin_api_key, authorization) {
        return Err(ApiError::Unauthorized(
            "translation maintenance requires an admin token".to_string(),
        ));
    }

    Ok(next.run(req).await)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim().trim_matches('"').to_string())
}

// ==================== Handlers ====================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn get_health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    state.service.database().ping().await.map_err(|e| {
        error!("Health check failed: {}", e);
        ApiError::Unavailable("storage unavailable".to_string())
    })?;
    Ok(Json(HealthResponse { status: "ok" }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LanguagesResponse {
    default_language: &'static str,
    active_language: &'static str,
    languages: Vec<LanguageConfig>,
}

async fn list_languages(
    State(state): State<AppState>,
    Extension(negotiation): Extension<Negotiation>,
) -> Json<LanguagesResponse> {
    let registry = state.service.registry();
    Json(LanguagesResponse {
        default_language: registry.default_code(),
        active_language: negotiation.language.code(),
        languages: registry.list_all().to_vec(),
    })
}

async fn get_content(
    State(state): State<AppState>,
    Path((entity_type, entity_id)): Path<(String, String)>,
    Extension(negotiation): Extension<Negotiation>,
) -> Result<Json<ResolvedContent>, ApiError> {
    let entity = EntityRef::new(entity_type, entity_id);
    let content = state
        .service
        .resolve_content(&entity, negotiation.language)
        .await?;
    Ok(Json(content))
}

#[derive(Debug, Deserialize)]
pub struct ContentRequest {
    pub fields: BTreeMap<String, TranslationInput>,
}

async fn create_content(
    State(state): State<AppState>,
    Path((entity_type, entity_id)): Path<(String, String)>,
    payload: Result<Json<ContentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<EntityRecord>), ApiError> {
    let Json(body) = payload?;
    let entity = EntityRef::new(entity_type, entity_id);
    let record = state.service.create_content(&entity, &body.fields).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn update_content(
    State(state): State<AppState>,
    Path((entity_type, entity_id)): Path<(String, String)>,
    payload: Result<Json<ContentRequest>, JsonRejection>,
) -> Result<Json<EntityRecord>, ApiError> {
    let Json(body) = payload?;
    let entity = EntityRef::new(entity_type, entity_id);
    let record = state.service.update_content(&entity, &body.fields).await?;
    Ok(Json(record))
}

async fn delete_content(
    State(state): State<AppState>,
    Path((entity_type, entity_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let entity = EntityRef::new(entity_type, entity_id);
    state.service.delete_content(&entity).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_translations(
    State(state): State<AppState>,
    Path((entity_type, entity_id)): Path<(String, String)>,
) -> Result<Json<EntityRecord>, ApiError> {
    let entity = EntityRef::new(entity_type, entity_id);
    let record = state.service.translations(&entity).await?;
    Ok(Json(record))
}

#[derive(Debug, Deserialize)]
pub struct TranslationRequest {
    pub value: String,
}

async fn put_translation(
    State(state): State<AppState>,
    Path((entity_type, entity_id, field, language)): Path<(String, String, String, String)>,
    payload: Result<Json<TranslationRequest>, JsonRejection>,
) -> Result<Json<TranslationUpdated>, ApiError> {
    let Json(body) = payload?;
    let entity = EntityRef::new(entity_type, entity_id);
    let updated = state
        .service
        .update_translation(&entity, &field, &language, &body.value)
        .await?;
    Ok(Json(updated))
}

async fn get_metrics(State(state): State<AppState>) -> Json<MetricsReport> {
    Json(state.service.metrics().report())
}
