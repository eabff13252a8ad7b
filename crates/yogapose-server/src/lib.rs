//! HTTP server for MoveNet pose detection.
//!
//! Routes:
//!
//! | Method | Path | Handler |
//! |--------|------|---------|
//! | `GET` | `/` | [`handlers::root`] |
//! | `GET` | `/health` | [`handlers::health`] |
//! | `POST` | `/detect` | [`handlers::detect::detect_upload`] |
//! | `POST` | `/detect_base64` | [`handlers::detect::detect_base64`] |

pub mod connectivity;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod services;


use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::DefaultBodyLimit;
use axum::http::{Request, Response};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;
use yogapose_config::ServerConfig;
use yogapose_core::PoseError;
use yogapose_engine::EngineHandle;
use yogapose_vision::Normalizer;

/// Shared server state accessible from all handlers.
pub struct ServerState {
    pub engine: Arc<EngineHandle>,
    pub normalizer: Normalizer,
}

impl ServerState {
    pub fn new(engine: EngineHandle) -> Self {
        Self {
            engine: Arc::new(engine),
            normalizer: Normalizer::default(),
        }
    }
}

/// Installs the global `tracing` subscriber. `RUST_LOG` overrides `info`.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .compact()
        .init();
}

/// Any origin, method and header, with credentials.
///
/// Wildcards cannot be combined with credentials, so the request's own
/// origin, method and headers are echoed back instead.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

/// Builds the application router.
pub fn router(state: Arc<ServerState>, max_upload_bytes: usize) -> Router {
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|req: &Request<Body>| {
            tracing::info_span!(
                "request",
                id = %Uuid::new_v4(),
                method = %req.method(),
                uri = %req.uri(),
                version = ?req.version(),
            )
        })
        .on_response(|res: &Response<Body>, latency: Duration, _span: &tracing::Span| {
            info!(
                latency = %format!("{} ms", latency.as_millis()),
                status = %res.status().as_u16(),
                "finished processing request"
            );
        });

    let logged_routes = Router::new()
        .route("/", get(handlers::root))
        .route("/detect", post(handlers::detect::detect_upload))
        .route("/detect_base64", post(handlers::detect::detect_base64))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(trace_layer);

    Router::new()
        .merge(logged_routes)
        .route("/health", get(handlers::health))
        .layer(cors_layer())
        .with_state(state)
}

/// Loads the configured model and builds the router around it.
///
/// Fails when the model cannot be loaded; no router is served without one.
pub fn build_app(config: &ServerConfig) -> Result<Router, PoseError> {
    let engine = EngineHandle::initialize(config)?;
    let state = Arc::new(ServerState::new(engine));
    Ok(router(state, config.max_upload_bytes))
}
