//! HTTP API

use std::time::Duration;

use axum::error_handling::HandleErrorLayer;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{BoxError, Json, Router};
use roadsnap_core::{BuildStats, Edge, Error, Node, NodeId, RouteResult};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

use crate::config::ServerConfig;
use crate::state::{AppState, GraphStats};

pub fn router(state: AppState, config: &ServerConfig) -> Router {
    let middleware = ServiceBuilder::new()
        .layer(HandleErrorLayer::new(handle_middleware_error))
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .concurrency_limit(config.concurrency_limit);

    Router::new()
        .route("/health", get(health))
        .route("/api/route", post(route))
        .route("/api/graph/nodes", get(graph_nodes))
        .route("/api/graph/edges", get(graph_edges))
        .route("/api/graph/stats", get(graph_stats))
        .route("/api/graph/rebuild", post(rebuild_graph))
        .layer(middleware)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Deserialize)]
pub struct RouteRequest {
    pub origin: LatLon,
    pub destination: LatLon,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RouteResponse {
    /// `[lat, lon]` pairs from origin to destination
    pub path: Vec<[f64; 2]>,
    pub distance_meters: f64,
    pub duration_minutes: f64,
    pub origin_node: NodeId,
    pub destination_node: NodeId,
}

impl From<RouteResult> for RouteResponse {
    fn from(route: RouteResult) -> Self {
        Self {
            path: route.lat_lon_path(),
            distance_meters: route.distance_meters,
            duration_minutes: route.duration_minutes,
            origin_node: route.origin_node,
            destination_node: route.destination_node,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[derive(Debug)]
pub enum ApiError {
    Core(Error),
    Internal(String),
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self::Core(e)
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Internal(format!("background task failed: {e}"))
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Core(Error::NoGraph) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Core(Error::NoRoute { .. }) => StatusCode::NOT_FOUND,
            Self::Core(Error::InvalidCoordinate { .. }) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Core(Error::NoGraph) => "no_graph",
            Self::Core(Error::NoRoute { .. }) => "no_route",
            Self::Core(Error::InvalidCoordinate { .. }) => "invalid_coordinate",
            _ => "internal",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Core(e) => e.to_string(),
            Self::Internal(message) => message.clone(),
        };

        if status.is_server_error() && status != StatusCode::SERVICE_UNAVAILABLE {
            error!("{message}");
        } else {
            debug!(status = status.as_u16(), "{message}");
        }

        let body = ErrorResponse {
            error: self.kind().to_string(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

async fn handle_middleware_error(err: BoxError) -> (StatusCode, Json<ErrorResponse>) {
    if err.is::<tower::timeout::error::Elapsed>() {
        (
            StatusCode::REQUEST_TIMEOUT,
            Json(ErrorResponse {
                error: "timeout".to_string(),
                message: "request took too long".to_string(),
            }),
        )
    } else {
        error!("Unhandled middleware error: {err}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "internal".to_string(),
                message: err.to_string(),
            }),
        )
    }
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "graph_loaded": state.graph().is_loaded(),
    }))
}

async fn route(
    State(state): State<AppState>,
    Json(req): Json<RouteRequest>,
) -> Result<Json<RouteResponse>, ApiError> {
    let engine = state.graph().current()?;
    let route = engine.find_route(
        req.origin.lat,
        req.origin.lon,
        req.destination.lat,
        req.destination.lon,
    )?;
    Ok(Json(route.into()))
}

async fn graph_nodes(State(state): State<AppState>) -> Result<Json<Vec<Node>>, ApiError> {
    let engine = state.graph().current()?;
    Ok(Json(engine.graph().nodes().collect()))
}

async fn graph_edges(State(state): State<AppState>) -> Result<Json<Vec<Edge>>, ApiError> {
    let engine = state.graph().current()?;
    Ok(Json(engine.graph().edges().collect()))
}

async fn graph_stats(State(state): State<AppState>) -> Result<Json<GraphStats>, ApiError> {
    Ok(Json(state.served_stats()?))
}

async fn rebuild_graph(State(state): State<AppState>) -> Result<Json<BuildStats>, ApiError> {
    info!("Rebuild requested");
    let stats = tokio::task::spawn_blocking(move || state.rebuild()).await??;
    Ok(Json(stats))
}
