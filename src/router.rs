use std::sync::Arc;

use axum::{
    Router,
    extract::{Query, State as AxumState},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::EngineError;
use crate::handler::{FixedHandlerFactory, GraphHandler};
use crate::server::AppState;

#[derive(Serialize)]
struct HealthCheck {
    message: String,
}

pub fn new_router(app_state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/overview", get(overview))
        .with_state(app_state)
}

async fn healthz() -> Response {
    (StatusCode::OK, Json(HealthCheck { message: "ready".into() })).into_response()
}

#[derive(Debug, Deserialize)]
struct OverviewParams {
    kind: String,
    name: String,
    namespace: Option<String>,
}

/// Resolves a seed object by kind/namespace/name and returns the graph
/// reached by traversing it. Errors map onto HTTP status per
/// `EngineError` variant rather than collapsing everything to 500.
async fn overview(
    AxumState(state): AxumState<AppState>,
    Query(params): Query<OverviewParams>,
) -> Response {
    let namespace = params.namespace.unwrap_or_else(|| state.default_namespace.clone());
    let cancel = CancellationToken::new();

    let seed = match state
        .queryer
        .get_object(&cancel, &params.kind, &namespace, &params.name)
        .await
    {
        Ok(seed) => seed,
        Err(err) => return error_response(err),
    };

    let handler = Arc::new(GraphHandler::new());
    let factory = FixedHandlerFactory::new(handler.clone());

    if let Err(err) = state.engine.visit(seed, cancel, &factory).await {
        return error_response(err);
    }

    (StatusCode::OK, Json(handler.snapshot().await)).into_response()
}

fn error_response(err: EngineError) -> Response {
    let status = match &err {
        EngineError::NotRegistered(_) | EngineError::MissingMetadata(_) => StatusCode::BAD_REQUEST,
        EngineError::QueryFailure(_) => StatusCode::BAD_GATEWAY,
        EngineError::Cancelled => StatusCode::GATEWAY_TIMEOUT,
        EngineError::AlreadyRegistered(_) | EngineError::HandlerFailure(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, err.to_string()).into_response()
}
