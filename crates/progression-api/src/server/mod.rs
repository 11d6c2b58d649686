use std::fmt;
use std::net::SocketAddr;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, Request, State};
use axum::http::header::{HeaderName, HeaderValue};
use axum::http::Method;
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, NaiveDate, Utc};
use contracts::{
    ApiError, CompletionEvent, ErrorCode, Notification, ProgressionSnapshot, QuestDifficulty,
    RewardKind, TaskCategory, TaskDifficulty, UnlockedReward, SCHEMA_VERSION_V1,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, Mutex};

use crate::{EngineApi, FacadeError, PersistedProfileSummary, PersistenceError};
use progression_core::EngineError;

const DEFAULT_PAGE_SIZE: usize = 500;
const MAX_PAGE_SIZE: usize = 5000;
const DEFAULT_SQLITE_PATH: &str = "dailyxp_profiles.sqlite";

include!("error.rs");
include!("state.rs");
include!("routes/control.rs");
include!("routes/query.rs");
include!("routes/stream.rs");
include!("util.rs");

pub async fn serve(addr: SocketAddr) -> Result<(), ServerError> {
    let state = AppState::new();
    let app = router(state);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "progression api listening");
    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/profiles", post(create_profile).get(list_profiles))
        .route("/api/v1/profiles/{user_id}", get(get_profile))
        .route("/api/v1/profiles/{user_id}/complete", post(complete_step))
        .route("/api/v1/profiles/{user_id}/roll_day", post(roll_day))
        .route("/api/v1/profiles/{user_id}/rewards", get(get_rewards))
        .route("/api/v1/profiles/{user_id}/history", get(get_history))
        .route("/api/v1/profiles/{user_id}/stream", get(stream_profile))
        .route("/api/v1/rewards", get(get_catalog))
        .layer(middleware::from_fn(cors_middleware))
        .with_state(state)
}

async fn cors_middleware(request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        let mut response = Response::new(axum::body::Body::empty());
        *response.status_mut() = StatusCode::NO_CONTENT;
        apply_cors_headers(response.headers_mut());
        return response;
    }

    let mut response = next.run(request).await;
    apply_cors_headers(response.headers_mut());
    response
}
