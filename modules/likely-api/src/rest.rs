use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use likely_common::{Actor, ActorId};
use likely_engine::ranking::DEFAULT_PAGE_SIZE;
use likely_engine::ActorDirectory;
use likely_events::Direction;
use serde::{Deserialize, Serialize};

use crate::auth::AuthedActor;
use crate::error::ApiError;
use crate::AppState;

// --- Views ---

/// Public view of an actor.
#[derive(Debug, Serialize, Deserialize)]
pub struct ActorView {
    pub id: ActorId,
    pub username: String,
    pub reputation_count: i64,
    pub created_at: DateTime<Utc>,
}

impl From<Actor> for ActorView {
    fn from(actor: Actor) -> Self {
        Self {
            id: actor.id,
            username: actor.username,
            reputation_count: actor.reputation_count,
            created_at: actor.created_at,
        }
    }
}

#[derive(Deserialize)]
pub struct RankingQuery {
    offset: Option<usize>,
    limit: Option<usize>,
}

// --- Helpers ---

/// Unparseable ids can never name an actor, so they read as missing.
fn parse_actor_id(raw: &str) -> Result<ActorId, ApiError> {
    raw.parse().map_err(|_| ApiError::not_found(raw))
}

async fn toggle(
    state: &AppState,
    actor: ActorId,
    raw_target: &str,
    direction: Direction,
) -> Result<Json<serde_json::Value>, ApiError> {
    let target = parse_actor_id(raw_target)?;
    state.engine.toggle(actor, target, direction).await?;
    Ok(Json(serde_json::json!({})))
}

// --- Handlers ---

pub async fn like_actor(
    State(state): State<Arc<AppState>>,
    AuthedActor(actor): AuthedActor,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    toggle(&state, actor, &id, Direction::Like).await
}

pub async fn unlike_actor(
    State(state): State<Arc<AppState>>,
    AuthedActor(actor): AuthedActor,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    toggle(&state, actor, &id, Direction::Unlike).await
}

pub async fn get_actor(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ActorView>, ApiError> {
    let actor_id = parse_actor_id(&id)?;
    match state.engine.directory().find(actor_id).await? {
        Some(actor) => Ok(Json(actor.into())),
        None => Err(ApiError::not_found(actor_id)),
    }
}

pub async fn ranking(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RankingQuery>,
) -> Result<Json<Vec<ActorView>>, ApiError> {
    let actors = state
        .ranking
        .page(
            params.offset.unwrap_or(0),
            params.limit.unwrap_or(DEFAULT_PAGE_SIZE),
        )
        .await?;
    Ok(Json(actors.into_iter().map(Into::into).collect()))
}

pub async fn stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.engine.stats().snapshot())
}

pub async fn health() -> &'static str {
    "ok"
}
