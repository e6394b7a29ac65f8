//! HTTP surface for the like/unlike toggle engine.

use std::sync::Arc;

use anyhow::Result;
use axum::{
    http::{header, HeaderValue},
    routing::{get, post},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::info;

use likely_common::Config;
use likely_engine::{
    ActorDirectory, CasPolicy, MemoryDirectory, PgDirectory, RankingView, ToggleEngine,
};
use likely_events::{EventLedger, MemoryLedger, PgLedger};

pub mod auth;
pub mod error;
pub mod jwt;
pub mod rest;

use jwt::JwtService;

pub struct AppState {
    pub engine: ToggleEngine,
    pub ranking: RankingView,
    pub jwt: JwtService,
}

impl AppState {
    pub fn new(
        ledger: Arc<dyn EventLedger>,
        directory: Arc<dyn ActorDirectory>,
        policy: CasPolicy,
        jwt: JwtService,
    ) -> Self {
        Self {
            engine: ToggleEngine::new(ledger, directory.clone()).with_policy(policy),
            ranking: RankingView::new(directory),
            jwt,
        }
    }

    /// Wire stores from config: Postgres when `DATABASE_URL` is set, otherwise
    /// in-memory stores that live as long as the process.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let (ledger, directory): (Arc<dyn EventLedger>, Arc<dyn ActorDirectory>) =
            match &config.database_url {
                Some(url) => {
                    let pool = PgPoolOptions::new().max_connections(16).connect(url).await?;
                    info!("Connected to Postgres");
                    (
                        Arc::new(PgLedger::new(pool.clone())),
                        Arc::new(PgDirectory::new(pool)),
                    )
                }
                None => {
                    info!("DATABASE_URL not set; using in-memory stores");
                    (Arc::new(MemoryLedger::new()), Arc::new(MemoryDirectory::new()))
                }
            };

        let policy = CasPolicy::new(
            config.cas_max_attempts,
            config.cas_base_delay_ms,
            config.cas_max_delay_ms,
            0.25,
        );
        let jwt = JwtService::new(&config.jwt_secret, config.jwt_issuer.clone());

        Ok(Self::new(ledger, directory, policy, jwt))
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(rest::health))
        .route("/stats", get(rest::stats))
        .route("/ranking", get(rest::ranking))
        .route("/actor/{id}", get(rest::get_actor))
        .route("/actor/{id}/like", post(rest::like_actor))
        .route("/actor/{id}/unlike", post(rest::unlike_actor))
        .with_state(state)
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        // method + path + status + latency only
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        )
}
