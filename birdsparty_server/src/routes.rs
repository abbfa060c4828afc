use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use birdsparty_core::{
    request_key, Engine, EngineError, OutcomeService, SeedDeriver, SettingsService,
};
use birdsparty_shared::{
    ApiError, CascadeResponse, GameRequest, ProcessStageClearedResponse, SpinResponse,
};
use rand::rngs::StdRng;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{debug, warn};

pub struct AppState<S, O> {
    pub engine: Engine<S, O>,
    pub seeds: SeedDeriver,
}

impl<S, O> AppState<S, O> {
    /// Fresh generator for one request, keyed by the request identifiers and
    /// chain position and salted with the arrival time.
    fn request_rng(&self, req: &GameRequest) -> StdRng {
        let nonce = chrono::Utc::now()
            .timestamp_nanos_opt()
            .unwrap_or_default() as u64;
        let key = request_key(&req.ids, req.game_state.cascade_count);
        debug!(%key, nonce, "seeding request rng");
        self.seeds.rng(&key, nonce)
    }
}

pub struct AppError(ApiError);

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        if !err.is_validation() {
            warn!(error = %err, source = ?std::error::Error::source(&err), "upstream failure");
        }
        AppError(err.into())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        debug!(%rejection, "rejected request body");
        AppError(ApiError::Invalid("Invalid request body".into()))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.0.body())).into_response()
    }
}

async fn route_health() -> &'static str {
    "ok"
}

async fn route_spin<S, O>(
    State(app): State<Arc<AppState<S, O>>>,
    payload: Result<Json<GameRequest>, JsonRejection>,
) -> Result<Json<SpinResponse>, AppError>
where
    S: SettingsService + 'static,
    O: OutcomeService + 'static,
{
    let Json(req) = payload?;
    let mut rng = app.request_rng(&req);
    let out = app.engine.spin(&req.ids, req.game_state, &mut rng).await?;
    Ok(Json(out.into()))
}

async fn route_process_stage_cleared<S, O>(
    State(app): State<Arc<AppState<S, O>>>,
    payload: Result<Json<GameRequest>, JsonRejection>,
) -> Result<Json<ProcessStageClearedResponse>, AppError>
where
    S: SettingsService + 'static,
    O: OutcomeService + 'static,
{
    let Json(req) = payload?;
    let mut rng = app.request_rng(&req);
    let out = app
        .engine
        .process_progression(&req.ids, req.game_state, &mut rng)
        .await?;
    Ok(Json(out.into()))
}

async fn route_cascade<S, O>(
    State(app): State<Arc<AppState<S, O>>>,
    payload: Result<Json<GameRequest>, JsonRejection>,
) -> Result<Json<CascadeResponse>, AppError>
where
    S: SettingsService + 'static,
    O: OutcomeService + 'static,
{
    let Json(req) = payload?;
    let mut rng = app.request_rng(&req);
    let out = app.engine.cascade(&req.ids, req.game_state, &mut rng).await?;
    Ok(Json(out.into()))
}

pub fn router<S, O>(state: Arc<AppState<S, O>>) -> Router
where
    S: SettingsService + 'static,
    O: OutcomeService + 'static,
{
    Router::new()
        .route("/healthz", get(route_health))
        .route("/spin/birdsparty", post(route_spin::<S, O>))
        .route(
            "/process-stage-cleared/birdsparty",
            post(route_process_stage_cleared::<S, O>),
        )
        .route("/cascade/birdsparty", post(route_cascade::<S, O>))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}
