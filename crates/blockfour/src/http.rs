//! JSON request/response endpoints.
//!
//! Every response carries `success`; failures add `error` and use the
//! status of the underlying [`GameError`].

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts, Query, Request, State};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use blockfour_rules::PlayerId;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{error, instrument, warn};

use crate::{AppState, GameError, GameId, StoreError};

/// Largest scoreboard page served over HTTP.
pub const MAX_SCOREBOARD_LIMIT: usize = 100;

/// A failed request, rendered as `{"success": false, "error": ...}`.
#[derive(Debug)]
pub enum ApiError {
    /// Rejected by the game rules.
    Game(GameError),
    /// Storage could not be read.
    Store(StoreError),
}

impl From<GameError> for ApiError {
    fn from(err: GameError) -> Self {
        Self::Game(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Game(e) => {
                warn!(kind = e.kind(), error = %e, "Request rejected");
                (e.status(), e.to_string())
            }
            Self::Store(e) => {
                error!(error = %e, "Storage read failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };
        (status, Json(json!({ "success": false, "error": message }))).into_response()
    }
}

type ApiResult = Result<Json<Value>, ApiError>;

/// JSON body extractor whose rejections use the `{success, error}` shape.
#[derive(Debug)]
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| GameError::invalid(rejection.body_text()))?;
        Ok(Self(value))
    }
}

/// Query string extractor whose rejections use the `{success, error}` shape.
#[derive(Debug)]
pub struct ApiQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection: QueryRejection| GameError::invalid(rejection.body_text()))?;
        Ok(Self(value))
    }
}

fn required<T>(value: Option<T>, field: &str) -> Result<T, GameError> {
    value.ok_or_else(|| GameError::invalid(format!("{field} is required")))
}

/// Body of `POST /api/game/create`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequest {
    player_name: Option<String>,
    player_color: Option<String>,
    board_size: Option<i64>,
}

/// Body of `POST /api/game/join`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    game_id: Option<GameId>,
    player_name: Option<String>,
    player_color: Option<String>,
}

/// Body of `POST /api/game/move` and `POST /api/game/block`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementRequest {
    game_id: Option<GameId>,
    player_id: Option<PlayerId>,
    row: Option<i64>,
    col: Option<i64>,
}

/// Body of `POST /api/game/chat`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    game_id: Option<GameId>,
    player_id: Option<PlayerId>,
    text: Option<String>,
}

/// Body of `POST /api/game/rematch` and the `gameId` query parameter.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRef {
    game_id: Option<GameId>,
}

/// Query of `GET /api/scoreboard`.
#[derive(Debug, Deserialize)]
pub struct ScoreboardQuery {
    limit: Option<usize>,
}

/// `POST /api/game/create`
#[instrument(skip(state))]
pub async fn create_game(State(state): State<AppState>, ApiJson(req): ApiJson<CreateRequest>) -> ApiResult {
    let name = required(req.player_name, "playerName")?;
    let color = required(req.player_color, "playerColor")?;
    let size = required(req.board_size, "boardSize")?;
    let game = state.sessions().create(&name, &color, size).await?;
    Ok(Json(json!({ "success": true, "game": game })))
}

/// `POST /api/game/join`
#[instrument(skip(state))]
pub async fn join_game(State(state): State<AppState>, ApiJson(req): ApiJson<JoinRequest>) -> ApiResult {
    let game_id = required(req.game_id, "gameId")?;
    let name = required(req.player_name, "playerName")?;
    let color = required(req.player_color, "playerColor")?;
    let game = state.sessions().join(&game_id, &name, &color).await?;
    Ok(Json(json!({ "success": true, "game": game })))
}

/// `POST /api/game/move`
#[instrument(skip(state))]
pub async fn make_move(State(state): State<AppState>, ApiJson(req): ApiJson<PlacementRequest>) -> ApiResult {
    let (game_id, player_id, row, col) = placement_fields(req)?;
    let game = state.sessions().apply_move(&game_id, &player_id, row, col).await?;
    Ok(Json(json!({ "success": true, "game": game })))
}

/// `POST /api/game/block`
#[instrument(skip(state))]
pub async fn place_block(State(state): State<AppState>, ApiJson(req): ApiJson<PlacementRequest>) -> ApiResult {
    let (game_id, player_id, row, col) = placement_fields(req)?;
    let game = state.sessions().apply_block(&game_id, &player_id, row, col).await?;
    Ok(Json(json!({ "success": true, "game": game })))
}

fn placement_fields(req: PlacementRequest) -> Result<(GameId, PlayerId, i64, i64), GameError> {
    Ok((
        required(req.game_id, "gameId")?,
        required(req.player_id, "playerId")?,
        required(req.row, "row")?,
        required(req.col, "col")?,
    ))
}

/// `POST /api/game/rematch`
#[instrument(skip(state))]
pub async fn rematch(State(state): State<AppState>, ApiJson(req): ApiJson<GameRef>) -> ApiResult {
    let game_id = required(req.game_id, "gameId")?;
    let game = state.sessions().rematch(&game_id).await?;
    Ok(Json(json!({ "success": true, "game": game })))
}

/// `POST /api/game/chat`
#[instrument(skip(state, req))]
pub async fn send_chat(State(state): State<AppState>, ApiJson(req): ApiJson<ChatRequest>) -> ApiResult {
    let game_id = required(req.game_id, "gameId")?;
    let player_id = required(req.player_id, "playerId")?;
    let text = required(req.text, "text")?;
    let message = state.sessions().chat(&game_id, &player_id, &text).await?;
    Ok(Json(json!({ "success": true, "message": message })))
}

/// `GET /api/game/chat?gameId=`
#[instrument(skip(state))]
pub async fn chat_messages(State(state): State<AppState>, ApiQuery(query): ApiQuery<GameRef>) -> ApiResult {
    let game_id = required(query.game_id, "gameId")?;
    let messages = state.chat_history(&game_id)?;
    Ok(Json(json!({ "success": true, "messages": messages })))
}

/// `GET /api/game/details?gameId=`
#[instrument(skip(state))]
pub async fn game_details(State(state): State<AppState>, ApiQuery(query): ApiQuery<GameRef>) -> ApiResult {
    let game_id = required(query.game_id, "gameId")?;
    let game = state.sessions().get(&game_id).await?;
    Ok(Json(json!({ "success": true, "game": game })))
}

/// `GET /api/history`
#[instrument(skip(state))]
pub async fn history(State(state): State<AppState>) -> ApiResult {
    let games = state.history()?;
    Ok(Json(json!({ "success": true, "games": games })))
}

/// `GET /api/scoreboard?limit=`
#[instrument(skip(state))]
pub async fn scoreboard(State(state): State<AppState>, ApiQuery(query): ApiQuery<ScoreboardQuery>) -> ApiResult {
    let limit = query
        .limit
        .unwrap_or(*state.config().scoreboard_limit())
        .min(MAX_SCOREBOARD_LIMIT);
    let top_players = state.scoreboard(limit)?;
    Ok(Json(json!({ "success": true, "topPlayers": top_players })))
}
