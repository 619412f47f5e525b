use super::command::{self, Reply};
use super::deck::PlayedCard;
use super::game::{Game, GameStatus};
use super::player::Player;
use super::registry::{GameRegistry, RegistryError};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    registry: Arc<GameRegistry>,
}

impl AppState {
    pub fn new(registry: Arc<GameRegistry>) -> Self {
        Self { registry }
    }
}

#[derive(Deserialize)]
pub struct CreateGameRequest {
    players: Vec<String>,
}

#[derive(Deserialize)]
pub struct MessageRequest {
    user: String,
    text: String,
}

#[derive(Deserialize)]
pub struct LeaveRequest {
    user: String,
}

#[derive(Serialize, Deserialize)]
pub struct GameResponse {
    id: String,
    created_at: DateTime<Utc>,
    current_player: Option<String>,
    direction: String,
    players: Vec<PlayerSummary>,
    discard_top: Option<CardResponse>,
    draw_pile_remaining: usize,
    pending_draws: usize,
    status: String,
    winner: Option<String>,
}

#[derive(Serialize, Deserialize)]
pub struct PlayerSummary {
    identity: String,
    hand_size: usize,
    is_current_turn: bool,
}

#[derive(Serialize, Deserialize)]
pub struct CardResponse {
    colour: String,
    rank: String,
}

#[derive(Serialize, Deserialize)]
pub struct PlayerViewResponse {
    identity: String,
    is_current_turn: bool,
    hand: Vec<(usize, CardResponse)>,
}

#[derive(Serialize, Deserialize)]
pub struct CreateGameResponse {
    game: GameResponse,
    replies: Vec<Reply>,
}

#[derive(Serialize, Deserialize)]
pub struct MessageResponse {
    replies: Vec<Reply>,
}

#[derive(Serialize, Deserialize)]
pub struct GameSummaryResponse {
    id: String,
    created_at: DateTime<Utc>,
}

impl CardResponse {
    fn from_played(played: &PlayedCard) -> Self {
        Self {
            colour: played.colour.to_string(),
            rank: format!("{:?}", played.card.rank),
        }
    }

    fn from_card(card: &super::card::Card) -> Self {
        Self {
            colour: card.colour.to_string(),
            rank: format!("{:?}", card.rank),
        }
    }
}

impl GameResponse {
    fn from_game(id: &Uuid, created_at: DateTime<Utc>, game: &Game) -> Self {
        let (status, winner) = match &game.status {
            GameStatus::AwaitingMove => ("in progress".to_string(), None),
            GameStatus::Finished { winner } => (
                "finished".to_string(),
                winner
                    .and_then(|index| game.players.get(index))
                    .map(|p| p.identity.clone()),
            ),
        };

        Self {
            id: id.to_string(),
            created_at,
            current_player: game.current_player().map(|p| p.identity.clone()),
            direction: format!("{:?}", game.direction),
            players: game
                .players
                .iter()
                .map(|p| PlayerSummary {
                    identity: p.identity.clone(),
                    hand_size: p.hand.len(),
                    is_current_turn: p.is_current_turn,
                })
                .collect(),
            discard_top: game.deck.top().map(CardResponse::from_played),
            draw_pile_remaining: game.deck.draw_pile.len(),
            pending_draws: game.pending_draws,
            status,
            winner,
        }
    }
}

impl PlayerViewResponse {
    fn from_player(player: &Player) -> Self {
        Self {
            identity: player.identity.clone(),
            is_current_turn: player.is_current_turn,
            hand: player
                .hand
                .iter()
                .enumerate()
                .map(|(i, card)| (i + 1, CardResponse::from_card(card)))
                .collect(),
        }
    }
}

pub async fn create_game(
    State(state): State<AppState>,
    Json(req): Json<CreateGameRequest>,
) -> impl IntoResponse {
    info!("creating new game with players: {:?}", req.players);
    match state.registry.create_game(req.players) {
        Ok((id, handle)) => {
            let game = handle.game.lock().expect("game lock poisoned");
            let response = CreateGameResponse {
                game: GameResponse::from_game(&id, handle.created_at, &game),
                replies: command::status_replies(&game),
            };
            (StatusCode::CREATED, Json(response)).into_response()
        }
        Err(e) => {
            error!("failed to create game: {}", e);
            (StatusCode::BAD_REQUEST, e.to_string()).into_response()
        }
    }
}

pub async fn list_games(State(state): State<AppState>) -> impl IntoResponse {
    let games: Vec<GameSummaryResponse> = state
        .registry
        .list()
        .into_iter()
        .map(|(id, created_at)| GameSummaryResponse {
            id: id.to_string(),
            created_at,
        })
        .collect();
    info!("listing {} games", games.len());
    Json(games).into_response()
}

pub async fn get_game(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    let Ok(game_id) = Uuid::parse_str(&id) else {
        return (StatusCode::NOT_FOUND, RegistryError::GameNotFound.to_string()).into_response();
    };
    match state.registry.get(&game_id) {
        Ok(handle) => {
            let game = handle.game.lock().expect("game lock poisoned");
            Json(GameResponse::from_game(&game_id, handle.created_at, &game)).into_response()
        }
        Err(e) => {
            info!("game not found: {}", id);
            (StatusCode::NOT_FOUND, e.to_string()).into_response()
        }
    }
}

/// A single player's own view. Other hands are only visible as counts via
/// the game summary.
pub async fn get_player_view(
    State(state): State<AppState>,
    Path((id, user)): Path<(String, String)>,
) -> impl IntoResponse {
    let Ok(game_id) = Uuid::parse_str(&id) else {
        return (StatusCode::NOT_FOUND, RegistryError::GameNotFound.to_string()).into_response();
    };
    match state.registry.get(&game_id) {
        Ok(handle) => {
            let game = handle.game.lock().expect("game lock poisoned");
            match game.players.iter().find(|p| p.identity == user) {
                Some(player) => Json(PlayerViewResponse::from_player(player)).into_response(),
                None => (
                    StatusCode::NOT_FOUND,
                    "no such player in this game".to_string(),
                )
                    .into_response(),
            }
        }
        Err(e) => (StatusCode::NOT_FOUND, e.to_string()).into_response(),
    }
}

/// Chat ingestion: the transport posts each inbound direct message here
/// and delivers the returned replies.
pub async fn post_message(
    State(state): State<AppState>,
    Json(req): Json<MessageRequest>,
) -> impl IntoResponse {
    info!("message from {}: {:?}", req.user, req.text);
    let replies = command::handle_message(&state.registry, &req.user, &req.text);
    Json(MessageResponse { replies }).into_response()
}

pub async fn leave_game(
    State(state): State<AppState>,
    Json(req): Json<LeaveRequest>,
) -> impl IntoResponse {
    info!("{} is leaving their game", req.user);
    let replies = command::handle_leave(&state.registry, &req.user);
    Json(MessageResponse { replies }).into_response()
}

pub async fn delete_game(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    info!("deleting game with ID: {}", id);
    let Ok(game_id) = Uuid::parse_str(&id) else {
        return (StatusCode::NOT_FOUND, RegistryError::GameNotFound.to_string()).into_response();
    };
    match state.registry.end_game(&game_id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => {
            info!("failed to delete game: {} - {}", id, e);
            (StatusCode::NOT_FOUND, e.to_string()).into_response()
        }
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::permissive();

    // Create a trace layer for logging
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().include_headers(true))
        .on_response(DefaultOnResponse::new().include_headers(true));

    Router::new()
        .route("/games", post(create_game))
        .route("/games", get(list_games))
        .route("/games/{id}", get(get_game))
        .route("/games/{id}", delete(delete_game))
        .route("/games/{id}/players/{user}", get(get_player_view))
        .route("/messages", post(post_message))
        .route("/leave", post(leave_game))
        .layer(cors)
        .layer(trace_layer)
        .with_state(state)
}

pub async fn start_api_server(listen: &str) -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    info!("Starting uno-chat API server...");

    let registry = Arc::new(GameRegistry::new());
    let app = router(AppState::new(registry));

    let listener = tokio::net::TcpListener::bind(listen).await?;
    info!("API server running on http://{}", listen);
    axum::serve(listener, app).await?;

    Ok(())
}
