//! HTTP route handlers for the Synapse API.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::sse::{Event, KeepAlive, KeepAliveStream, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use futures::channel::mpsc;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::airlock::AirlockMessage;
use crate::assessment::{
    AssessmentModule, AssessmentSummary, DashboardSummary, MODULES, QuizResponse,
};
use crate::common::errors::StoreError;
use crate::common::ids::UserId;
use crate::mediator::{MediatorError, MediatorRequest, RawTurn, validate_turns};

use super::state::AppState;

/// Logged messages fed back as history when a client sends none.
const PROMPT_HISTORY_LIMIT: usize = 20;
/// Default page size of the history endpoint.
const DEFAULT_HISTORY_LIMIT: usize = 50;
/// Largest page the history endpoint serves.
const MAX_HISTORY_LIMIT: usize = 200;

type ApiError = (StatusCode, String);
type EventStream = mpsc::UnboundedReceiver<Result<Event, Infallible>>;

/// Create the API router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/airlock/message", post(airlock_message))
        .route("/api/airlock/stream", post(airlock_stream))
        .route("/api/airlock/history/{couple_id}", get(airlock_history))
        .route("/api/quiz/modules", get(quiz_modules))
        .route("/api/quiz/response", post(quiz_response))
        .route("/api/dashboard/{user_id}", get(dashboard))
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "synapse-mediator",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Airlock message request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AirlockRequest {
    /// Speaking user.
    pub user_id: String,
    /// New message text.
    pub message: String,
    /// Prior turns, oldest first.
    #[serde(default)]
    pub conversation_history: Vec<RawTurn>,
    /// Other partner, whose assessment counts are added to the prompt.
    pub partner_id: Option<String>,
    /// Couple whose log records the exchange.
    pub couple_id: Option<String>,
}

/// Airlock message response.
#[derive(Debug, Serialize)]
pub struct AirlockResponse {
    /// Mediator reply.
    pub response: String,
    /// When the reply was produced.
    pub timestamp: DateTime<Utc>,
}

/// History page query.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Page size.
    pub limit: Option<usize>,
}

fn bad_request(message: impl Into<String>) -> ApiError {
    (StatusCode::BAD_REQUEST, message.into())
}

fn mediator_error(err: &MediatorError) -> ApiError {
    match err {
        MediatorError::Validation(message) => bad_request(message.clone()),
        MediatorError::Unavailable => (StatusCode::SERVICE_UNAVAILABLE, err.to_string()),
    }
}

fn store_error(err: &StoreError) -> ApiError {
    if err.is_client_error() {
        bad_request(err.to_string())
    } else {
        error!(error = %err, "Store failure");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "storage error".to_string(),
        )
    }
}

fn parse_user(raw: String) -> Result<UserId, ApiError> {
    UserId::parse(raw).map_err(|err| bad_request(format!("invalid user id: {err}")))
}

/// Counts for a participant; the mediator works without them if the store fails.
async fn summaries_for(state: &AppState, user_id: &UserId) -> Option<Vec<AssessmentSummary>> {
    match state.assessments.response_counts(user_id.clone()).await {
        Ok(summaries) => Some(summaries),
        Err(err) => {
            warn!(user_id = %user_id, error = %err, "Assessment counts unavailable");
            None
        }
    }
}

/// Validate a request body and gather everything the mediator needs.
async fn prepare(
    state: &AppState,
    body: AirlockRequest,
) -> Result<(MediatorRequest, Option<String>), ApiError> {
    let user_id = parse_user(body.user_id)?;
    let partner_id = body.partner_id.map(parse_user).transpose()?;
    let mut turns =
        validate_turns(body.conversation_history).map_err(|err| mediator_error(&err))?;

    if turns.is_empty()
        && let Some(couple_id) = &body.couple_id
    {
        match state
            .airlock
            .load_recent(couple_id.clone(), PROMPT_HISTORY_LIMIT)
            .await
        {
            Ok(messages) => turns = messages.iter().map(AirlockMessage::to_turn).collect(),
            Err(err) => warn!(couple_id = %couple_id, error = %err, "Airlock history unavailable"),
        }
    }

    let mut request = MediatorRequest::new(user_id, body.message).with_turns(turns);
    request.validate().map_err(|err| mediator_error(&err))?;

    let self_summaries = summaries_for(state, &request.user_id).await;
    if let Some(summaries) = self_summaries {
        request = request.with_self_summaries(summaries);
    }
    if let Some(partner_id) = &partner_id
        && let Some(summaries) = summaries_for(state, partner_id).await
    {
        request = request.with_partner_summaries(summaries);
    }

    Ok((request, body.couple_id))
}

/// Record a user message and the mediator reply in the couple's log.
async fn log_exchange(state: &AppState, couple_id: String, request: &MediatorRequest, reply: &str) {
    let messages = vec![
        AirlockMessage::user(
            couple_id.clone(),
            request.user_id.clone(),
            request.message.clone(),
        ),
        AirlockMessage::mediator(couple_id.clone(), reply),
    ];
    if let Err(err) = state.airlock.append(messages).await {
        error!(couple_id = %couple_id, error = %err, "Failed to log airlock exchange");
    }
}

/// Handle one mediated message.
async fn airlock_message(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AirlockRequest>,
) -> Result<Json<AirlockResponse>, ApiError> {
    let (request, couple_id) = prepare(&state, body).await?;

    let reply = tokio::time::timeout(state.reply_timeout, state.mediator.invoke(&request))
        .await
        .map_err(|_| {
            warn!(user_id = %request.user_id, "Mediator reply timed out");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "mediator timed out".to_string(),
            )
        })?
        .map_err(|err| mediator_error(&err))?;

    if let Some(couple_id) = couple_id {
        log_exchange(&state, couple_id, &request, &reply.content).await;
    }

    Ok(Json(AirlockResponse {
        response: reply.content,
        timestamp: reply.produced_at,
    }))
}

/// Handle one mediated message as a server-sent event stream.
///
/// Fragments arrive as `data` events; the stream ends with a `done` or an
/// `error` event.
async fn airlock_stream(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AirlockRequest>,
) -> Result<Sse<KeepAliveStream<EventStream>>, ApiError> {
    let (request, couple_id) = prepare(&state, body).await?;
    let (tx, rx) = mpsc::unbounded();

    tokio::spawn(async move {
        let mut reply = String::new();
        let outcome = tokio::time::timeout(
            state.reply_timeout,
            state.mediator.invoke_streaming(&request, |fragment| {
                reply.push_str(fragment);
                // SSE cannot carry carriage returns.
                let data = fragment.replace('\r', "");
                let _ = tx.unbounded_send(Ok(Event::default().data(data)));
            }),
        )
        .await;

        let last = match outcome {
            Ok(Ok(())) => {
                if let Some(couple_id) = couple_id {
                    log_exchange(&state, couple_id, &request, &reply).await;
                }
                Event::default().event("done").data("[DONE]")
            }
            Ok(Err(err)) => Event::default().event("error").data(err.to_string()),
            Err(_) => {
                warn!(user_id = %request.user_id, "Mediator stream timed out");
                Event::default().event("error").data("mediator timed out")
            }
        };
        let _ = tx.unbounded_send(Ok(last));
    });

    Ok(Sse::new(rx).keep_alive(KeepAlive::default()))
}

/// Recent messages of a couple, oldest first.
async fn airlock_history(
    State(state): State<Arc<AppState>>,
    Path(couple_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<AirlockMessage>>, ApiError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);
    let messages = state
        .airlock
        .load_recent(couple_id, limit)
        .await
        .map_err(|err| store_error(&err))?;
    Ok(Json(messages))
}

/// The quiz catalog, in quiz order.
async fn quiz_modules() -> Json<&'static [AssessmentModule]> {
    Json(&MODULES)
}

/// Record one quiz answer.
async fn quiz_response(
    State(state): State<Arc<AppState>>,
    Json(response): Json<QuizResponse>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .assessments
        .record_response(response)
        .await
        .map_err(|err| store_error(&err))?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "status": "recorded" })),
    ))
}

/// Completion rollup for a user.
async fn dashboard(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<DashboardSummary>, ApiError> {
    let user_id = parse_user(user_id)?;
    let summary = state
        .assessments
        .dashboard(user_id)
        .await
        .map_err(|err| store_error(&err))?;
    Ok(Json(summary))
}
