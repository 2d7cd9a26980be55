//! Router for the chat API

use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use anyhow::anyhow;
use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, sse::Event, sse::KeepAlive, sse::Sse},
    routing::{get, post},
};
use tokio::sync::{mpsc, oneshot};
use tokio_stream::StreamExt as _;
use tokio_stream::wrappers::UnboundedReceiverStream;

use super::public;
use crate::ai::chat::Session;
use crate::api::public::ApiError;
use crate::api::state::AppState;
use crate::openai::{Message, Role};

type SharedState = Arc<RwLock<AppState>>;

fn poisoned<T>(_: T) -> ApiError {
    anyhow!("Shared state lock poisoned").into()
}

/// Get a single chat session by ID
async fn chat_session(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state.read().map_err(poisoned)?.sessions.get(&id).cloned();

    let Some(session) = session else {
        return Ok((
            StatusCode::NOT_FOUND,
            format!("Chat session {} not found", id),
        )
            .into_response());
    };

    Ok(axum::Json(session).into_response())
}

/// End a chat session
async fn delete_chat_session(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let mut shared_state = state.write().map_err(poisoned)?;

    let Some(session) = shared_state.sessions.get(&id) else {
        return Ok((
            StatusCode::NOT_FOUND,
            format!("Chat session {} not found", id),
        )
            .into_response());
    };
    if session.is_loading() {
        return Ok((
            StatusCode::CONFLICT,
            format!("Chat session {} is still responding", id),
        )
            .into_response());
    }

    shared_state.sessions.remove(&id);
    Ok(StatusCode::NO_CONTENT.into_response())
}

/// Add a message to a chat session and stream the response.
///
/// Fragments of the reply are sent as `delta` events followed by a
/// single `done` event with the final reply and any recommendations.
async fn chat_handler(
    State(state): State<SharedState>,
    axum::Json(payload): axum::Json<public::ChatRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if payload.message.trim().is_empty() {
        return Ok((StatusCode::BAD_REQUEST, "Message is empty").into_response());
    }

    let session_id = payload.session_id;
    let (transcript, advisor) = {
        let mut shared_state = state.write().map_err(poisoned)?;
        let ttl = shared_state.config.session_ttl;
        let evicted = shared_state.evict_idle(Instant::now(), ttl);
        if evicted > 0 {
            tracing::debug!("Evicted {} idle chat sessions", evicted);
        }

        let advisor = Arc::clone(&shared_state.advisor);
        let session = shared_state
            .sessions
            .entry(session_id.clone())
            .or_insert_with(|| Session::with_greeting(&session_id));

        // One turn at a time per session
        if session.is_loading() {
            return Ok((
                StatusCode::CONFLICT,
                format!("Chat session {} is still responding", session_id),
            )
                .into_response());
        }

        session.push(Message::new(Role::User, &payload.message));
        session.set_loading(true);
        (session.transcript().messages().to_vec(), advisor)
    };

    let (tx, rx) = mpsc::unbounded_channel::<String>();
    let (done_tx, done_rx) = oneshot::channel::<public::ChatDone>();

    // Get the next response
    let task_state = Arc::clone(&state);
    tokio::spawn(async move {
        let turn = advisor.turn(&transcript, Some(tx)).await;
        tracing::info!("Chat session {} turn finished: {:?}", session_id, turn.path);

        match task_state.write() {
            Ok(mut shared_state) => {
                if let Some(session) = shared_state.sessions.get_mut(&session_id) {
                    session.push(Message::new(Role::Assistant, &turn.reply));
                    if let Some(recommendations) = &turn.recommendations {
                        session.publish_recommendations(recommendations.clone());
                    }
                    session.set_loading(false);
                }
            }
            Err(e) => tracing::error!("Unable to save chat turn: {}", e),
        }

        // The client may already be gone
        let _ = done_tx.send(public::ChatDone {
            message: turn.reply,
            recommendations: turn.recommendations,
            path: turn.path,
        });
    });

    let deltas = UnboundedReceiverStream::new(rx).map(|content| {
        Event::default()
            .event("delta")
            .json_data(public::ChatDelta { content })
    });
    let done = futures_util::stream::once(async move {
        let done = done_rx.await.unwrap_or_else(|_| public::ChatDone::failed());
        Event::default().event("done").json_data(done)
    });

    let resp = Sse::new(deltas.chain(done))
        .keep_alive(
            KeepAlive::default()
                .text("keep-alive")
                .interval(Duration::from_secs(5)),
        )
        .into_response();

    Ok(resp)
}

/// Create the chat router
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", post(chat_handler))
        .route("/{id}", get(chat_session).delete(delete_chat_session))
}
