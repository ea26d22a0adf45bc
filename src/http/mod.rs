//! Streaming HTTP transport.
//!
//! Two surfaces on one axum router:
//! - the MCP session transport: `GET /sse` opens an event stream whose
//!   first event names the message endpoint for that session, and
//!   `POST /message?sessionId=` feeds requests in; responses come back
//!   down the stream.
//! - a plain REST companion (`/health`, `/api/decks`, `/api/cards/due`,
//!   `/api/notes`) for direct non-protocol access.

mod session;

pub use session::SessionRegistry;

use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{
        sse::{Event as SseEvent, KeepAlive},
        IntoResponse, Response, Sse,
    },
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_stream::Stream;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info};

use crate::anki::AnkiClient;
use crate::config::{CardsConfig, Config};
use crate::error::Error;
use crate::mcp::format::preview;
use crate::mcp::McpServer;

/// Outbound channel depth per session.
const SESSION_CHANNEL_CAPACITY: usize = 32;

/// Shared router state. Owned here and passed via `with_state`; nothing
/// in this module is a process-wide singleton.
#[derive(Clone)]
pub struct AppState {
    mcp: Arc<McpServer>,
    sessions: Arc<SessionRegistry>,
    client: AnkiClient,
    cards: CardsConfig,
}

impl AppState {
    pub fn new(config: &Config) -> Result<Self, Error> {
        Ok(Self {
            mcp: Arc::new(McpServer::new(config)?),
            sessions: Arc::new(SessionRegistry::new()),
            client: AnkiClient::new(&config.ankiconnect)?,
            cards: config.cards.clone(),
        })
    }

    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.sessions
    }
}

/// Build the router.
pub fn router(state: AppState) -> Router {
    Router::new()
        // MCP session transport
        .route("/sse", get(sse_handler))
        .route("/message", post(message_handler))
        // REST companion
        .route("/health", get(health_handler))
        .route("/api/decks", get(list_decks_handler))
        .route("/api/cards/due", get(due_cards_handler))
        .route("/api/notes", post(add_note_handler))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Bind and serve until the process exits.
pub async fn serve(config: Config) -> Result<(), Error> {
    let addr: std::net::SocketAddr = config.http.bind.parse()?;
    let state = AppState::new(&config)?;
    let router = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("HTTP transport listening on http://{}", addr);
    axum::serve(listener, router).await?;
    Ok(())
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::SessionNotFound(_) => StatusCode::NOT_FOUND,
            Error::InvalidParams(_) | Error::Json(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::BAD_GATEWAY,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

// --- MCP session transport ---

/// SSE stream for one session.
///
/// First yields the `endpoint` event naming the message URL, then
/// relays queued responses. Dropping the stream (client disconnect)
/// removes the session from the registry.
struct SessionStream {
    session_id: String,
    registry: Arc<SessionRegistry>,
    rx: mpsc::Receiver<String>,
    endpoint_sent: bool,
}

impl Stream for SessionStream {
    type Item = Result<SseEvent, Infallible>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if !this.endpoint_sent {
            this.endpoint_sent = true;
            let data = format!("/message?sessionId={}", this.session_id);
            return Poll::Ready(Some(Ok(SseEvent::default().event("endpoint").data(data))));
        }

        match this.rx.poll_recv(cx) {
            Poll::Ready(Some(message)) => {
                Poll::Ready(Some(Ok(SseEvent::default().event("message").data(message))))
            }
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for SessionStream {
    fn drop(&mut self) {
        debug!(session = %self.session_id, "SSE stream closed");
        self.registry.remove(&self.session_id);
    }
}

async fn sse_handler(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    let session_id = uuid::Uuid::new_v4().to_string();
    let (tx, rx) = mpsc::channel(SESSION_CHANNEL_CAPACITY);
    state.sessions.insert(session_id.clone(), tx);

    info!(session = %session_id, "SSE client connected");

    let stream = SessionStream {
        session_id,
        registry: state.sessions.clone(),
        rx,
        endpoint_sent: false,
    };
    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[derive(Debug, Deserialize)]
struct MessageQuery {
    #[serde(rename = "sessionId")]
    session_id: String,
}

async fn message_handler(
    State(state): State<AppState>,
    Query(query): Query<MessageQuery>,
    Json(body): Json<Value>,
) -> Result<StatusCode, Error> {
    // A dead session gets not-found before any tool work happens.
    if !state.sessions.contains(&query.session_id) {
        return Err(Error::SessionNotFound(query.session_id));
    }

    let Some(response) = state.mcp.handle_message(body).await else {
        // Notification: accepted, nothing to stream back.
        return Ok(StatusCode::ACCEPTED);
    };

    let payload = serde_json::to_string(&response)?;
    state.sessions.send(&query.session_id, payload).await?;
    Ok(StatusCode::ACCEPTED)
}

// --- REST companion ---

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    sessions: usize,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        sessions: state.sessions.len(),
    })
}

#[derive(Debug, Serialize)]
struct DeckListResponse {
    count: usize,
    decks: Vec<String>,
}

async fn list_decks_handler(
    State(state): State<AppState>,
) -> Result<Json<DeckListResponse>, Error> {
    let decks = state.client.deck_names().await?;
    Ok(Json(DeckListResponse {
        count: decks.len(),
        decks,
    }))
}

#[derive(Debug, Deserialize)]
struct DueCardsQuery {
    deck: Option<String>,
    limit: Option<usize>,
}

#[derive(Debug, Serialize)]
struct DueCard {
    card_id: u64,
    deck: String,
    question: String,
    answer: String,
}

#[derive(Debug, Serialize)]
struct DueCardsResponse {
    total: usize,
    cards: Vec<DueCard>,
}

async fn due_cards_handler(
    State(state): State<AppState>,
    Query(query): Query<DueCardsQuery>,
) -> Result<Json<DueCardsResponse>, Error> {
    let mut search = "is:due".to_string();
    if let Some(deck) = &query.deck {
        search.push_str(&format!(r#" deck:"{}""#, deck));
    }

    let ids = state.client.find_cards(&search).await?;
    if ids.is_empty() {
        return Ok(Json(DueCardsResponse {
            total: 0,
            cards: Vec::new(),
        }));
    }

    let limit = query.limit.unwrap_or(state.cards.limit);
    let shown: Vec<u64> = ids.iter().take(limit).copied().collect();
    let infos = state.client.cards_info(&shown).await?;

    let cards = infos
        .into_iter()
        .map(|card| DueCard {
            card_id: card.card_id,
            deck: card.deck_name,
            question: preview(&card.question, state.cards.preview_chars),
            answer: preview(&card.answer, state.cards.preview_chars),
        })
        .collect();

    Ok(Json(DueCardsResponse {
        total: ids.len(),
        cards,
    }))
}

#[derive(Debug, Deserialize)]
struct AddNoteRequest {
    deck: String,
    model: String,
    fields: serde_json::Map<String, Value>,
    #[serde(default)]
    tags: Vec<String>,
}

async fn add_note_handler(
    State(state): State<AppState>,
    Json(request): Json<AddNoteRequest>,
) -> Result<(StatusCode, Json<Value>), Error> {
    let note = crate::anki::NewNote {
        deck_name: request.deck,
        model_name: request.model,
        fields: request.fields,
        tags: request.tags,
        options: crate::anki::NoteOptions::default(),
    };

    let note_id = state.client.add_note(&note).await?;
    Ok((StatusCode::CREATED, Json(json!({ "note_id": note_id }))))
}
