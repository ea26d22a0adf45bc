//! AnkiConnect request forwarder.
//!
//! Everything Anki-side (decks, notes, models, cards) is owned by the
//! external application; these types mirror just enough of its wire
//! format to build requests and read responses.

mod client;

pub use client::AnkiClient;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// AnkiConnect protocol version sent in every envelope.
pub const ANKICONNECT_VERSION: u32 = 6;

/// Request envelope: `{action, version, params}`.
#[derive(Debug, Serialize)]
pub struct AnkiRequest<P> {
    pub action: &'static str,
    pub version: u32,
    pub params: P,
}

impl<P> AnkiRequest<P> {
    pub fn new(action: &'static str, params: P) -> Self {
        Self {
            action,
            version: ANKICONNECT_VERSION,
            params,
        }
    }
}

/// Response envelope: `{result, error}`.
#[derive(Debug, Deserialize)]
pub struct AnkiResponse {
    #[serde(default)]
    pub result: Value,
    #[serde(default)]
    pub error: Option<String>,
}

/// Note to create via `addNote`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNote {
    pub deck_name: String,
    pub model_name: String,
    pub fields: serde_json::Map<String, Value>,
    pub tags: Vec<String>,
    pub options: NoteOptions,
}

/// `addNote` options.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteOptions {
    pub allow_duplicate: bool,
}

impl Default for NoteOptions {
    fn default() -> Self {
        Self {
            allow_duplicate: false,
        }
    }
}

/// Card details from `cardsInfo`. Fields Anki returns that we never
/// read are simply not modeled.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardInfo {
    pub card_id: u64,
    #[serde(default)]
    pub deck_name: String,
    #[serde(default)]
    pub model_name: String,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub answer: String,
}

/// One card answer for `answerCards`.
///
/// The ease is passed through as-is; Anki decides what an out-of-range
/// value means.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardAnswer {
    pub card_id: u64,
    pub ease: u64,
}
