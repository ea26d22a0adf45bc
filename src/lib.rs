//! anki-mcp library.
//!
//! MCP adapter exposing Anki flashcards to AI tools via AnkiConnect.

pub mod anki;
pub mod config;
pub mod error;
pub mod http;
pub mod mcp;

pub use error::Error;
