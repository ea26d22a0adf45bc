//! Tool catalog and dispatch.
//!
//! Tools live in one static table of (name, description, schema, handler).
//! The registry checks the table at startup so a tool can never be
//! advertised without a callable handler behind a well-formed schema.

use std::future::Future;
use std::pin::Pin;

use serde_json::{json, Map, Value};
use tracing::debug;

use super::format::{ease_label, format_deck_list, preview};
use crate::anki::{AnkiClient, CardAnswer, NewNote, NoteOptions};
use crate::config::CardsConfig;
use crate::error::Error;

/// Shared context handed to every tool handler.
#[derive(Debug, Clone)]
pub struct ToolContext {
    pub client: AnkiClient,
    pub cards: CardsConfig,
}

type ToolFuture<'a> = Pin<Box<dyn Future<Output = Result<String, Error>> + Send + 'a>>;
type ToolHandler = for<'a> fn(&'a ToolContext, &'a Value) -> ToolFuture<'a>;

/// One entry in the tool table.
struct ToolDef {
    name: &'static str,
    description: &'static str,
    schema: fn() -> Value,
    handler: ToolHandler,
}

/// The static tool table.
const TOOLS: &[ToolDef] = &[
    ToolDef {
        name: "list_decks",
        description: "List all Anki decks, with subdecks grouped under their parent deck.",
        schema: no_args_schema,
        handler: list_decks_handler,
    },
    ToolDef {
        name: "list_models",
        description: "List all Anki note models (note types).",
        schema: no_args_schema,
        handler: list_models_handler,
    },
    ToolDef {
        name: "get_due_cards",
        description: "Fetch cards currently due for review, with question/answer previews.",
        schema: card_query_schema,
        handler: get_due_cards_handler,
    },
    ToolDef {
        name: "get_new_cards",
        description: "Fetch new (unstudied) cards, with question/answer previews.",
        schema: card_query_schema,
        handler: get_new_cards_handler,
    },
    ToolDef {
        name: "create_note",
        description: "Create a new note in a deck using the given model and field values.",
        schema: create_note_schema,
        handler: create_note_handler,
    },
    ToolDef {
        name: "answer_card",
        description: "Answer a card review with an ease of 1 (Again) to 4 (Easy).",
        schema: answer_card_schema,
        handler: answer_card_handler,
    },
];

fn list_decks_handler<'a>(ctx: &'a ToolContext, args: &'a Value) -> ToolFuture<'a> {
    Box::pin(list_decks(ctx, args))
}

fn list_models_handler<'a>(ctx: &'a ToolContext, args: &'a Value) -> ToolFuture<'a> {
    Box::pin(list_models(ctx, args))
}

fn get_due_cards_handler<'a>(ctx: &'a ToolContext, args: &'a Value) -> ToolFuture<'a> {
    Box::pin(get_due_cards(ctx, args))
}

fn get_new_cards_handler<'a>(ctx: &'a ToolContext, args: &'a Value) -> ToolFuture<'a> {
    Box::pin(get_new_cards(ctx, args))
}

fn create_note_handler<'a>(ctx: &'a ToolContext, args: &'a Value) -> ToolFuture<'a> {
    Box::pin(create_note(ctx, args))
}

fn answer_card_handler<'a>(ctx: &'a ToolContext, args: &'a Value) -> ToolFuture<'a> {
    Box::pin(answer_card(ctx, args))
}

fn no_args_schema() -> Value {
    json!({
        "type": "object",
        "properties": {},
        "required": []
    })
}

fn card_query_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "deck": {
                "type": "string",
                "description": "Restrict to one deck (full name, including :: for subdecks)"
            },
            "limit": {
                "type": "integer",
                "description": "Maximum number of cards to return"
            }
        },
        "required": []
    })
}

fn create_note_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "deck": {
                "type": "string",
                "description": "Target deck name"
            },
            "model": {
                "type": "string",
                "description": "Note model name, e.g. 'Basic'"
            },
            "fields": {
                "type": "object",
                "description": "Field name to value, e.g. {\"Front\": \"...\", \"Back\": \"...\"}"
            },
            "tags": {
                "type": "array",
                "items": { "type": "string" },
                "description": "Optional tags"
            }
        },
        "required": ["deck", "model", "fields"]
    })
}

fn answer_card_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "card_id": {
                "type": "integer",
                "description": "Card id to answer"
            },
            "ease": {
                "type": "integer",
                "description": "1 = Again, 2 = Hard, 3 = Good, 4 = Easy"
            }
        },
        "required": ["card_id", "ease"]
    })
}

/// Validated tool registry built from the static table.
pub struct ToolRegistry {
    tools: &'static [ToolDef],
}

impl ToolRegistry {
    /// Build the registry, checking the table for duplicate names and
    /// non-object schemas.
    pub fn new() -> Result<Self, Error> {
        for (i, tool) in TOOLS.iter().enumerate() {
            if TOOLS[..i].iter().any(|t| t.name == tool.name) {
                return Err(Error::InvalidParams(format!(
                    "duplicate tool name in catalog: {}",
                    tool.name
                )));
            }
            let schema = (tool.schema)();
            if schema.get("type").and_then(Value::as_str) != Some("object") {
                return Err(Error::InvalidParams(format!(
                    "tool {} schema is not object-typed",
                    tool.name
                )));
            }
        }
        Ok(Self { tools: TOOLS })
    }

    /// Tool catalog for `tools/list`.
    pub fn list(&self) -> Value {
        let tools: Vec<Value> = self
            .tools
            .iter()
            .map(|tool| {
                json!({
                    "name": tool.name,
                    "description": tool.description,
                    "inputSchema": (tool.schema)(),
                })
            })
            .collect();
        json!({ "tools": tools })
    }

    /// Dispatch one tool call; the result is an MCP `content` payload.
    pub async fn call(&self, ctx: &ToolContext, name: &str, args: &Value) -> Result<Value, Error> {
        let tool = self
            .tools
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| Error::UnknownTool(name.to_string()))?;

        debug!(tool = name, "tool call");
        let text = (tool.handler)(ctx, args).await?;

        Ok(json!({
            "content": [
                {
                    "type": "text",
                    "text": text
                }
            ]
        }))
    }
}

// --- argument helpers ---

fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str, Error> {
    args.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| Error::InvalidParams(format!("missing {} parameter", key)))
}

fn required_u64(args: &Value, key: &str) -> Result<u64, Error> {
    args.get(key)
        .and_then(Value::as_u64)
        .ok_or_else(|| Error::InvalidParams(format!("missing {} parameter", key)))
}

// --- handlers ---

async fn list_decks(ctx: &ToolContext, _args: &Value) -> Result<String, Error> {
    let names = ctx.client.deck_names().await?;
    Ok(format_deck_list(&names))
}

async fn list_models(ctx: &ToolContext, _args: &Value) -> Result<String, Error> {
    let names = ctx.client.model_names().await?;
    if names.is_empty() {
        return Ok("No models found.".to_string());
    }
    let mut out = format!("🗂 {} model(s):\n", names.len());
    for name in &names {
        out.push_str(&format!("- {}\n", name));
    }
    Ok(out)
}

async fn get_due_cards(ctx: &ToolContext, args: &Value) -> Result<String, Error> {
    list_cards(ctx, args, "is:due", "due").await
}

async fn get_new_cards(ctx: &ToolContext, args: &Value) -> Result<String, Error> {
    list_cards(ctx, args, "is:new", "new").await
}

/// find-then-info: one `findCards` query, then `cardsInfo` on the first
/// `limit` ids. Zero matches short-circuits before the details call.
async fn list_cards(
    ctx: &ToolContext,
    args: &Value,
    base_query: &str,
    kind: &str,
) -> Result<String, Error> {
    let limit = args
        .get("limit")
        .and_then(Value::as_u64)
        .map(|n| n as usize)
        .unwrap_or(ctx.cards.limit);

    let mut query = base_query.to_string();
    if let Some(deck) = args.get("deck").and_then(Value::as_str) {
        query.push_str(&format!(r#" deck:"{}""#, deck));
    }

    let ids = ctx.client.find_cards(&query).await?;
    if ids.is_empty() {
        return Ok(format!("Found 0 {} cards.", kind));
    }

    let shown: Vec<u64> = ids.iter().take(limit).copied().collect();
    let cards = ctx.client.cards_info(&shown).await?;

    let mut out = format!(
        "Found {} {} card(s), showing {}:\n\n",
        ids.len(),
        kind,
        cards.len()
    );
    for card in &cards {
        out.push_str(&format!(
            "🃏 Card {} [{}]\n   Q: {}\n   A: {}\n",
            card.card_id,
            card.deck_name,
            preview(&card.question, ctx.cards.preview_chars),
            preview(&card.answer, ctx.cards.preview_chars),
        ));
    }
    Ok(out)
}

async fn create_note(ctx: &ToolContext, args: &Value) -> Result<String, Error> {
    let deck = required_str(args, "deck")?;
    let model = required_str(args, "model")?;
    let fields: &Map<String, Value> = args
        .get("fields")
        .and_then(Value::as_object)
        .ok_or_else(|| Error::InvalidParams("missing fields parameter".to_string()))?;
    let tags: Vec<String> = args
        .get("tags")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let note = NewNote {
        deck_name: deck.to_string(),
        model_name: model.to_string(),
        fields: fields.clone(),
        tags,
        options: NoteOptions::default(),
    };

    let note_id = ctx.client.add_note(&note).await?;
    Ok(format!("✅ Created note {} in deck '{}'.", note_id, deck))
}

async fn answer_card(ctx: &ToolContext, args: &Value) -> Result<String, Error> {
    let card_id = required_u64(args, "card_id")?;
    let ease = required_u64(args, "ease")?;

    ctx.client
        .answer_cards(&[CardAnswer { card_id, ease }])
        .await?;

    let label = ease_label(ease)
        .map(|l| format!(" ({})", l))
        .unwrap_or_default();
    Ok(format!("🎯 Answered card {} with ease {}{}.", card_id, ease, label))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_validates() {
        let registry = ToolRegistry::new().unwrap();
        let catalog = registry.list();
        let tools = catalog.get("tools").and_then(Value::as_array).unwrap();
        assert_eq!(tools.len(), 6);

        for tool in tools {
            let schema = tool.get("inputSchema").unwrap();
            assert_eq!(schema.get("type").and_then(Value::as_str), Some("object"));
        }
    }

    #[test]
    fn test_catalog_names() {
        let registry = ToolRegistry::new().unwrap();
        let catalog = registry.list();
        let names: Vec<&str> = catalog["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(
            names,
            vec![
                "list_decks",
                "list_models",
                "get_due_cards",
                "get_new_cards",
                "create_note",
                "answer_card"
            ]
        );
    }

    #[test]
    fn test_required_str_missing() {
        let args = json!({});
        assert!(matches!(
            required_str(&args, "deck"),
            Err(Error::InvalidParams(_))
        ));
    }
}
