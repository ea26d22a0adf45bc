//! HTTP client for the AnkiConnect endpoint.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, error};

use super::{AnkiRequest, AnkiResponse, CardAnswer, NewNote};
use crate::config::AnkiConnectConfig;
use crate::error::Error;

/// Client for the local AnkiConnect HTTP API.
///
/// Every call is a single POST of an `{action, version, params}` envelope;
/// a non-null `error` in the response surfaces as [`Error::AnkiConnect`].
#[derive(Debug, Clone)]
pub struct AnkiClient {
    http: reqwest::Client,
    url: String,
}

impl AnkiClient {
    /// Create a client for the configured endpoint.
    pub fn new(config: &AnkiConnectConfig) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            url: config.url.clone(),
        })
    }

    /// Endpoint URL this client talks to.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Invoke one AnkiConnect action and deserialize its `result`.
    pub async fn invoke<P, R>(&self, action: &'static str, params: P) -> Result<R, Error>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        debug!(action, "AnkiConnect request");

        let request = AnkiRequest::new(action, params);
        let response = self
            .http
            .post(&self.url)
            .json(&request)
            .send()
            .await?
            .error_for_status()?;

        let body: AnkiResponse = response.json().await?;
        if let Some(message) = body.error {
            error!(action, error = %message, "AnkiConnect error");
            return Err(Error::AnkiConnect(message));
        }

        serde_json::from_value(body.result).map_err(Error::Json)
    }

    /// List all deck names.
    pub async fn deck_names(&self) -> Result<Vec<String>, Error> {
        self.invoke("deckNames", json!({})).await
    }

    /// List all note model names.
    pub async fn model_names(&self) -> Result<Vec<String>, Error> {
        self.invoke("modelNames", json!({})).await
    }

    /// Find card ids matching an Anki search query.
    pub async fn find_cards(&self, query: &str) -> Result<Vec<u64>, Error> {
        self.invoke("findCards", json!({ "query": query })).await
    }

    /// Fetch details for the given card ids.
    pub async fn cards_info(&self, cards: &[u64]) -> Result<Vec<super::CardInfo>, Error> {
        self.invoke("cardsInfo", json!({ "cards": cards })).await
    }

    /// Create a note; returns the new note id.
    pub async fn add_note(&self, note: &NewNote) -> Result<u64, Error> {
        self.invoke("addNote", json!({ "note": note })).await
    }

    /// Answer reviews for the given cards.
    pub async fn answer_cards(&self, answers: &[CardAnswer]) -> Result<Vec<bool>, Error> {
        self.invoke("answerCards", json!({ "answers": answers }))
            .await
    }

    /// AnkiConnect API version, used as a liveness probe.
    pub async fn version(&self) -> Result<u64, Error> {
        self.invoke("version", json!({})).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_for(url: String) -> AnkiClient {
        AnkiClient::new(&AnkiConnectConfig {
            url,
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_invoke_unwraps_result() {
        let server = httpmock::MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(httpmock::Method::POST)
                .path("/")
                .json_body_partial(r#"{"action": "deckNames", "version": 6}"#);
            then.status(200)
                .json_body(json!({"result": ["Default", "Japanese"], "error": null}));
        });

        let client = client_for(server.base_url());
        let decks = client.deck_names().await.unwrap();

        mock.assert();
        assert_eq!(decks, vec!["Default", "Japanese"]);
    }

    #[tokio::test]
    async fn test_invoke_surfaces_upstream_error() {
        let server = httpmock::MockServer::start();
        server.mock(|when, then| {
            when.method(httpmock::Method::POST).path("/");
            then.status(200)
                .json_body(json!({"result": null, "error": "deck was not found"}));
        });

        let client = client_for(server.base_url());
        let err = client.deck_names().await.unwrap_err();

        match err {
            Error::AnkiConnect(message) => assert!(message.contains("deck was not found")),
            other => panic!("expected AnkiConnect error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_invoke_fails_on_http_status() {
        let server = httpmock::MockServer::start();
        server.mock(|when, then| {
            when.method(httpmock::Method::POST).path("/");
            then.status(500);
        });

        let client = client_for(server.base_url());
        assert!(matches!(
            client.deck_names().await,
            Err(Error::Http(_))
        ));
    }
}
