use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ResponderError;
use crate::responder::Responder;

#[derive(Debug, Serialize)]
struct AnswerRequest<'a> {
    query: &'a str,
}

#[derive(Debug, Deserialize)]
struct AnswerResponse {
    reply: String,
}

/// In-process alternative to the script responder: POSTs the query to a
/// service and reads `{"reply": ...}` back.
pub struct HttpResponder {
    client: reqwest::Client,
    url: String,
}

impl HttpResponder {
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build responder HTTP client")?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl Responder for HttpResponder {
    async fn respond(&self, query: &str) -> Result<String, ResponderError> {
        debug!("Sending query to responder: {}", self.url);

        let response = self
            .client
            .post(&self.url)
            .json(&AnswerRequest { query })
            .send()
            .await
            .map_err(|e| ResponderError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ResponderError::Http(format!("status {}: {}", status, body)));
        }

        let answer: AnswerResponse = response
            .json()
            .await
            .map_err(|e| ResponderError::Http(format!("invalid response body: {}", e)))?;

        let reply = answer.reply.trim();
        if reply.is_empty() {
            return Err(ResponderError::EmptyReply);
        }
        Ok(reply.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    #[tokio::test]
    async fn test_reply_is_trimmed() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/answer")
            .match_body(Matcher::Json(json!({ "query": "парковка" })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({ "reply": "  Ответ X\n" }).to_string())
            .create_async()
            .await;

        let responder =
            HttpResponder::new(&format!("{}/answer", server.url()), Duration::from_secs(5)).unwrap();
        assert_eq!(responder.respond("парковка").await.unwrap(), "Ответ X");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_status_is_failure() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/answer")
            .with_status(503)
            .with_body("overloaded")
            .create_async()
            .await;

        let responder =
            HttpResponder::new(&format!("{}/answer", server.url()), Duration::from_secs(5)).unwrap();
        let err = responder.respond("foo").await.unwrap_err();
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_blank_reply_is_failure() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/answer")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({ "reply": "" }).to_string())
            .create_async()
            .await;

        let responder =
            HttpResponder::new(&format!("{}/answer", server.url()), Duration::from_secs(5)).unwrap();
        assert!(matches!(
            responder.respond("foo").await,
            Err(ResponderError::EmptyReply)
        ));
    }
}
