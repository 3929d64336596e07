use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Device tokens issued by Expo always start with this.
pub const PUSH_TOKEN_PREFIX: &str = "ExponentPushToken[";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushRequest {
    pub expo_push_token: Option<String>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub data: Option<Value>,
}

/// Wire message for the Expo push API.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PushMessage {
    pub to: String,
    pub sound: &'static str,
    pub title: String,
    pub body: String,
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushTicket {
    pub id: Option<String>,
}

#[derive(Debug, Error)]
pub enum PushError {
    #[error("{0}")]
    Validation(String),

    /// The push service accepted the call but refused the message.
    #[error("{0}")]
    Delivery(String),

    #[error("push service unreachable: {0}")]
    Transport(String),
}

impl PushRequest {
    pub fn into_message(self) -> Result<PushMessage, PushError> {
        let token = self
            .expo_push_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| PushError::Validation("Expo push token is required".into()))?;
        if !token.starts_with(PUSH_TOKEN_PREFIX) {
            return Err(PushError::Validation("Invalid Expo push token format".into()));
        }

        let (title, body) = match (
            self.title.filter(|t| !t.is_empty()),
            self.body.filter(|b| !b.is_empty()),
        ) {
            (Some(title), Some(body)) => (title, body),
            _ => return Err(PushError::Validation("Title and body are required".into())),
        };

        Ok(PushMessage {
            to: token,
            sound: "default",
            title,
            body,
            data: self.data.unwrap_or_else(|| Value::Object(Default::default())),
        })
    }
}

#[derive(Deserialize)]
struct PushResponse {
    #[serde(default)]
    data: Option<TicketBody>,
    #[serde(default)]
    errors: Vec<RequestError>,
}

#[derive(Deserialize)]
struct TicketBody {
    status: String,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Deserialize)]
struct RequestError {
    #[serde(default)]
    message: Option<String>,
}

pub struct ExpoPushClient {
    url: String,
    client: reqwest::Client,
}

impl ExpoPushClient {
    pub fn new(url: String, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build push HTTP client")?;
        Ok(Self { url, client })
    }

    pub async fn send(&self, message: &PushMessage) -> Result<PushTicket, PushError> {
        let resp = self
            .client
            .post(&self.url)
            .header("Accept", "application/json")
            .json(message)
            .send()
            .await
            .map_err(|e| PushError::Transport(e.to_string()))?;

        let status = resp.status();
        let parsed: PushResponse = resp
            .json()
            .await
            .map_err(|e| PushError::Transport(format!("HTTP {status}: {e}")))?;

        if let Some(err) = parsed.errors.into_iter().next() {
            return Err(PushError::Delivery(
                err.message.unwrap_or_else(|| "Failed to send notification".into()),
            ));
        }

        match parsed.data {
            Some(ticket) if ticket.status == "error" => Err(PushError::Delivery(
                ticket.message.unwrap_or_else(|| "Failed to send notification".into()),
            )),
            Some(ticket) => Ok(PushTicket { id: ticket.id }),
            None => Err(PushError::Transport(format!("HTTP {status}: response had no ticket"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn request(token: &str, title: &str, body: &str) -> PushRequest {
        PushRequest {
            expo_push_token: Some(token.into()),
            title: Some(title.into()),
            body: Some(body.into()),
            data: None,
        }
    }

    #[test]
    fn builds_message_with_defaults() {
        let msg = request("ExponentPushToken[abc]", "Hi", "There").into_message().unwrap();
        assert_eq!(msg.sound, "default");
        assert_eq!(msg.data, json!({}));
    }

    #[test]
    fn rejects_bad_tokens_and_missing_fields() {
        let err = PushRequest::default().into_message().unwrap_err();
        assert_eq!(err.to_string(), "Expo push token is required");

        let err = request("abc", "Hi", "There").into_message().unwrap_err();
        assert_eq!(err.to_string(), "Invalid Expo push token format");

        let err = request("ExponentPushToken[abc]", "", "There").into_message().unwrap_err();
        assert_eq!(err.to_string(), "Title and body are required");
    }
}
