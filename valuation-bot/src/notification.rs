//! Notification module for delivering reports.
//!
//! Reports go to a DingTalk custom robot as markdown messages:
//!
//! ```text
//! POST <webhook_url>
//! {"msgtype": "markdown", "markdown": {"title": "...", "text": "..."}}
//! ```
//!
//! DingTalk answers HTTP 200 even for rejected messages, so delivery only
//! counts when the body also says `errcode == 0`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info};

/// Fixed request timeout.
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Serialize)]
struct MarkdownMessage<'a> {
    msgtype: &'static str,
    markdown: MarkdownBody<'a>,
}

#[derive(Debug, Serialize)]
struct MarkdownBody<'a> {
    title: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct SendMessageResponse {
    errcode: Option<i64>,
    #[serde(default)]
    errmsg: String,
}

/// Why a message was not delivered.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("webhook request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("webhook returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("DingTalk rejected the message (errcode {errcode}): {errmsg}")]
    Rejected { errcode: i64, errmsg: String },

    #[error("unreadable webhook response: {0}")]
    Parse(String),
}

/// Delivers report text to a chat channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// `true` only when the channel confirmed delivery.
    async fn send(&self, text: &str) -> bool;
}

/// DingTalk markdown robot.
pub struct DingTalkNotifier {
    webhook_url: String,
    title: String,
    client: reqwest::Client,
}

impl DingTalkNotifier {
    pub fn new(webhook_url: impl Into<String>, title: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            webhook_url: webhook_url.into(),
            title: title.into(),
            client,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Send once and report why delivery failed, if it did.
    pub async fn try_send(&self, text: &str) -> Result<(), DispatchError> {
        let message = MarkdownMessage {
            msgtype: "markdown",
            markdown: MarkdownBody {
                title: &self.title,
                text,
            },
        };

        let response = self
            .client
            .post(&self.webhook_url)
            .json(&message)
            .send()
            .await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(DispatchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        debug!(body = %body, "DingTalk response");

        let result: SendMessageResponse =
            serde_json::from_str(&body).map_err(|e| DispatchError::Parse(e.to_string()))?;

        match result.errcode {
            Some(0) => Ok(()),
            Some(errcode) => Err(DispatchError::Rejected {
                errcode,
                errmsg: result.errmsg,
            }),
            None => Err(DispatchError::Parse(format!("missing errcode in {}", body))),
        }
    }
}

#[async_trait]
impl Notifier for DingTalkNotifier {
    async fn send(&self, text: &str) -> bool {
        info!(title = %self.title, "Sending message to DingTalk");
        match self.try_send(text).await {
            Ok(()) => {
                info!("DingTalk message sent");
                true
            }
            Err(e) => {
                error!(error = %e, "DingTalk delivery failed");
                false
            }
        }
    }
}
