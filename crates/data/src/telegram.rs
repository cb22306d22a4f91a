//! Delivers CSV tables to a Telegram chat through the Bot API.

use crate::csv_tables::{file_name, RenderedTables, TableKind};
use async_trait::async_trait;
use depthwatch_core::{BatchSink, CollectorError, ExportError, SampleRecord, TelegramConfig};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use std::time::Duration;

/// Environment variable holding the bot token.
pub const TELEGRAM_TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";

const SINK_NAME: &str = "telegram";

/// Uploads the spread and depth tables with `sendDocument`.
pub struct TelegramSink {
    http: Client,
    api_url: String,
    token: SecretString,
    chat_id: String,
}

impl std::fmt::Debug for TelegramSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramSink")
            .field("api_url", &self.api_url)
            .field("chat_id", &self.chat_id)
            .finish_non_exhaustive()
    }
}

impl TelegramSink {
    /// # Errors
    /// Returns `FatalConfiguration` if the HTTP client cannot be built.
    pub fn new(
        api_url: impl Into<String>,
        token: SecretString,
        chat_id: impl Into<String>,
    ) -> Result<Self, CollectorError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| CollectorError::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token,
            chat_id: chat_id.into(),
        })
    }

    /// Builds the sink from `[sinks.telegram]`, reading the token from
    /// `TELEGRAM_BOT_TOKEN`.
    ///
    /// # Errors
    /// Returns `FatalConfiguration` if the token is missing or empty.
    pub fn from_config(config: &TelegramConfig) -> Result<Self, CollectorError> {
        let token = std::env::var(TELEGRAM_TOKEN_ENV)
            .ok()
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| {
                CollectorError::config(format!("{TELEGRAM_TOKEN_ENV} is not set"))
            })?;
        Self::new(&config.api_url, SecretString::from(token), &config.chat_id)
    }

    async fn send_document(&self, file_name: String, content: Vec<u8>) -> Result<(), ExportError> {
        let url = format!(
            "{}/bot{}/sendDocument",
            self.api_url,
            self.token.expose_secret()
        );
        let document = Part::bytes(content)
            .file_name(file_name.clone())
            .mime_str("text/csv")
            .map_err(|e| ExportError::delivery(SINK_NAME, e.to_string()))?;
        let form = Form::new()
            .text("chat_id", self.chat_id.clone())
            .part("document", document);

        // The URL embeds the token; never log it or the raw reqwest error.
        let response = self
            .http
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                ExportError::delivery(SINK_NAME, format!("request failed: {}", e.without_url()))
            })?;

        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);
        if !status.is_success() || body["ok"] != Value::Bool(true) {
            let description = body["description"].as_str().unwrap_or("no description");
            return Err(ExportError::delivery(
                SINK_NAME,
                format!("HTTP {}: {}", status.as_u16(), description),
            ));
        }

        tracing::debug!("Sent {} to chat {}", file_name, self.chat_id);
        Ok(())
    }
}

#[async_trait]
impl BatchSink for TelegramSink {
    fn name(&self) -> &str {
        SINK_NAME
    }

    async fn export(
        &self,
        exchange: &str,
        symbol: &str,
        batch: &[SampleRecord],
    ) -> Result<(), ExportError> {
        let tables = RenderedTables::render(batch)?;

        for kind in [TableKind::Spread, TableKind::Depth] {
            let name = file_name(exchange, symbol, kind, tables.date);
            self.send_document(name, tables.table(kind).to_vec()).await?;
        }
        Ok(())
    }
}
