//! Promise-style bridge over the portal's REST webhook endpoint.
//!
//! Bitrix reports failures as values inside a 200 response:
//! `{"result": ...}` on success, `{"error": "...", "error_description":
//! "..."}` otherwise. This module is the single place that convention is
//! translated into `Result`, so the orchestrator only ever sees `?`-able
//! errors.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::core::error::ScheduleError;

/// One remote procedure call against the portal.
#[async_trait]
pub trait Bridge: Send + Sync {
    async fn invoke(&self, method: &str, params: Value) -> Result<Value, ScheduleError>;
}

pub struct RestBridge {
    http: Client,
    webhook_url: String,
}

impl RestBridge {
    pub fn new(webhook_url: &str) -> Self {
        Self {
            http: Client::new(),
            webhook_url: webhook_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl Bridge for RestBridge {
    async fn invoke(&self, method: &str, params: Value) -> Result<Value, ScheduleError> {
        let url = format!("{}/{}.json", self.webhook_url, method);
        tracing::debug!(%method, "calling portal");

        let response = self.http.post(&url).json(&params).send().await?;
        let body: Value = response.json().await?;

        if let Some(error) = body.get("error") {
            let message = body
                .get("error_description")
                .and_then(Value::as_str)
                .or_else(|| error.as_str())
                .unwrap_or("unknown portal error")
                .to_string();
            return Err(ScheduleError::RemoteCall {
                method: method.to_string(),
                message,
            });
        }

        Ok(body.get("result").cloned().unwrap_or(Value::Null))
    }
}
