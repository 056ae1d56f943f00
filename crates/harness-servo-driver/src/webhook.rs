//! Workflow engine client: webhook triggers and execution status.

use std::collections::BTreeMap;

use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use harness_servo_core::HarnessConfig;

use crate::error::{AdjustError, AdjustResult};

const API_KEY_HEADER: &str = "X-API-KEY";

/// Body of a webhook trigger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriggerRequest {
    pub application: String,
    /// Top-level flag read by the canary adjust workflow.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adjust: Option<String>,
    pub parameters: BTreeMap<String, Value>,
}

impl TriggerRequest {
    /// Trigger for the canary adjust workflow. `mem` is a GiB quantity.
    pub fn adjust(application: &str, cpu: Value, mem: &str) -> Self {
        let parameters = BTreeMap::from([
            ("cpu".to_string(), cpu),
            ("mem".to_string(), Value::String(format!("{mem}Gi"))),
        ]);
        Self {
            application: application.to_string(),
            adjust: Some("True".to_string()),
            parameters,
        }
    }

    /// Trigger for the promote workflow.
    pub fn promote(application: &str) -> Self {
        let parameters =
            BTreeMap::from([("promote".to_string(), Value::String("True".to_string()))]);
        Self {
            application: application.to_string(),
            adjust: None,
            parameters,
        }
    }
}

/// Response of a webhook trigger. Only the status URL is used.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerResponse {
    pub api_url: String,
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub ui_url: Option<String>,
}

/// State of a triggered workflow execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowStatus {
    Running,
    Success,
    Failed,
    /// Any other status string. Treated as still running.
    Other(String),
}

impl WorkflowStatus {
    pub fn parse(s: &str) -> Self {
        match s {
            "RUNNING" => WorkflowStatus::Running,
            "SUCCESS" => WorkflowStatus::Success,
            "FAILED" => WorkflowStatus::Failed,
            other => WorkflowStatus::Other(other.to_string()),
        }
    }
}

/// One status poll: the parsed status plus the raw body for error reports.
#[derive(Debug, Clone)]
pub struct StatusReport {
    pub status: WorkflowStatus,
    pub body: Value,
}

pub struct WebhookClient {
    client: Client,
    base_url: String,
    account_id: String,
    api_key: String,
}

impl WebhookClient {
    pub fn new(client: Client, config: &HarnessConfig) -> Self {
        Self {
            client,
            base_url: config.harness_url.trim_end_matches('/').to_string(),
            account_id: config.account_id.clone(),
            api_key: config.api_key.clone(),
        }
    }

    /// Fire the webhook identified by `token` and return the rewritten
    /// status URL of the started execution.
    pub async fn trigger(&self, token: &str, request: &TriggerRequest) -> AdjustResult<String> {
        let url = format!("{}/gateway/api/webhooks/{}", self.base_url, token);
        debug!(application = %request.application, "triggering workflow webhook");

        let response = self
            .client
            .post(&url)
            .query(&[("accountId", self.account_id.as_str())])
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AdjustError::UnexpectedStatus {
                context: "Unable to trigger harness workflow",
                status: status.as_u16(),
                body,
            });
        }

        let trigger: TriggerResponse = response.json().await.map_err(|e| {
            AdjustError::InvalidResponse(format!("malformed trigger response: {e}"))
        })?;
        info!(
            request_id = trigger.request_id.as_deref().unwrap_or("-"),
            ui_url = trigger.ui_url.as_deref().unwrap_or("-"),
            "workflow triggered"
        );
        Ok(gateway_status_url(&trigger.api_url, &self.base_url))
    }

    /// Read the current status of a triggered execution.
    pub async fn status(&self, status_url: &str) -> AdjustResult<StatusReport> {
        let response = self
            .client
            .get(status_url)
            .header(API_KEY_HEADER, &self.api_key)
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AdjustError::UnexpectedStatus {
                context: "Unable to get triggered workflow status",
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response.json().await?;
        let status = body
            .get("status")
            .and_then(Value::as_str)
            .map(WorkflowStatus::parse)
            .ok_or_else(|| {
                AdjustError::InvalidResponse(format!("status missing from {body}"))
            })?;
        Ok(StatusReport { status, body })
    }
}

/// The trigger response points at the public API; status calls made with
/// an API key must go through the gateway.
pub fn gateway_status_url(api_url: &str, base_url: &str) -> String {
    let public = format!("{base_url}/api/");
    match api_url.strip_prefix(&public) {
        Some(rest) => format!("{base_url}/gateway/api/{rest}"),
        None => api_url.to_string(),
    }
}
