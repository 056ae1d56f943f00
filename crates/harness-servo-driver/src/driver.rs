//! The adjustment driver: `query`, `adjust`, `promote`, and the status
//! poll loop shared by the two workflow triggers.

use std::time::Duration;

use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use harness_servo_core::{
    CPU_SETTING, ConfigError, DesiredSetting, DesiredState, HarnessConfig, MEM_SETTING, Setting,
    SettingsDescriptor,
};

use crate::error::{AdjustError, AdjustResult};
use crate::optimizer::OptimizerClient;
use crate::webhook::{TriggerRequest, WebhookClient, WorkflowStatus};

/// Per-request HTTP timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Callback receiving progress updates while a workflow runs.
///
/// Called with (percent complete, message) once per poll.
pub type ProgressCallback = Box<dyn Fn(u8, &str) + Send + Sync>;

pub struct Driver {
    config: HarnessConfig,
    optimizer: OptimizerClient,
    webhook: WebhookClient,
    poll_interval: Duration,
    adjust_timeout: Duration,
    progress_fn: Option<ProgressCallback>,
}

impl Driver {
    /// Create a driver. Poll interval and timeout come from the config.
    pub fn new(config: HarnessConfig) -> AdjustResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("harness-servo/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            optimizer: OptimizerClient::new(client.clone(), &config),
            webhook: WebhookClient::new(client, &config),
            poll_interval: config.poll_interval(),
            adjust_timeout: config.adjust_timeout(),
            config,
            progress_fn: None,
        })
    }

    /// Set the callback used to report poll progress.
    pub fn with_progress_fn(mut self, f: ProgressCallback) -> Self {
        self.progress_fn = Some(f);
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_adjust_timeout(mut self, timeout: Duration) -> Self {
        self.adjust_timeout = timeout;
        self
    }

    /// Describe the canary's cpu/mem settings, with current values taken
    /// from the optimizer's userdata when present.
    pub async fn query(&self) -> AdjustResult<SettingsDescriptor> {
        let userdata = self.optimizer.fetch_userdata().await?;
        debug!(cpu = ?userdata.cpu, mem = ?userdata.mem, "optimizer userdata");

        let cpu = Setting::range("cores", &self.config.cpu_bounds(), userdata.cpu);
        let mem = Setting::range("GiB", &self.config.mem_bounds(), userdata.mem);
        Ok(SettingsDescriptor::canary(cpu, mem))
    }

    /// Apply the desired canary settings by triggering the adjust workflow
    /// and waiting for it to finish.
    pub async fn adjust(&self, desired: &DesiredState) -> AdjustResult<()> {
        let Some(settings) = desired.canary_settings() else {
            info!("no canary settings requested, nothing to adjust");
            return Ok(());
        };

        let cpu = required_value(settings.get(CPU_SETTING), CPU_SETTING)?;
        let mem = required_value(settings.get(MEM_SETTING), MEM_SETTING)?;
        let request = TriggerRequest::adjust(&self.config.application, cpu.clone(), &gib(mem)?);

        info!(cpu = %cpu, mem = %mem, "triggering canary adjustment");
        let status_url = self
            .webhook
            .trigger(&self.config.adjust_token, &request)
            .await?;
        self.wait_for_completion(&status_url).await
    }

    /// Trigger the promote workflow and wait for it to finish.
    pub async fn promote(&self) -> AdjustResult<()> {
        let token = self
            .config
            .promote_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                ConfigError::Invalid("promote_token is required to promote".to_string())
            })?;

        info!("triggering canary promotion");
        let request = TriggerRequest::promote(&self.config.application);
        let status_url = self.webhook.trigger(token, &request).await?;
        self.wait_for_completion(&status_url).await
    }

    /// Poll `status_url` until the execution succeeds, fails, or the adjust
    /// timeout elapses.
    pub async fn wait_for_completion(&self, status_url: &str) -> AdjustResult<()> {
        let started = Instant::now();
        let mut polls: u32 = 0;

        loop {
            let report = self.webhook.status(status_url).await?;
            polls += 1;

            match &report.status {
                WorkflowStatus::Success => {
                    info!(polls, elapsed = ?started.elapsed(), "workflow finished");
                    self.report_progress(100, "workflow finished");
                    return Ok(());
                }
                WorkflowStatus::Failed => {
                    warn!(polls, "workflow failed");
                    return Err(AdjustError::WorkflowFailed(report.body.to_string()));
                }
                WorkflowStatus::Running => {
                    debug!(polls, "workflow running");
                }
                WorkflowStatus::Other(status) => {
                    warn!(%status, polls, "unrecognized workflow status, still waiting");
                }
            }

            let elapsed = started.elapsed();
            if elapsed > self.adjust_timeout {
                warn!(?elapsed, timeout = ?self.adjust_timeout, "workflow timed out");
                return Err(AdjustError::Timeout(self.adjust_timeout));
            }

            self.report_progress(
                progress_percent(elapsed, self.adjust_timeout),
                "waiting for workflow to complete",
            );
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    fn report_progress(&self, percent: u8, message: &str) {
        if let Some(f) = &self.progress_fn {
            f(percent, message);
        }
    }
}

fn required_value<'a>(setting: Option<&'a DesiredSetting>, name: &str) -> AdjustResult<&'a Value> {
    match setting.and_then(|s| s.value.as_ref()) {
        Some(Value::Null) | None => Err(AdjustError::InvalidInput(format!(
            "canary setting {name} has no value"
        ))),
        Some(value) => Ok(value),
    }
}

/// Render a memory value (GiB) for the `mem` workflow parameter, keeping
/// the number exactly as the servo wrote it.
fn gib(value: &Value) -> AdjustResult<String> {
    match value {
        Value::Number(n) => Ok(n.to_string()),
        Value::String(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        other => Err(AdjustError::InvalidInput(format!(
            "canary setting mem is not a number: {other}"
        ))),
    }
}

/// Share of the timeout already spent, capped below 100 until the workflow
/// actually finishes.
fn progress_percent(elapsed: Duration, timeout: Duration) -> u8 {
    if timeout.is_zero() {
        return 99;
    }
    let ratio = elapsed.as_secs_f64() / timeout.as_secs_f64();
    (ratio * 100.0).clamp(0.0, 99.0) as u8
}
