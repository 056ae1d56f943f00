//! Optimization service client: reads the application config that carries
//! the desired canary settings.

use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;
use tracing::debug;

use harness_servo_core::{HarnessConfig, UnitsError, cpuunits, memunits};

use crate::error::{AdjustError, AdjustResult};

const BYTES_PER_GIB: f64 = 1_073_741_824.0;

/// Desired cpu (cores) and mem (GiB) read from the optimizer's userdata.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Userdata {
    pub cpu: Option<f64>,
    pub mem: Option<f64>,
}

pub struct OptimizerClient {
    client: Client,
    url: String,
    token: String,
}

impl OptimizerClient {
    pub fn new(client: Client, config: &HarnessConfig) -> Self {
        Self {
            client,
            url: config_url(config),
            token: config.opsani_token.clone(),
        }
    }

    /// Fetch the application config document.
    pub async fn fetch_config(&self) -> AdjustResult<Value> {
        debug!(url = %self.url, "fetching optimizer application config");
        let response = self
            .client
            .get(&self.url)
            .header(CONTENT_TYPE, "application/merge-patch+json")
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AdjustError::UnexpectedStatus {
                context: "Unable to fetch optimizer application config",
                status: status.as_u16(),
                body,
            });
        }
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Fetch the config and extract the desired cpu/mem values.
    pub async fn fetch_userdata(&self) -> AdjustResult<Userdata> {
        let config = self.fetch_config().await?;
        parse_userdata(&config)
    }
}

fn config_url(config: &HarnessConfig) -> String {
    format!(
        "{}/accounts/{}/applications/{}/config/",
        config.opsani_url.trim_end_matches('/'),
        config.opsani_account,
        config.opsani_app_name,
    )
}

/// Read `adjustment.control.userdata.{cpu,mem}`. Missing, null and empty
/// values yield `None`. Memory is reported in GiB, the unit of the `mem`
/// setting.
///
/// Strings and numbers follow different rules. Strings are resource
/// quantities as the optimizer echoes them, so a suffix-less string counts
/// bytes (`"1073741824"` is 1 GiB). Numbers are setting values the servo
/// wrote itself and are already in GiB (`2` is 2 GiB).
pub fn parse_userdata(config: &Value) -> AdjustResult<Userdata> {
    let Some(userdata) = config.pointer("/adjustment/control/userdata") else {
        return Ok(Userdata::default());
    };
    Ok(Userdata {
        cpu: quantity(userdata.get("cpu"), cpuunits)?,
        mem: quantity(userdata.get("mem"), memunits_gib)?,
    })
}

fn memunits_gib(s: &str) -> Result<f64, UnitsError> {
    Ok(memunits(s)? / BYTES_PER_GIB)
}

fn quantity(
    value: Option<&Value>,
    convert: fn(&str) -> Result<f64, UnitsError>,
) -> AdjustResult<Option<f64>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(convert(s)?)),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(other) => Err(AdjustError::InvalidResponse(format!(
            "userdata value is not a quantity: {other}"
        ))),
    }
}
