//! `adjust` (default action) and `--promote`.

use std::io::Read;
use std::path::Path;

use tracing::info;

use harness_servo_core::{DesiredState, HarnessConfig};
use harness_servo_driver::{AdjustError, AdjustResult, Driver};

use crate::output;

/// Read the desired state from `input`, apply it, and report completion.
pub async fn adjust(config_path: &Path, input: impl Read) -> AdjustResult<()> {
    let driver = load_driver(config_path)?;
    let desired = read_desired(input)?;

    driver.adjust(&desired).await?;
    info!("adjustment completed");
    output::completed();
    Ok(())
}

pub async fn promote(config_path: &Path) -> AdjustResult<()> {
    let driver = load_driver(config_path)?;

    driver.promote().await?;
    info!("promotion completed");
    output::completed();
    Ok(())
}

fn load_driver(config_path: &Path) -> AdjustResult<Driver> {
    let config = HarnessConfig::from_file(config_path)?;
    Ok(Driver::new(config)?.with_progress_fn(Box::new(output::progress)))
}

fn read_desired(input: impl Read) -> AdjustResult<DesiredState> {
    serde_json::from_reader(input)
        .map_err(|e| AdjustError::InvalidInput(format!("failed to parse desired state: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_desired_parses_servo_input() {
        let input = r#"{"application": {"components": {"canary": {"settings": {
            "cpu": {"value": 0.5}, "mem": {"value": 0.5}}}}}}"#;
        let desired = read_desired(input.as_bytes()).unwrap();
        assert!(desired.canary_settings().is_some());
    }

    #[test]
    fn read_desired_rejects_garbage() {
        let err = read_desired("not json".as_bytes()).unwrap_err();
        assert!(matches!(err, AdjustError::InvalidInput(_)));

        let err = read_desired(r#"{"components": {}}"#.as_bytes()).unwrap_err();
        assert!(matches!(err, AdjustError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn adjust_fails_on_missing_config() {
        let dir = tempfile::tempdir().unwrap();
        let err = adjust(&dir.path().join("config.yaml"), "{}".as_bytes())
            .await
            .unwrap_err();
        assert!(matches!(err, AdjustError::Config(_)));
        assert_eq!(err.reason(), "config");
    }

    #[tokio::test]
    async fn adjust_without_canary_succeeds_without_network() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "harness:\n  opsani_account: a\n  opsani_app_name: b\n  opsani_token: c\n  \
             application: d\n  account_id: e\n  adjust_token: f\n  api_key: g\n  \
             harness_url: http://127.0.0.1:1\n",
        )
        .unwrap();

        adjust(&path, r#"{"application": {"components": {}}}"#.as_bytes())
            .await
            .unwrap();
    }
}
