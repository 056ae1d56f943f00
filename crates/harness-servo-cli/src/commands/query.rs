use std::path::Path;

use harness_servo_core::HarnessConfig;
use harness_servo_driver::{AdjustResult, Driver};

use crate::output;

/// Print the canary settings descriptor.
pub async fn query(config_path: &Path) -> AdjustResult<()> {
    let config = HarnessConfig::from_file(config_path)?;
    let descriptor = Driver::new(config)?.query().await?;
    output::emit(&serde_json::to_value(&descriptor)?);
    Ok(())
}
