use serde_json::json;

use crate::output;

pub const DESCRIPTION: &str = "harness-servo adjust driver";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The driver cannot cancel a running workflow.
pub const HAS_CANCEL: bool = false;

pub fn version() {
    println!("{DESCRIPTION} {VERSION}");
}

pub fn info() {
    output::emit(&info_message());
}

fn info_message() -> serde_json::Value {
    json!({"version": VERSION, "has_cancel": HAS_CANCEL})
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn info_reports_version_and_cancel_support() {
        let info = info_message();
        assert_eq!(info["version"], VERSION);
        assert_eq!(info["has_cancel"], false);
    }
}
