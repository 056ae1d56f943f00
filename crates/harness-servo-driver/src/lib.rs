//! harness-servo-driver — canary adjustments through workflow webhooks.
//!
//! Bridges an optimizer's desired resource settings to a workflow engine:
//!
//! ```text
//! query:   optimizer GET /accounts/{acct}/applications/{app}/config/
//!            └── userdata.{cpu,mem} → cores / GiB settings descriptor
//!
//! adjust:  desired canary {cpu, mem}
//!            ├── POST /gateway/api/webhooks/{adjust_token}   → apiUrl
//!            └── GET  apiUrl (via gateway) every poll_interval
//!                  until SUCCESS | FAILED | adjust_timeout
//! ```
//!
//! # Components
//!
//! - **`optimizer`** — optimization service client (userdata fetch)
//! - **`webhook`** — workflow engine client (trigger, status)
//! - **`driver`** — `Driver` with `query`, `adjust`, `promote` and the poll loop
//! - **`error`** — `AdjustError`, the single failure type

pub mod driver;
pub mod error;
pub mod optimizer;
pub mod webhook;

pub use driver::{Driver, ProgressCallback};
pub use error::{AdjustError, AdjustResult};
pub use optimizer::{OptimizerClient, Userdata};
pub use webhook::{TriggerRequest, WebhookClient, WorkflowStatus};
