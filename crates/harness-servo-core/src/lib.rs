pub mod config;
pub mod settings;
pub mod units;

pub use config::{ConfigError, HarnessConfig, ResourceBounds};
pub use settings::*;
pub use units::{UnitsError, cpuunits, memunits};
