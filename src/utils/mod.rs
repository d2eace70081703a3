//! Shared utilities

pub mod logging;

pub use logging::init_logging;
#[cfg(feature = "json-logging")]
pub use logging::init_json_logging;
