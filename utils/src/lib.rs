//! Shared utilities for the Tangle wallet core.

pub mod logging;

pub use logging::{init_logging, LogFormat, LoggingError};
