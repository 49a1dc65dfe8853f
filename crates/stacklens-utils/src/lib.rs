//! # stacklens utilities
//!
//! Logging setup shared by the stacklens binary and terminal front-end.
//!
//! Everything logs through `tracing`; this crate only decides where the
//! output goes and in which format.

pub mod logging;

// Re-export commonly used logging functions for convenience
pub use logging::{
    init_logging, init_logging_for_tui, init_logging_with_level, LogConfig, LogFormat, LogGuard, LogLevel, LoggingError,
};
pub use tracing::{debug, error, info, trace, warn};
