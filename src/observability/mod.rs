//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! loader, validator, watcher produce:
//!     → logging.rs (structured log events on stderr)
//! ```

pub mod logging;

pub use logging::init_logging;
