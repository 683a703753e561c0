//! Logging abstraction.
//!
//! Provides a [`Logger`] trait that can be implemented to customize logging
//! behavior, along with a default [`TracingLogger`] that delegates to the
//! [`tracing`] crate.

use std::fmt;
use std::sync::Arc;

/// Logging trait for platform events (request failures, invitations sent,
/// audit writes that could not be persisted).
///
/// # Example
///
/// ```rust
/// use research_hub_core::logger::{Logger, TracingLogger};
///
/// let logger = TracingLogger;
/// logger.info("Server started");
///
/// struct StderrLogger;
/// impl Logger for StderrLogger {
///     fn info(&self, message: &str) {
///         eprintln!("[INFO] {}", message);
///     }
///     fn warn(&self, message: &str) {
///         eprintln!("[WARN] {}", message);
///     }
///     fn error(&self, message: &str) {
///         eprintln!("[ERROR] {}", message);
///     }
///     fn debug(&self, message: &str) {
///         eprintln!("[DEBUG] {}", message);
///     }
/// }
/// ```
pub trait Logger: Send + Sync {
    fn info(&self, message: &str);

    fn warn(&self, message: &str);

    fn error(&self, message: &str);

    fn debug(&self, message: &str);
}

impl fmt::Debug for dyn Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("dyn Logger")
    }
}

/// Default logger implementation using the `tracing` crate.
#[derive(Debug, Clone)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn info(&self, message: &str) {
        tracing::info!(target: "research_hub", "{}", message);
    }

    fn warn(&self, message: &str) {
        tracing::warn!(target: "research_hub", "{}", message);
    }

    fn error(&self, message: &str) {
        tracing::error!(target: "research_hub", "{}", message);
    }

    fn debug(&self, message: &str) {
        tracing::debug!(target: "research_hub", "{}", message);
    }
}

pub fn default_logger() -> Arc<dyn Logger> {
    Arc::new(TracingLogger)
}
