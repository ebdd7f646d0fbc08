//! User-facing run log
//!
//! Purely observational: nothing the orchestrator decides depends on it.

/// Presentation sink for run progress
pub trait UpgradeLogger: Send + Sync {
    /// Plain progress line
    fn plain(&self, message: &str);

    /// Warning line
    fn warn(&self, message: &str);

    /// Blank separator line
    fn newline(&self);

    /// Emphasize words, joined by spaces
    fn bold(&self, parts: &[&str]) -> String {
        parts.join(" ")
    }

    /// De-emphasize text
    fn dim(&self, text: &str) -> String {
        text.to_string()
    }
}

/// Routes run progress into `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl UpgradeLogger for TracingLogger {
    fn plain(&self, message: &str) {
        tracing::info!("{message}");
    }

    fn warn(&self, message: &str) {
        tracing::warn!("{message}");
    }

    fn newline(&self) {}
}
