//! Spans and timing helpers for verification runs.

use std::time::{Duration, Instant};
use tracing::{info_span, Span};

/// Longest query text written to logs before truncation.
pub const QUERY_LOG_LIMIT: usize = 256;

/// Truncate long text (typically SQL) for log output.
pub fn limit(text: &str) -> String {
    if text.chars().count() <= QUERY_LOG_LIMIT {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(QUERY_LOG_LIMIT).collect();
    truncated.push_str("...");
    truncated
}

/// Create a span for one query run.
pub fn query_span(query: &str) -> Span {
    info_span!("query", text = %limit(query))
}

/// Create a span for a verification pass.
pub fn verify_span(algorithm: &str, mode: &str) -> Span {
    info_span!("verify", algorithm = %algorithm, mode = %mode)
}

/// Stopwatch for a named operation.
pub struct Timer {
    start: Instant,
    operation: &'static str,
}

impl Timer {
    /// Start a new timer.
    pub fn start(operation: &'static str) -> Self {
        Self {
            start: Instant::now(),
            operation,
        }
    }

    /// Time elapsed so far.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Complete the timer, log and return the duration.
    pub fn finish(self) -> Duration {
        let duration = self.start.elapsed();
        tracing::debug!(
            operation = %self.operation,
            duration_ms = %duration.as_millis(),
            "operation completed"
        );
        duration
    }
}
