/*!
 * Operation Tracing
 * Structured tracing for filesystem operations using the tracing crate
 *
 * Features:
 * - Trace ID per multi-step operation (copy, move) for log correlation
 * - JSON-formatted logs for structured parsing
 * - Slow operation warnings with durations attached
 */

use std::time::Instant;
use tracing::{debug, info, span, warn, Level};
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};
use uuid::Uuid;

/// Environment variable switching log output to JSON
pub const TRACE_JSON_ENV: &str = "PREFIXFS_TRACE_JSON";

/// Operations slower than this are logged at warn level
const SLOW_OPERATION_MS: u128 = 100;

/// Initialize structured tracing for the process
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
/// - PREFIXFS_TRACE_JSON: Enable JSON output (default: false)
///
/// Returns `false` when a global subscriber was already installed.
pub fn init_tracing() -> bool {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = std::env::var(TRACE_JSON_ENV)
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_line_number(true)
                    .with_file(true)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
            .is_ok()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()
            .is_ok()
    };

    if installed {
        info!(json = use_json, "structured tracing initialized");
    }
    installed
}

/// Generate a unique trace ID for request correlation
pub fn generate_trace_id() -> String {
    Uuid::new_v4().to_string()
}

/// Span covering one logical operation, timed from creation to drop
pub struct OperationSpan {
    span: tracing::Span,
    start: Instant,
    operation: String,
    trace_id: String,
}

impl OperationSpan {
    pub fn new(operation: &str) -> Self {
        let trace_id = generate_trace_id();

        let span = span!(
            Level::DEBUG,
            "operation",
            trace_id = %trace_id,
            operation = operation,
            duration_us = tracing::field::Empty,
            duration_ms = tracing::field::Empty,
            result = tracing::field::Empty,
            error = tracing::field::Empty,
        );

        let entered = span.enter();
        debug!(operation = operation, trace_id = %trace_id, "operation started");
        drop(entered);

        Self {
            span,
            start: Instant::now(),
            operation: operation.to_string(),
            trace_id,
        }
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    /// Record the operation result
    pub fn record_result(&self, success: bool) {
        self.span
            .record("result", if success { "success" } else { "error" });
    }

    /// Record an error
    pub fn record_error(&self, error: &str) {
        self.span.record("error", error);
        self.span.record("result", "error");
    }

    /// Record a fallible boolean outcome: the flag on success, the message
    /// on failure
    pub fn record_outcome<E: std::fmt::Display>(&self, outcome: &Result<bool, E>) {
        match outcome {
            Ok(success) => self.record_result(*success),
            Err(e) => self.record_error(&e.to_string()),
        }
    }

    /// Enter the span so nested events inherit the trace ID
    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }
}

impl Drop for OperationSpan {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        let _entered = self.span.enter();

        if duration.as_millis() > SLOW_OPERATION_MS {
            self.span.record("duration_ms", duration.as_millis());
            warn!(
                trace_id = %self.trace_id,
                operation = %self.operation,
                duration_ms = duration.as_millis(),
                slow = true,
                "slow operation detected"
            );
        } else {
            self.span.record("duration_us", duration.as_micros());
            debug!(
                trace_id = %self.trace_id,
                operation = %self.operation,
                duration_us = duration.as_micros(),
                "operation completed"
            );
        }
    }
}

/// Helper to create an operation span
#[inline]
pub fn span_operation(name: &str) -> OperationSpan {
    OperationSpan::new(name)
}
