//! Injectable, non-blocking progress reporting (§5, §9). The pipeline
//! emits `(stage_name, percent)` after each stage boundary and, inside the
//! viewshed engine, after every completed candidate batch.

use std::time::{Duration, Instant};

/// A progress event: the stage currently running and its completion
/// fraction in `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy)]
pub struct ProgressEvent<'a> {
    pub stage: &'a str,
    pub fraction: f64,
}

/// Receives progress events. Implementations must not block; a slow sink
/// would otherwise stall the pipeline (§5).
pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, event: ProgressEvent<'_>);
}

/// A no-op sink for callers that don't need progress reporting.
pub struct NullSink;

impl ProgressSink for NullSink {
    fn on_progress(&self, _event: ProgressEvent<'_>) {}
}

/// Wraps any closure as a [`ProgressSink`].
pub struct CallbackSink<F>(F)
where
    F: Fn(ProgressEvent<'_>) + Send + Sync;

impl<F> CallbackSink<F>
where
    F: Fn(ProgressEvent<'_>) + Send + Sync,
{
    pub fn new(f: F) -> Self {
        CallbackSink(f)
    }
}

impl<F> ProgressSink for CallbackSink<F>
where
    F: Fn(ProgressEvent<'_>) + Send + Sync,
{
    fn on_progress(&self, event: ProgressEvent<'_>) {
        (self.0)(event)
    }
}

/// Bounds the emit rate of an inner sink to at most a few events per
/// second, so a chatty source (like per-viewshed-batch progress) never
/// overwhelms a slow transport.
pub struct RateLimitedSink<'a> {
    inner: &'a dyn ProgressSink,
    min_interval: Duration,
    last_emit: std::sync::Mutex<Option<Instant>>,
}

impl<'a> RateLimitedSink<'a> {
    pub fn new(inner: &'a dyn ProgressSink, events_per_second: f64) -> Self {
        RateLimitedSink {
            inner,
            min_interval: Duration::from_secs_f64(1.0 / events_per_second.max(0.001)),
            last_emit: std::sync::Mutex::new(None),
        }
    }

    /// Emits unconditionally, bypassing the rate limit; used for the final
    /// event of a stage so 100% is never dropped.
    pub fn emit_forced(&self, event: ProgressEvent<'_>) {
        *self.last_emit.lock().unwrap() = Some(Instant::now());
        self.inner.on_progress(event);
    }

    pub fn emit(&self, event: ProgressEvent<'_>) {
        let mut last = self.last_emit.lock().unwrap();
        let now = Instant::now();
        if last.map(|t| now.duration_since(t) >= self.min_interval).unwrap_or(true) {
            *last = Some(now);
            self.inner.on_progress(event);
        }
    }
}
