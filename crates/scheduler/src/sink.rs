//! Destinations for failures raised inside scheduled callbacks.

use tracing::error;

/// Receives errors (and converted panics) from scheduled callbacks.
pub trait ErrorSink: Send + Sync {
    fn report(&self, scheduler: &str, error: &anyhow::Error);
}

/// Default sink: one structured `error!` event per failure.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl ErrorSink for LogSink {
    fn report(&self, scheduler: &str, error: &anyhow::Error) {
        let detail = format!("{:#}", error);
        error!(scheduler = %scheduler, error = %detail, "scheduled job failed");
    }
}

impl<F> ErrorSink for F
where
    F: Fn(&str, &anyhow::Error) + Send + Sync,
{
    fn report(&self, scheduler: &str, error: &anyhow::Error) {
        self(scheduler, error)
    }
}
