//! Metric emission abstraction
//!
//! The sink is fire-and-forget from the pipeline's point of view: emission
//! failures must never turn a successful thumbnail into a reported failure.
//! `BestEffortSink` is the only surface the pipeline talks to; it chunks to
//! the per-call cap and swallows (logs) every error.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Upper bound on metric data per backend call
pub const MAX_DATA_PER_CALL: usize = 20;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Emit failed: {0}")]
    EmitFailed(String),
}

pub type Result<T> = std::result::Result<T, TelemetryError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricUnit {
    Count,
    Milliseconds,
    Bytes,
    None,
}

impl fmt::Display for MetricUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MetricUnit::Count => "Count",
            MetricUnit::Milliseconds => "Milliseconds",
            MetricUnit::Bytes => "Bytes",
            MetricUnit::None => "None",
        };
        f.write_str(s)
    }
}

/// One metric observation
#[derive(Debug, Clone)]
pub struct MetricDatum {
    pub name: &'static str,
    pub value: f64,
    pub unit: MetricUnit,
    pub dimensions: Vec<(String, String)>,
}

/// Metric sink for publishing pipeline telemetry
#[async_trait]
pub trait MetricSink: Send + Sync {
    /// Publish a slice of metric data under a namespace
    async fn emit(&self, namespace: &str, data: &[MetricDatum]) -> Result<()>;
}

/// Sink that writes metrics to the structured log stream
#[derive(Debug, Clone, Default)]
pub struct LogSink;

impl LogSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MetricSink for LogSink {
    async fn emit(&self, namespace: &str, data: &[MetricDatum]) -> Result<()> {
        for datum in data {
            tracing::debug!(
                namespace,
                metric = datum.name,
                value = datum.value,
                unit = %datum.unit,
                "Metric emitted"
            );
        }
        Ok(())
    }
}

/// Recording sink for tests
#[derive(Debug, Default)]
pub struct RecordingSink {
    calls: std::sync::Mutex<Vec<(String, Vec<MetricDatum>)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<(String, Vec<MetricDatum>)> {
        self.calls.lock().expect("recording sink lock poisoned").clone()
    }
}

#[async_trait]
impl MetricSink for RecordingSink {
    async fn emit(&self, namespace: &str, data: &[MetricDatum]) -> Result<()> {
        self.calls
            .lock()
            .expect("recording sink lock poisoned")
            .push((namespace.to_string(), data.to_vec()));
        Ok(())
    }
}

/// Sink that always fails, for exercising the best-effort path in tests
#[derive(Debug, Clone, Default)]
pub struct FailingSink;

#[async_trait]
impl MetricSink for FailingSink {
    async fn emit(&self, _namespace: &str, _data: &[MetricDatum]) -> Result<()> {
        Err(TelemetryError::EmitFailed("sink unavailable".to_string()))
    }
}

/// Non-critical wrapper around a [`MetricSink`].
///
/// Splits data into cap-sized calls and catch-and-logs failures so emission
/// can never alter the primary control path.
#[derive(Clone)]
pub struct BestEffortSink {
    inner: Arc<dyn MetricSink>,
    namespace: String,
}

impl BestEffortSink {
    pub fn new(inner: Arc<dyn MetricSink>, namespace: impl Into<String>) -> Self {
        Self {
            inner,
            namespace: namespace.into(),
        }
    }

    pub async fn emit(&self, data: Vec<MetricDatum>) {
        for chunk in data.chunks(MAX_DATA_PER_CALL) {
            if let Err(e) = self.inner.emit(&self.namespace, chunk).await {
                tracing::warn!(
                    namespace = %self.namespace,
                    error = %e,
                    "Metric emission failed"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn datum(name: &'static str) -> MetricDatum {
        MetricDatum {
            name,
            value: 1.0,
            unit: MetricUnit::Count,
            dimensions: vec![],
        }
    }

    #[tokio::test]
    async fn test_best_effort_chunks_to_cap() {
        let sink = Arc::new(RecordingSink::new());
        let best_effort = BestEffortSink::new(sink.clone(), "Thumbox");

        let data = (0..45).map(|_| datum("M")).collect();
        best_effort.emit(data).await;

        let calls = sink.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].1.len(), 20);
        assert_eq!(calls[1].1.len(), 20);
        assert_eq!(calls[2].1.len(), 5);
        assert!(calls.iter().all(|(ns, _)| ns == "Thumbox"));
    }

    #[tokio::test]
    async fn test_best_effort_swallows_failures() {
        let best_effort = BestEffortSink::new(Arc::new(FailingSink), "Thumbox");

        // Must not panic or propagate
        best_effort.emit(vec![datum("M")]).await;
    }
}
