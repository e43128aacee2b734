//! Batch coordinator - unwraps envelopes and isolates per-item failures
//!
//! A single item's failure never aborts the batch; only envelope-level parse
//! failures propagate, leaving the whole batch unacknowledged for redelivery.

use super::item::{ItemError, ItemProcessor, ProcessedItem};
use super::{Route, route_for};
use crate::config::{Config, PipelineConfig};
use crate::envelope::{BatchEnvelope, EnvelopeError};
use crate::observability::Metrics;
use crate::storage::StorageClient;
use crate::telemetry::MetricSink;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info};
use uuid::Uuid;

/// Why an item was skipped without touching storage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    WrongPrefix,
    AlreadyThumbnail,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::WrongPrefix => "wrong-prefix",
            SkipReason::AlreadyThumbnail => "already-thumbnail",
        }
    }
}

/// Terminal result of processing one work item
#[derive(Debug)]
pub enum ItemOutcome {
    Success(ProcessedItem),
    Skipped {
        source_key: String,
        reason: SkipReason,
    },
    Failed {
        source_key: String,
        error: ItemError,
    },
}

impl ItemOutcome {
    /// Source key of the item this outcome belongs to
    pub fn source_key(&self) -> &str {
        match self {
            ItemOutcome::Success(processed) => &processed.source_key,
            ItemOutcome::Skipped { source_key, .. } => source_key,
            ItemOutcome::Failed { source_key, .. } => source_key,
        }
    }
}

/// Aggregated result of one batch invocation
#[derive(Debug)]
pub struct BatchResult {
    pub items: Vec<ItemOutcome>,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration: Duration,
}

impl BatchResult {
    fn finalize(items: Vec<ItemOutcome>, duration: Duration) -> Self {
        let mut succeeded = 0;
        let mut failed = 0;
        let mut skipped = 0;

        for outcome in &items {
            match outcome {
                ItemOutcome::Success(_) => succeeded += 1,
                ItemOutcome::Skipped { .. } => skipped += 1,
                ItemOutcome::Failed { .. } => failed += 1,
            }
        }

        Self {
            items,
            succeeded,
            failed,
            skipped,
            duration,
        }
    }

    pub fn total(&self) -> usize {
        self.items.len()
    }
}

/// Coordinates a whole batch: unwrap, route, process, aggregate
pub struct BatchCoordinator {
    processor: ItemProcessor,
    pipeline: PipelineConfig,
    metrics: Arc<Metrics>,
}

impl BatchCoordinator {
    pub fn new(
        storage: Arc<StorageClient>,
        sink: Arc<dyn MetricSink>,
        config: &Config,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            processor: ItemProcessor::new(storage, sink, config),
            pipeline: config.pipeline.clone(),
            metrics,
        }
    }

    /// Process a batch envelope to completion.
    ///
    /// Returns `Ok` whenever every item was resolved, even if some failed;
    /// the caller acknowledges the batch in that case. Fails only when the
    /// envelope itself cannot be unwrapped into work items.
    pub async fn process(&self, envelope: &BatchEnvelope) -> Result<BatchResult, EnvelopeError> {
        let batch_id = Uuid::now_v7();
        let started = Instant::now();

        let items = match envelope.work_items() {
            Ok(items) => items,
            Err(e) => {
                self.metrics.batch_failed();
                error!(
                    %batch_id,
                    error = %e,
                    "Envelope unwrap failed, leaving batch unacknowledged"
                );
                return Err(e);
            }
        };

        info!(
            %batch_id,
            records = envelope.records.len(),
            items = items.len(),
            "Processing batch"
        );

        let mut outcomes = Vec::with_capacity(items.len());

        for item in items {
            match route_for(&item.source_key, &self.pipeline) {
                Route::SkipWrongPrefix => {
                    info!(
                        source_key = %item.source_key,
                        "Skipping object outside source prefix"
                    );
                    self.metrics.item_skipped();
                    outcomes.push(ItemOutcome::Skipped {
                        source_key: item.source_key,
                        reason: SkipReason::WrongPrefix,
                    });
                }
                Route::SkipAlreadyThumbnail => {
                    info!(source_key = %item.source_key, "Skipping existing thumbnail");
                    self.metrics.item_skipped();
                    outcomes.push(ItemOutcome::Skipped {
                        source_key: item.source_key,
                        reason: SkipReason::AlreadyThumbnail,
                    });
                }
                Route::Eligible => match self.processor.process(&item).await {
                    Ok(processed) => {
                        info!(
                            source_key = %processed.source_key,
                            thumbnail_key = %processed.thumbnail_key,
                            original_bytes = processed.original_bytes,
                            thumbnail_bytes = processed.thumbnail_bytes,
                            "Thumbnail created"
                        );
                        self.metrics.item_succeeded();
                        outcomes.push(ItemOutcome::Success(processed));
                    }
                    Err(error) => {
                        error!(
                            source_key = %item.source_key,
                            stage = error.stage(),
                            %error,
                            "Item processing failed, continuing with remaining items"
                        );
                        self.metrics.item_failed();
                        outcomes.push(ItemOutcome::Failed {
                            source_key: item.source_key,
                            error,
                        });
                    }
                },
            }
        }

        let result = BatchResult::finalize(outcomes, started.elapsed());
        self.metrics.batch_processed();

        info!(
            %batch_id,
            total = result.total(),
            succeeded = result.succeeded,
            failed = result.failed,
            skipped = result.skipped,
            duration_secs = result.duration.as_secs_f64(),
            "Batch complete"
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::RecordingSink;
    use bytes::Bytes;
    use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([10, 60, 90]));
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageOutputFormat::Png)
            .unwrap();
        buf
    }

    fn envelope_for_keys(keys: &[&str]) -> BatchEnvelope {
        let records: Vec<serde_json::Value> = keys
            .iter()
            .map(|key| {
                serde_json::json!({
                    "s3": {"bucket": {"name": "b"}, "object": {"key": key}}
                })
            })
            .collect();
        let body = serde_json::json!({ "Records": records }).to_string();

        serde_json::from_value(serde_json::json!({ "Records": [{ "body": body }] })).unwrap()
    }

    fn coordinator(storage: Arc<StorageClient>) -> BatchCoordinator {
        BatchCoordinator::new(
            storage,
            Arc::new(RecordingSink::new()),
            &Config::default(),
            Arc::new(Metrics::new()),
        )
    }

    #[tokio::test]
    async fn test_counts_sum_to_total() {
        let storage = Arc::new(StorageClient::in_memory());
        storage
            .store("b", "images/ok.png", Bytes::from(png_bytes(300, 200)), "image/png")
            .await
            .unwrap();

        let envelope = envelope_for_keys(&[
            "images/ok.png",
            "images/missing.png",
            "other/x.png",
            "thumbnails/x.jpg",
        ]);

        let result = coordinator(storage).process(&envelope).await.unwrap();

        assert_eq!(result.total(), 4);
        assert_eq!(result.succeeded, 1);
        assert_eq!(result.failed, 1);
        assert_eq!(result.skipped, 2);
        assert_eq!(
            result.succeeded + result.failed + result.skipped,
            result.total()
        );
    }

    #[tokio::test]
    async fn test_skipped_items_never_touch_storage() {
        // Storage is empty: if a skip route fetched, it would fail instead
        let storage = Arc::new(StorageClient::in_memory());
        let envelope = envelope_for_keys(&["other/x.png", "thumbnails/x.jpg"]);

        let result = coordinator(storage).process(&envelope).await.unwrap();

        assert_eq!(result.failed, 0);
        assert_eq!(result.skipped, 2);
        assert!(matches!(
            result.items[0],
            ItemOutcome::Skipped {
                reason: SkipReason::WrongPrefix,
                ..
            }
        ));
        assert!(matches!(
            result.items[1],
            ItemOutcome::Skipped {
                reason: SkipReason::AlreadyThumbnail,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_one_failure_does_not_abort_batch() {
        let storage = Arc::new(StorageClient::in_memory());
        storage
            .store("b", "images/a.png", Bytes::from(png_bytes(250, 250)), "image/png")
            .await
            .unwrap();
        storage
            .store("b", "images/c.png", Bytes::from(png_bytes(250, 250)), "image/png")
            .await
            .unwrap();

        let envelope = envelope_for_keys(&["images/a.png", "images/b.png", "images/c.png"]);

        let result = coordinator(storage.clone()).process(&envelope).await.unwrap();

        assert_eq!(result.succeeded, 2);
        assert_eq!(result.failed, 1);

        // Outcomes remain reconstructible by source key
        assert_eq!(result.items[1].source_key(), "images/b.png");
        assert!(storage.fetch("b", "thumbnails/a.png").await.is_ok());
        assert!(storage.fetch("b", "thumbnails/c.png").await.is_ok());
    }

    #[tokio::test]
    async fn test_malformed_body_is_fatal() {
        let storage = Arc::new(StorageClient::in_memory());
        let envelope: BatchEnvelope = serde_json::from_value(serde_json::json!({
            "Records": [{ "body": "{ not json" }]
        }))
        .unwrap();

        let metrics = Arc::new(Metrics::new());
        let coordinator = BatchCoordinator::new(
            storage,
            Arc::new(RecordingSink::new()),
            &Config::default(),
            metrics.clone(),
        );

        let result = coordinator.process(&envelope).await;
        assert!(result.is_err());
        assert_eq!(metrics.snapshot().batches_failed, 1);
    }
}
