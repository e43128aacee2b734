//! Item processor - fetch, transform and store for one work item

use crate::config::{Config, PipelineConfig};
use crate::envelope::WorkItem;
use crate::storage::{StorageClient, StorageError};
use crate::telemetry::{BestEffortSink, MetricDatum, MetricSink, MetricUnit};
use crate::transform::{Thumbnailer, TransformError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ItemError {
    #[error("fetch failed for '{key}': {source}")]
    Fetch {
        key: String,
        #[source]
        source: StorageError,
    },

    #[error("transform failed for '{key}': {source}")]
    Transform {
        key: String,
        #[source]
        source: TransformError,
    },

    #[error("store failed for '{key}': {source}")]
    Store {
        key: String,
        #[source]
        source: StorageError,
    },
}

impl ItemError {
    pub fn source_key(&self) -> &str {
        match self {
            ItemError::Fetch { key, .. }
            | ItemError::Transform { key, .. }
            | ItemError::Store { key, .. } => key,
        }
    }

    pub fn stage(&self) -> &'static str {
        match self {
            ItemError::Fetch { .. } => "fetch",
            ItemError::Transform { .. } => "transform",
            ItemError::Store { .. } => "store",
        }
    }
}

/// Per-stage wall-clock timings for one processed item
#[derive(Debug, Clone, Copy, Default)]
pub struct StageTimings {
    pub fetch: Duration,
    pub transform: Duration,
    pub store: Duration,
}

impl StageTimings {
    pub fn total(&self) -> Duration {
        self.fetch + self.transform + self.store
    }
}

/// Successful outcome of one item: keys, sizes and timing metrics
#[derive(Debug, Clone)]
pub struct ProcessedItem {
    pub source_key: String,
    pub thumbnail_key: String,
    pub original_bytes: usize,
    pub thumbnail_bytes: usize,
    /// `original_bytes / thumbnail_bytes`; always finite, a zero-byte
    /// thumbnail is rejected as a transform failure
    pub compression_ratio: f64,
    pub original_dimensions: (u32, u32),
    pub final_dimensions: (u32, u32),
    pub timings: StageTimings,
}

/// Runs the fetch -> transform -> store pipeline for single work items
pub struct ItemProcessor {
    storage: Arc<StorageClient>,
    thumbnailer: Thumbnailer,
    telemetry: BestEffortSink,
    pipeline: PipelineConfig,
    function_name: String,
}

impl ItemProcessor {
    pub fn new(storage: Arc<StorageClient>, sink: Arc<dyn MetricSink>, config: &Config) -> Self {
        Self {
            storage,
            thumbnailer: Thumbnailer::new(&config.pipeline),
            telemetry: BestEffortSink::new(sink, config.telemetry.namespace.clone()),
            pipeline: config.pipeline.clone(),
            function_name: config.telemetry.function_name.clone(),
        }
    }

    /// Process one eligible work item.
    ///
    /// No retries here: retry policy belongs to the batch-redelivery
    /// mechanism upstream.
    pub async fn process(&self, item: &WorkItem) -> Result<ProcessedItem, ItemError> {
        let started = Instant::now();

        // Fetch
        let original = self
            .storage
            .fetch(&item.bucket, &item.source_key)
            .await
            .map_err(|source| ItemError::Fetch {
                key: item.source_key.clone(),
                source,
            })?;
        let fetch_time = started.elapsed();
        let original_bytes = original.len();

        // Transform, off the async runtime
        let transform_started = Instant::now();
        let thumbnailer = self.thumbnailer.clone();
        let thumbnail = tokio::task::spawn_blocking(move || thumbnailer.resize(&original))
            .await
            .map_err(|e| ItemError::Transform {
                key: item.source_key.clone(),
                source: TransformError::Internal(e.to_string()),
            })?
            .map_err(|source| ItemError::Transform {
                key: item.source_key.clone(),
                source,
            })?;
        let transform_time = transform_started.elapsed();

        debug!(
            source_key = %item.source_key,
            original_dimensions = ?thumbnail.original_dimensions,
            final_dimensions = ?thumbnail.final_dimensions,
            "Image transformed"
        );

        // Store
        let thumbnail_key = super::thumbnail_key(&item.source_key, &self.pipeline);
        let store_started = Instant::now();
        let thumbnail_bytes = thumbnail.data.len();
        self.storage
            .store(
                &item.bucket,
                &thumbnail_key,
                thumbnail.data,
                mime::IMAGE_JPEG.as_ref(),
            )
            .await
            .map_err(|source| ItemError::Store {
                key: item.source_key.clone(),
                source,
            })?;
        let store_time = store_started.elapsed();

        let timings = StageTimings {
            fetch: fetch_time,
            transform: transform_time,
            store: store_time,
        };
        // thumbnail_bytes > 0: the transform rejects empty encoder output
        let compression_ratio = original_bytes as f64 / thumbnail_bytes as f64;

        self.emit_success_metrics(timings.total(), compression_ratio, original_bytes)
            .await;

        Ok(ProcessedItem {
            source_key: item.source_key.clone(),
            thumbnail_key,
            original_bytes,
            thumbnail_bytes,
            compression_ratio,
            original_dimensions: thumbnail.original_dimensions,
            final_dimensions: thumbnail.final_dimensions,
            timings,
        })
    }

    async fn emit_success_metrics(
        &self,
        processing_time: Duration,
        compression_ratio: f64,
        original_bytes: usize,
    ) {
        let dimensions = vec![("FunctionName".to_string(), self.function_name.clone())];

        self.telemetry
            .emit(vec![
                MetricDatum {
                    name: "ThumbnailsCreated",
                    value: 1.0,
                    unit: MetricUnit::Count,
                    dimensions: dimensions.clone(),
                },
                MetricDatum {
                    name: "ProcessingTimeMs",
                    value: processing_time.as_secs_f64() * 1000.0,
                    unit: MetricUnit::Milliseconds,
                    dimensions: dimensions.clone(),
                },
                MetricDatum {
                    name: "CompressionRatio",
                    value: compression_ratio,
                    unit: MetricUnit::None,
                    dimensions: dimensions.clone(),
                },
                MetricDatum {
                    name: "OriginalSizeBytes",
                    value: original_bytes as f64,
                    unit: MetricUnit::Bytes,
                    dimensions,
                },
            ])
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::{FailingSink, RecordingSink};
    use bytes::Bytes;
    use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([50, 100, 150]));
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageOutputFormat::Png)
            .unwrap();
        buf
    }

    fn work_item(key: &str) -> WorkItem {
        WorkItem {
            bucket: "b".to_string(),
            source_key: key.to_string(),
        }
    }

    async fn seeded_storage(key: &str, data: Vec<u8>) -> Arc<StorageClient> {
        let storage = Arc::new(StorageClient::in_memory());
        storage
            .store("b", key, Bytes::from(data), "image/png")
            .await
            .unwrap();
        storage
    }

    #[tokio::test]
    async fn test_process_success() {
        let storage = seeded_storage("images/test.png", png_bytes(400, 300)).await;
        let sink = Arc::new(RecordingSink::new());
        let processor = ItemProcessor::new(storage.clone(), sink.clone(), &Config::default());

        let processed = processor.process(&work_item("images/test.png")).await.unwrap();

        assert_eq!(processed.thumbnail_key, "thumbnails/test.png");
        assert_eq!(processed.final_dimensions, (200, 150));
        assert!(processed.compression_ratio > 0.0);
        assert!(processed.compression_ratio.is_finite());

        // Thumbnail landed in storage and decodes within bounds
        let stored = storage.fetch("b", "thumbnails/test.png").await.unwrap();
        let decoded = image::load_from_memory(&stored).unwrap();
        assert!(decoded.width() <= 200 && decoded.height() <= 200);

        // Success metrics carry the identity dimension
        let calls = sink.calls();
        assert_eq!(calls.len(), 1);
        let (namespace, data) = &calls[0];
        assert_eq!(namespace, "Thumbox");
        assert_eq!(data.len(), 4);
        assert!(data.iter().all(|d| d
            .dimensions
            .contains(&("FunctionName".to_string(), "thumbox".to_string()))));
    }

    #[tokio::test]
    async fn test_fetch_failure() {
        let storage = Arc::new(StorageClient::in_memory());
        let sink = Arc::new(RecordingSink::new());
        let processor = ItemProcessor::new(storage, sink.clone(), &Config::default());

        let err = processor
            .process(&work_item("images/missing.jpg"))
            .await
            .unwrap_err();

        assert!(matches!(err, ItemError::Fetch { .. }));
        assert_eq!(err.source_key(), "images/missing.jpg");
        assert!(sink.calls().is_empty());
    }

    #[tokio::test]
    async fn test_transform_failure_on_garbage() {
        let storage = seeded_storage("images/bad.jpg", b"not an image".to_vec()).await;
        let sink = Arc::new(RecordingSink::new());
        let processor = ItemProcessor::new(storage.clone(), sink, &Config::default());

        let err = processor.process(&work_item("images/bad.jpg")).await.unwrap_err();

        assert!(matches!(err, ItemError::Transform { .. }));
        assert_eq!(err.stage(), "transform");

        // Nothing was written
        assert!(storage.fetch("b", "thumbnails/bad.jpg").await.is_err());
    }

    #[tokio::test]
    async fn test_telemetry_failure_does_not_fail_item() {
        let storage = seeded_storage("images/test.png", png_bytes(300, 300)).await;
        let processor = ItemProcessor::new(storage, Arc::new(FailingSink), &Config::default());

        let processed = processor.process(&work_item("images/test.png")).await;
        assert!(processed.is_ok());
    }
}
