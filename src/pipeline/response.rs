//! Invocation response returned to the invoking runtime on non-fatal completion

use super::batch::{BatchResult, ItemOutcome};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct ProcessedFile {
    pub source_key: String,
    pub thumbnail_key: String,
}

#[derive(Debug, Serialize)]
struct ResponseBody {
    message: &'static str,
    processed_files: Vec<ProcessedFile>,
    total_processed: usize,
    total_files: usize,
    failed_files: usize,
    total_execution_time_seconds: f64,
}

/// Wire shape expected by the invoking runtime: a status code plus a
/// JSON-string body
#[derive(Debug, Serialize)]
pub struct InvocationResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: String,
}

impl InvocationResponse {
    pub fn from_batch(result: &BatchResult) -> Result<Self, serde_json::Error> {
        let processed_files = result
            .items
            .iter()
            .filter_map(|outcome| match outcome {
                ItemOutcome::Success(processed) => Some(ProcessedFile {
                    source_key: processed.source_key.clone(),
                    thumbnail_key: processed.thumbnail_key.clone(),
                }),
                _ => None,
            })
            .collect();

        let body = ResponseBody {
            message: "Thumbnails processed successfully",
            processed_files,
            total_processed: result.succeeded,
            total_files: result.total(),
            failed_files: result.failed,
            total_execution_time_seconds: result.duration.as_secs_f64(),
        };

        Ok(Self {
            status_code: 200,
            body: serde_json::to_string(&body)?,
        })
    }
}
