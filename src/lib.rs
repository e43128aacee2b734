pub mod config;
pub mod envelope;
pub mod observability;
pub mod pipeline;
pub mod storage;
pub mod telemetry; // Expose for tests (RecordingSink)
pub mod transform;
