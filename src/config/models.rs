use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Storage provider type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageProvider {
    S3,
    Local,
    Memory,
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub provider: StorageProvider,
    /// Default bucket used when constructing envelopes locally
    #[serde(default = "default_bucket")]
    pub bucket: String,
    pub endpoint: Option<String>,
    pub region: Option<String>,
    /// Root directory for the `local` provider
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,
    /// S3 access key (loaded from environment, not from config file)
    #[serde(skip)]
    pub access_key: Option<String>,
    /// S3 secret key (loaded from environment, not from config file)
    #[serde(skip)]
    pub secret_key: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            provider: StorageProvider::Local,
            bucket: default_bucket(),
            endpoint: None,
            region: None,
            root: default_storage_root(),
            access_key: None,
            secret_key: None,
        }
    }
}

impl Default for StorageProvider {
    fn default() -> Self {
        StorageProvider::Local
    }
}

fn default_bucket() -> String {
    "thumbox-default".to_string()
}

fn default_storage_root() -> PathBuf {
    PathBuf::from("data/objects")
}

/// Pipeline configuration: routing prefixes and transform policy
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    /// Keys under this prefix are eligible for thumbnailing
    #[serde(default = "default_source_prefix")]
    pub source_prefix: String,
    /// Thumbnails are written under this prefix
    #[serde(default = "default_output_prefix")]
    pub output_prefix: String,
    #[serde(default = "default_max_dimension")]
    pub max_width: u32,
    #[serde(default = "default_max_dimension")]
    pub max_height: u32,
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source_prefix: default_source_prefix(),
            output_prefix: default_output_prefix(),
            max_width: default_max_dimension(),
            max_height: default_max_dimension(),
            jpeg_quality: default_jpeg_quality(),
        }
    }
}

fn default_source_prefix() -> String {
    "images/".to_string()
}

fn default_output_prefix() -> String {
    "thumbnails/".to_string()
}

fn default_max_dimension() -> u32 {
    200
}

fn default_jpeg_quality() -> u8 {
    85
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelemetryConfig {
    /// Metric namespace
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Identity dimension attached to every metric
    #[serde(default = "default_function_name")]
    pub function_name: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            function_name: default_function_name(),
        }
    }
}

fn default_namespace() -> String {
    "Thumbox".to_string()
}

fn default_function_name() -> String {
    "thumbox".to_string()
}
