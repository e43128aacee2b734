use super::models::{Config, StorageProvider};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    EmptyPrefix { field: &'static str },

    #[error("{field} '{value}' must end with '/'")]
    PrefixMissingSlash { field: &'static str, value: String },

    #[error("source_prefix and output_prefix must differ ('{value}')")]
    IdenticalPrefixes { value: String },

    #[error("jpeg_quality must be in 1..=100, got {value}")]
    InvalidJpegQuality { value: u8 },

    #[error("{field} must be at least 1")]
    InvalidMaxDimension { field: &'static str },

    #[error("Storage provider is S3 but missing credentials (access_key or secret_key)")]
    MissingS3Credentials,
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_prefixes(config)?;
    validate_transform(config)?;
    validate_storage(config)?;
    Ok(())
}

fn validate_prefixes(config: &Config) -> Result<(), ValidationError> {
    validate_prefix("pipeline.source_prefix", &config.pipeline.source_prefix)?;
    validate_prefix("pipeline.output_prefix", &config.pipeline.output_prefix)?;

    if config.pipeline.source_prefix == config.pipeline.output_prefix {
        return Err(ValidationError::IdenticalPrefixes {
            value: config.pipeline.source_prefix.clone(),
        });
    }

    Ok(())
}

fn validate_prefix(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::EmptyPrefix { field });
    }

    if !value.ends_with('/') {
        return Err(ValidationError::PrefixMissingSlash {
            field,
            value: value.to_string(),
        });
    }

    Ok(())
}

fn validate_transform(config: &Config) -> Result<(), ValidationError> {
    let quality = config.pipeline.jpeg_quality;
    if quality == 0 || quality > 100 {
        return Err(ValidationError::InvalidJpegQuality { value: quality });
    }

    if config.pipeline.max_width == 0 {
        return Err(ValidationError::InvalidMaxDimension {
            field: "pipeline.max_width",
        });
    }
    if config.pipeline.max_height == 0 {
        return Err(ValidationError::InvalidMaxDimension {
            field: "pipeline.max_height",
        });
    }

    Ok(())
}

/// Validate storage credentials when provider is S3
fn validate_storage(config: &Config) -> Result<(), ValidationError> {
    if config.storage.provider == StorageProvider::S3 {
        if config.storage.access_key.is_none() || config.storage.secret_key.is_none() {
            return Err(ValidationError::MissingS3Credentials);
        }
    }

    Ok(())
}
