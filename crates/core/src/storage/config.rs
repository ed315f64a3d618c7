//! Storage configuration types.

use postline_shared::StorageSettings;
use postline_shared::config::StorageProvider;

use super::error::StorageError;

/// Limits applied to uploads before anything touches the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    /// Maximum file size in bytes.
    pub max_file_size: u64,
    /// Allowed MIME types. Empty means any type is accepted.
    pub allowed_mime_types: Vec<String>,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_file_size: StorageConfig::DEFAULT_MAX_FILE_SIZE,
            allowed_mime_types: StorageSettings::default().allowed_mime_types,
        }
    }
}

impl UploadPolicy {
    /// Check if a MIME type is allowed.
    ///
    /// Parameters such as `; charset=utf-8` are ignored.
    #[must_use]
    pub fn is_mime_type_allowed(&self, mime_type: &str) -> bool {
        if self.allowed_mime_types.is_empty() {
            return true;
        }
        let essence = mime_type.split(';').next().unwrap_or_default().trim();
        self.allowed_mime_types
            .iter()
            .any(|t| t.eq_ignore_ascii_case(essence))
    }

    /// Validate an upload against size and MIME type constraints.
    ///
    /// # Errors
    ///
    /// Returns an error if file size or MIME type is invalid.
    pub fn validate(&self, content_type: &str, size: u64) -> Result<(), StorageError> {
        if size > self.max_file_size {
            return Err(StorageError::file_too_large(size, self.max_file_size));
        }

        if !self.is_mime_type_allowed(content_type) {
            return Err(StorageError::invalid_mime_type(content_type));
        }

        Ok(())
    }
}

/// Storage service configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Storage provider configuration.
    pub provider: StorageProvider,
    /// Key prefix for attachment blobs.
    pub prefix: String,
    /// Upload limits.
    pub policy: UploadPolicy,
}

impl StorageConfig {
    /// Default max file size: 10MB.
    pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;
    /// Default key prefix.
    pub const DEFAULT_PREFIX: &'static str = "attachments";

    /// Create a new storage config with default settings.
    #[must_use]
    pub fn new(provider: StorageProvider) -> Self {
        Self {
            provider,
            prefix: Self::DEFAULT_PREFIX.to_string(),
            policy: UploadPolicy::default(),
        }
    }

    /// Build from the application settings.
    #[must_use]
    pub fn from_settings(settings: &StorageSettings) -> Self {
        Self {
            provider: settings.provider.clone(),
            prefix: settings.prefix.clone(),
            policy: UploadPolicy {
                max_file_size: settings.max_file_size,
                allowed_mime_types: settings.allowed_mime_types.clone(),
            },
        }
    }

    /// Get the provider name for logs.
    #[must_use]
    pub fn provider_name(&self) -> &'static str {
        match self.provider {
            StorageProvider::S3 { .. } => "s3",
            StorageProvider::AzureBlob { .. } => "azure_blob",
            StorageProvider::LocalFs { .. } => "local",
            StorageProvider::Memory => "memory",
        }
    }
}
