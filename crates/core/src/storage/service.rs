//! Blob store implementation using Apache OpenDAL.

use std::future::Future;

use bytes::Bytes;
use opendal::{ErrorKind, Operator, services};
use tracing::debug;
use uuid::Uuid;

use super::StorageProvider;
use super::config::{StorageConfig, UploadPolicy};
use super::error::StorageError;

/// Content storage for attachment files.
///
/// Blobs are addressed by an opaque name chosen by the store on `put`.
pub trait BlobStore: Send + Sync {
    /// Store bytes under a fresh name and return that name.
    fn put(
        &self,
        bytes: Bytes,
        content_type: &str,
    ) -> impl Future<Output = Result<String, StorageError>> + Send;

    /// Delete a blob. Returns `false` when it was already absent.
    fn delete_if_exists(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<bool, StorageError>> + Send;

    /// Read a blob back.
    fn get(&self, name: &str) -> impl Future<Output = Result<Bytes, StorageError>> + Send;
}

/// Storage service for attachment blobs.
pub struct StorageService {
    operator: Operator,
    config: StorageConfig,
}

impl std::fmt::Debug for StorageService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageService")
            .field("provider", &self.config.provider_name())
            .field("prefix", &self.config.prefix)
            .finish_non_exhaustive()
    }
}

impl StorageService {
    /// Create a new storage service from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage provider cannot be initialized.
    pub fn from_config(config: StorageConfig) -> Result<Self, StorageError> {
        let operator = Self::create_operator(&config.provider)?;
        Ok(Self { operator, config })
    }

    /// Create OpenDAL operator from provider config.
    fn create_operator(provider: &StorageProvider) -> Result<Operator, StorageError> {
        let operator = match provider {
            StorageProvider::S3 {
                endpoint,
                bucket,
                access_key_id,
                secret_access_key,
                region,
            } => {
                let builder = services::S3::default()
                    .endpoint(endpoint)
                    .bucket(bucket)
                    .access_key_id(access_key_id)
                    .secret_access_key(secret_access_key)
                    .region(region);

                Operator::new(builder)
                    .map_err(|e| StorageError::configuration(e.to_string()))?
                    .finish()
            }
            StorageProvider::AzureBlob {
                account,
                access_key,
                container,
            } => {
                let builder = services::Azblob::default()
                    .account_name(account)
                    .account_key(access_key)
                    .container(container);

                Operator::new(builder)
                    .map_err(|e| StorageError::configuration(e.to_string()))?
                    .finish()
            }
            StorageProvider::LocalFs { root } => {
                let builder = services::Fs::default().root(
                    root.to_str()
                        .ok_or_else(|| StorageError::configuration("invalid path"))?,
                );

                Operator::new(builder)
                    .map_err(|e| StorageError::configuration(e.to_string()))?
                    .finish()
            }
            StorageProvider::Memory => Operator::new(services::Memory::default())
                .map_err(|e| StorageError::configuration(e.to_string()))?
                .finish(),
        };

        Ok(operator)
    }

    /// Generate a fresh blob name: 32 lowercase hex characters.
    #[must_use]
    pub fn generate_blob_name() -> String {
        Uuid::new_v4().simple().to_string()
    }

    /// Map a blob name to its backend key.
    ///
    /// # Errors
    ///
    /// Returns `InvalidKey` for names this store never hands out.
    fn storage_key(&self, name: &str) -> Result<String, StorageError> {
        if !is_valid_blob_name(name) {
            return Err(StorageError::InvalidKey(name.to_string()));
        }
        Ok(format!("{}/{name}", self.config.prefix.trim_end_matches('/')))
    }

    /// Upload limits from the configuration.
    #[must_use]
    pub fn policy(&self) -> &UploadPolicy {
        &self.config.policy
    }

    /// Get the storage provider name.
    #[must_use]
    pub fn provider_name(&self) -> &'static str {
        self.config.provider_name()
    }
}

impl BlobStore for StorageService {
    async fn put(&self, bytes: Bytes, content_type: &str) -> Result<String, StorageError> {
        let name = Self::generate_blob_name();
        let key = self.storage_key(&name)?;
        let size = bytes.len();

        if self.operator.info().full_capability().write_with_content_type {
            self.operator
                .write_with(&key, bytes)
                .content_type(content_type)
                .await?;
        } else {
            self.operator.write(&key, bytes).await?;
        }

        debug!(blob = %name, size, content_type, "Blob stored");
        Ok(name)
    }

    async fn delete_if_exists(&self, name: &str) -> Result<bool, StorageError> {
        let key = self.storage_key(name)?;

        match self.operator.stat(&key).await {
            Ok(_) => {
                self.operator.delete(&key).await?;
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn get(&self, name: &str) -> Result<Bytes, StorageError> {
        let key = self.storage_key(name)?;

        match self.operator.read(&key).await {
            Ok(buffer) => Ok(buffer.to_bytes()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::not_found(name)),
            Err(e) => Err(e.into()),
        }
    }
}

/// Blob names are generated by `generate_blob_name`; anything else is rejected
/// before it can reach a backend path.
fn is_valid_blob_name(name: &str) -> bool {
    !name.is_empty() && name.len() <= 64 && name.bytes().all(|b| b.is_ascii_alphanumeric())
}
