//! External media storage
//!
//! Applicant photos live in a hosted object-storage service and are
//! referenced by ID from reservations and applications. This module only
//! deletes: uploads happen at the (external) submission boundary.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config::StorageConfig;

#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("Storage network error: {message}")]
    Network { message: String },

    #[error("Storage service error: HTTP {status}: {message}")]
    Service { status: u16, message: String },
}

/// Deletes stored images by ID. Callers treat failures as countable
/// outcomes, never as aborts.
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn delete_image(&self, image_id: &str) -> Result<(), StorageError>;
}

/// HTTP-backed image store against the media service's REST API.
pub struct HttpImageStore {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpImageStore {
    pub fn new(config: &StorageConfig) -> Result<Self, StorageError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| StorageError::Network {
                message: format!("failed to initialize HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl ImageStore for HttpImageStore {
    async fn delete_image(&self, image_id: &str) -> Result<(), StorageError> {
        let url = format!("{}/files/{}", self.base_url, image_id);
        let response = self
            .client
            .delete(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| StorageError::Network {
                message: format!("image delete request failed: {}", e),
            })?;

        let status = response.status();
        // A 404 means the image is already gone, which is what we wanted.
        if status.is_success() || status.as_u16() == 404 {
            debug!(image_id = %image_id, "Image deleted from storage");
            return Ok(());
        }

        let message = response.text().await.unwrap_or_default();
        Err(StorageError::Service {
            status: status.as_u16(),
            message,
        })
    }
}
