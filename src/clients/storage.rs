/// Object storage client
///
/// Reads workflow sources and lists their sibling files. `GcsObjectStorage` talks
/// to the storage JSON API; listings are one level deep (delimiter `/`) and
/// filtered by file extension on our side.

use crate::workflow::types::ObjectLocator;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(String),
    #[error("object storage returned {code}: {message}")]
    Status { code: u16, message: String },
    #[error("object storage request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid object storage url: {0}")]
    InvalidUrl(String),
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Read the full contents of one object
    async fn read_object(&self, locator: &ObjectLocator) -> Result<Vec<u8>, StorageError>;

    /// List objects directly under `prefix` (no recursion) whose name ends in `.{extension}`.
    /// An empty extension lists every object.
    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        extension: &str,
    ) -> Result<Vec<ObjectLocator>, StorageError>;

    /// Download every locator into `destination`, flattened to its file name
    async fn download_all(&self, locators: &[ObjectLocator], destination: &Path) -> Result<(), StorageError> {
        for locator in locators {
            let bytes = self.read_object(locator).await?;
            let target = destination.join(locator.file_name());
            tokio::fs::write(&target, bytes)
                .await
                .map_err(|source| StorageError::Write { path: target, source })?;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectListing {
    #[serde(default)]
    items: Vec<ObjectItem>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ObjectItem {
    name: String,
}

/// Storage JSON API client
#[derive(Debug, Clone)]
pub struct GcsObjectStorage {
    http: reqwest::Client,
    base_url: String,
    access_token: Option<String>,
}

impl GcsObjectStorage {
    pub fn new(base_url: impl Into<String>, access_token: Option<String>, http: reqwest::Client) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            access_token,
        }
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn check(response: reqwest::Response, what: &str) -> Result<reqwest::Response, StorageError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(StorageError::NotFound(what.to_string()));
        }
        let message = response.text().await.unwrap_or_default();
        Err(StorageError::Status {
            code: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl ObjectStorage for GcsObjectStorage {
    async fn read_object(&self, locator: &ObjectLocator) -> Result<Vec<u8>, StorageError> {
        let url = super::join_segments(
            &self.base_url,
            &["storage", "v1", "b", locator.bucket.as_str(), "o", locator.object.as_str()],
        )
        .map_err(StorageError::InvalidUrl)?;

        tracing::debug!("📥 Reading object {}", locator);
        let request = self.http.get(url).query(&[("alt", "media")]);
        let response = Self::check(self.authorized(request).send().await?, &locator.to_string()).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        extension: &str,
    ) -> Result<Vec<ObjectLocator>, StorageError> {
        let url = super::join_segments(&self.base_url, &["storage", "v1", "b", bucket, "o"])
            .map_err(StorageError::InvalidUrl)?;
        let suffix = format!(".{}", extension);

        let mut found = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut params = vec![("prefix", prefix.to_string()), ("delimiter", "/".to_string())];
            if let Some(token) = &page_token {
                params.push(("pageToken", token.clone()));
            }

            let request = self.http.get(url.clone()).query(&params);
            let what = format!("gs://{}/{}", bucket, prefix);
            let response = Self::check(self.authorized(request).send().await?, &what).await?;
            let listing: ObjectListing = response.json().await?;

            found.extend(
                listing
                    .items
                    .into_iter()
                    .filter(|item| !item.name.ends_with('/'))
                    .filter(|item| extension.is_empty() || item.name.ends_with(&suffix))
                    .map(|item| ObjectLocator::new(bucket, item.name)),
            );

            match listing.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        tracing::debug!("📂 Listed {} *.{} objects under gs://{}/{}", found.len(), extension, bucket, prefix);
        Ok(found)
    }
}
