use std::time::Duration;

use hop::path::normalize_remote;
use hop::{RemoteEntry, StorageBackend, StorageError, StorageZone};

use crate::listing::ObjectListing;

pub const STORAGE_BASE_URL: &str = "https://storage.bunnycdn.com";
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for one storage zone, authenticated with the zone password.
pub struct BunnyStorage {
    zone: StorageZone,
    base_url: Option<String>,
    client: reqwest::Client,
}

impl BunnyStorage {
    pub fn new(zone: StorageZone) -> Self {
        Self {
            zone,
            base_url: None,
            client: reqwest::Client::new(),
        }
    }

    /// Point the client at another storage endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    fn storage_base(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or(STORAGE_BASE_URL)
            .trim_end_matches('/')
    }

    fn object_url(&self, path: &str) -> String {
        let encoded: Vec<String> = normalize_remote(path)
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();

        format!(
            "{}/{}/{}",
            self.storage_base(),
            urlencoding::encode(&self.zone.name),
            encoded.join("/")
        )
    }

    fn directory_url(&self, path: &str) -> String {
        let url = self.object_url(path);
        if url.ends_with('/') { url } else { format!("{url}/") }
    }
}

async fn status_error(response: reqwest::Response) -> StorageError {
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "unknown".into());
    StorageError::Status { status, body }
}

#[async_trait::async_trait]
impl StorageBackend for BunnyStorage {
    fn zone_name(&self) -> &str {
        &self.zone.name
    }

    async fn list(&self, path: &str) -> Result<Vec<RemoteEntry>, StorageError> {
        let dir = normalize_remote(path);
        let url = self.directory_url(&dir);
        log::debug!("GET {url}");

        let response = self
            .client
            .get(&url)
            .header("AccessKey", &self.zone.password)
            .header("Accept", "application/json")
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| StorageError::Network(e.to_string()))?;

        if response.status().as_u16() == 404 {
            return Ok(Vec::new());
        }

        if response.status().as_u16() != 200 {
            return Err(status_error(response).await);
        }

        let listing: Vec<ObjectListing> = response
            .json()
            .await
            .map_err(|e| StorageError::Parse(e.to_string()))?;

        Ok(listing.into_iter().map(|o| o.into_entry(&dir)).collect())
    }

    async fn upload(&self, path: &str, content: Vec<u8>) -> Result<(), StorageError> {
        let url = self.object_url(path);
        log::debug!("PUT {url} ({} bytes)", content.len());

        let response = self
            .client
            .put(&url)
            .header("AccessKey", &self.zone.password)
            .header("Content-Type", "application/octet-stream")
            .timeout(REQUEST_TIMEOUT)
            .body(content)
            .send()
            .await
            .map_err(|e| StorageError::Network(e.to_string()))?;

        match response.status().as_u16() {
            200 | 201 => Ok(()),
            _ => Err(status_error(response).await),
        }
    }
}
