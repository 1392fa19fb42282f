use serde::Deserialize;
use serde::de::DeserializeOwned;

use hop::{DnsZone, EdgeRule, Hostname, StorageZone};

use crate::storage::REQUEST_TIMEOUT;

pub const API_BASE_URL: &str = "https://api.bunny.net";

/// Errors from the account-level control plane.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(String),

    #[error("API request failed with HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("could not parse API response: {0}")]
    Parse(String),

    #[error("pull zone '{0}' not found")]
    PullZoneNotFound(String),

    #[error("no storage zone found for pull zone '{0}'")]
    StorageZoneNotFound(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PullZone {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PullZoneDetails {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub edge_rules: Vec<EdgeRule>,
    #[serde(default)]
    pub hostnames: Vec<Hostname>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StorageZoneResponse {
    id: i64,
    name: String,
    #[serde(default)]
    password: String,
}

/// `GET /dnszone` answers with a page object or, on older accounts, a bare array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DnsZoneList {
    Page {
        #[serde(rename = "Items")]
        items: Vec<DnsZone>,
    },
    Bare(Vec<DnsZone>),
}

/// Client for the control-plane API, authenticated with the account API key.
pub struct ApiClient {
    api_key: String,
    base_url: Option<String>,
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: None,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    fn api_base(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or(API_BASE_URL)
            .trim_end_matches('/')
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{path}", self.api_base());
        log::debug!("{method} {url}");
        self.client
            .request(method, url)
            .header("AccessKey", &self.api_key)
            .header("Accept", "application/json")
            .timeout(REQUEST_TIMEOUT)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, ApiError> {
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown".into());
            return Err(ApiError::Status { status, body });
        }

        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send(self.request(reqwest::Method::GET, path))
            .await?
            .json()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))
    }

    pub async fn pull_zones(&self) -> Result<Vec<PullZone>, ApiError> {
        self.get_json("/pullzone").await
    }

    /// Look up a pull zone by name, ignoring case.
    pub async fn find_pull_zone(&self, name: &str) -> Result<PullZone, ApiError> {
        self.pull_zones()
            .await?
            .into_iter()
            .find(|zone| zone.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| ApiError::PullZoneNotFound(name.to_owned()))
    }

    pub async fn pull_zone_details(&self, id: i64) -> Result<PullZoneDetails, ApiError> {
        self.get_json(&format!("/pullzone/{id}")).await
    }

    pub async fn edge_rules(&self, pull_zone_id: i64) -> Result<Vec<EdgeRule>, ApiError> {
        Ok(self.pull_zone_details(pull_zone_id).await?.edge_rules)
    }

    /// The storage zone backing a pull zone: the one sharing its name.
    pub async fn storage_zone_for(&self, pull_zone_id: i64) -> Result<StorageZone, ApiError> {
        let details = self.pull_zone_details(pull_zone_id).await?;
        let zones: Vec<StorageZoneResponse> = self.get_json("/storagezone").await?;

        zones
            .into_iter()
            .find(|zone| zone.name.eq_ignore_ascii_case(&details.name))
            .map(|zone| StorageZone {
                id: zone.id,
                name: zone.name,
                password: zone.password,
            })
            .ok_or(ApiError::StorageZoneNotFound(details.name))
    }

    pub async fn add_edge_rule(&self, pull_zone_id: i64, rule: &EdgeRule) -> Result<(), ApiError> {
        let request = self
            .request(
                reqwest::Method::POST,
                &format!("/pullzone/{pull_zone_id}/edgerules/addOrUpdate"),
            )
            .json(rule);
        self.send(request).await?;
        Ok(())
    }

    pub async fn dns_zones(&self) -> Result<Vec<DnsZone>, ApiError> {
        let list: DnsZoneList = self.get_json("/dnszone").await?;
        Ok(match list {
            DnsZoneList::Page { items } => items,
            DnsZoneList::Bare(zones) => zones,
        })
    }
}
