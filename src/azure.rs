//! Concrete [`StorageClient`] against the Azure Blob REST API.
//!
//! Both containers are addressed by SAS URIs; every request carries the SAS
//! query string of its container. Copies are issued service-side: the process
//! never holds the blob's bytes, it only polls the destination's copy status
//! and forwards byte progress to the injected [`ProgressSink`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, CONTENT_LENGTH};
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::debug;

use crate::config::{ConfigError, TransferConfig};
use crate::contract::{
    ObjectDescriptor, ObjectPage, ObjectProperties, ProgressSink, StorageClient, StorageError,
    TransferEvent,
};

const STORAGE_API_VERSION: &str = "2021-08-06";
const METADATA_HEADER_PREFIX: &str = "x-ms-meta-";
const COPY_POLL_INTERVAL: Duration = Duration::from_secs(2);

pub struct AzureBlobClient {
    http: Client,
    source: Url,
    target: Url,
    page_size: Option<u32>,
    sink: Arc<dyn ProgressSink>,
}

impl AzureBlobClient {
    /// Builds a client from the loaded configuration. Fails fast on SAS URIs
    /// that do not parse; no storage call is made here.
    pub fn new(config: &TransferConfig, sink: Arc<dyn ProgressSink>) -> Result<Self, ConfigError> {
        let source = parse_container_uri("sourceSasUri", &config.source_container_sas)?;
        let target = parse_container_uri("targetSasUri", &config.target_container_sas)?;
        Ok(Self {
            http: Client::new(),
            source,
            target,
            page_size: config.page_size,
            sink,
        })
    }
}

#[async_trait]
impl StorageClient for AzureBlobClient {
    async fn list_page(
        &self,
        prefix: &str,
        continuation: Option<String>,
    ) -> Result<ObjectPage, StorageError> {
        let mut url = self.source.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("restype", "container");
            query.append_pair("comp", "list");
            query.append_pair("include", "metadata");
            if !prefix.is_empty() {
                query.append_pair("prefix", prefix);
            }
            if let Some(size) = self.page_size {
                query.append_pair("maxresults", &size.to_string());
            }
            if let Some(token) = continuation.as_deref().filter(|token| !token.is_empty()) {
                query.append_pair("marker", token);
            }
        }

        let response = self
            .http
            .get(url)
            .header("x-ms-version", STORAGE_API_VERSION)
            .send()
            .await?
            .error_for_status()?;
        let body = response.text().await?;
        let listing: ListBlobsResponse = quick_xml::de::from_str(&body)
            .map_err(|e| StorageError::from(format!("malformed listing response: {e}")))?;

        Ok(page_from_listing(listing, &self.source))
    }

    async fn fetch_properties(&self, name: &str) -> Result<ObjectProperties, StorageError> {
        let url = object_url(&self.source, name);
        let response = self
            .http
            .head(url)
            .header("x-ms-version", STORAGE_API_VERSION)
            .send()
            .await?
            .error_for_status()?;
        Ok(properties_from_headers(response.headers()))
    }

    async fn copy_object(&self, name: &str) -> Result<(), StorageError> {
        let source_url = object_url(&self.source, name);
        let target_url = object_url(&self.target, name);

        // Copy Blob overwrites an existing destination blob unconditionally.
        let response = self
            .http
            .put(target_url.clone())
            .header("x-ms-version", STORAGE_API_VERSION)
            .header("x-ms-copy-source", source_url.to_string())
            .header(CONTENT_LENGTH, "0")
            .send()
            .await?
            .error_for_status()?;

        let mut status = copy_status(response.headers());
        loop {
            match status {
                CopyStatus::Success => {
                    debug!(blob = %name, "service-side copy completed");
                    return Ok(());
                }
                CopyStatus::Other(state) => {
                    return Err(
                        format!("blob {name}: service-side copy ended in state {state}").into(),
                    );
                }
                CopyStatus::Pending => {}
            }

            tokio::time::sleep(COPY_POLL_INTERVAL).await;
            let response = self
                .http
                .head(target_url.clone())
                .header("x-ms-version", STORAGE_API_VERSION)
                .send()
                .await?
                .error_for_status()?;
            if let Some(bytes) = copy_progress_bytes(response.headers()) {
                self.sink.record(&TransferEvent::BytesTransferred {
                    name: name.to_owned(),
                    bytes,
                });
            }
            status = copy_status(response.headers());
        }
    }

    async fn set_metadata(&self, name: &str, key: &str, value: &str) -> Result<(), StorageError> {
        // Set Blob Metadata replaces the whole map, so merge with what is
        // already there.
        let mut metadata = self.fetch_properties(name).await?.metadata;
        metadata.insert(key.to_owned(), value.to_owned());

        let mut url = object_url(&self.source, name);
        url.query_pairs_mut().append_pair("comp", "metadata");

        let mut request = self
            .http
            .put(url)
            .header("x-ms-version", STORAGE_API_VERSION)
            .header(CONTENT_LENGTH, "0");
        for (meta_key, meta_value) in &metadata {
            request = request.header(
                format!("{METADATA_HEADER_PREFIX}{meta_key}"),
                meta_value.as_str(),
            );
        }
        request.send().await?.error_for_status()?;
        Ok(())
    }
}

fn parse_container_uri(field: &'static str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::InvalidSasUri {
        field,
        message: e.to_string(),
    })?;
    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidSasUri {
            field,
            message: "URI cannot carry a blob path".into(),
        });
    }
    Ok(url)
}

/// URL of one blob within its container, keeping the SAS query intact.
fn object_url(container: &Url, name: &str) -> Url {
    let mut url = container.clone();
    // Bases that reject path segments were refused at construction.
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().extend(name.split('/'));
    }
    url
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListBlobsResponse {
    #[serde(default)]
    blobs: BlobList,
    #[serde(default)]
    next_marker: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct BlobList {
    #[serde(default, rename = "Blob")]
    entries: Vec<BlobEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct BlobEntry {
    name: String,
}

fn page_from_listing(listing: ListBlobsResponse, container: &Url) -> ObjectPage {
    let objects = listing
        .blobs
        .entries
        .into_iter()
        .map(|entry| {
            let uri = object_url(container, &entry.name).to_string();
            ObjectDescriptor {
                name: entry.name,
                uri,
            }
        })
        .collect();
    // The service signals the last page with an empty NextMarker element.
    let continuation = listing.next_marker.filter(|token| !token.is_empty());
    ObjectPage {
        objects,
        continuation,
    }
}

fn properties_from_headers(headers: &HeaderMap) -> ObjectProperties {
    let content_md5 = headers
        .get("content-md5")
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);

    let mut metadata = HashMap::new();
    for (header_name, header_value) in headers {
        if let Some(meta_key) = header_name.as_str().strip_prefix(METADATA_HEADER_PREFIX) {
            if let Ok(meta_value) = header_value.to_str() {
                metadata.insert(meta_key.to_owned(), meta_value.to_owned());
            }
        }
    }

    ObjectProperties {
        content_md5,
        metadata,
    }
}

#[derive(Debug, PartialEq, Eq)]
enum CopyStatus {
    Pending,
    Success,
    Other(String),
}

fn copy_status(headers: &HeaderMap) -> CopyStatus {
    match headers
        .get("x-ms-copy-status")
        .and_then(|value| value.to_str().ok())
    {
        Some("pending") => CopyStatus::Pending,
        // A synchronous completion carries no status header at all.
        Some("success") | None => CopyStatus::Success,
        Some(other) => CopyStatus::Other(other.to_owned()),
    }
}

fn copy_progress_bytes(headers: &HeaderMap) -> Option<u64> {
    // Header format: "<copied>/<total>".
    headers
        .get("x-ms-copy-progress")?
        .to_str()
        .ok()?
        .split('/')
        .next()?
        .parse()
        .ok()
}
