#![allow(unused)]

//! # contract: seams between the transfer workflow and the outside world
//!
//! This module defines the [`StorageClient`] trait the whole workflow drives,
//! plus the [`ProgressSink`] capability injected for per-event logging.
//!
//! ## Interface & Extensibility
//! - Implement [`StorageClient`] to back the workflow with a different storage
//!   service; the production implementation is [`crate::azure::AzureBlobClient`].
//! - All storage methods are async, returning boxed error trait objects.
//! - Both traits are annotated for `mockall` so tests can generate
//!   deterministic mocks (gated on the `test-export-mocks` feature, on by
//!   default, so the mocks are reachable from `tests/`).

use std::collections::HashMap;

use async_trait::async_trait;
use mockall::{automock, predicate::*};
use tracing::{debug, error, info};

/// One blob as yielded by the source container listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectDescriptor {
    /// Blob name, unique within its container. May contain `/` separators.
    pub name: String,
    /// Full URI of the blob within the source container.
    pub uri: String,
}

/// One page of a segmented container listing. An absent continuation token
/// means the last page has been returned.
#[derive(Debug, Clone, Default)]
pub struct ObjectPage {
    pub objects: Vec<ObjectDescriptor>,
    pub continuation: Option<String>,
}

/// Built-in properties and user metadata fetched for a single blob.
#[derive(Debug, Clone, Default)]
pub struct ObjectProperties {
    /// Content checksum recorded by the storage service, if it has one.
    pub content_md5: Option<String>,
    /// User-defined key/value attributes on the blob.
    pub metadata: HashMap<String, String>,
}

/// Error type for storage operations (boxed, like the other seams).
pub type StorageError = Box<dyn std::error::Error + Send + Sync>;

/// Client for the storage service backing one transfer run: a source
/// container that is listed and read, and a destination container that is
/// copied into.
///
/// The trait is implemented by real clients and by test mocks.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait StorageClient: Send + Sync {
    /// Fetch one page of the source container listing. `continuation` is the
    /// token returned with the previous page, or `None` for the first page.
    async fn list_page(
        &self,
        prefix: &str,
        continuation: Option<String>,
    ) -> Result<ObjectPage, StorageError>;

    /// Fetch built-in properties and user metadata for a source blob.
    async fn fetch_properties(&self, name: &str) -> Result<ObjectProperties, StorageError>;

    /// Server-side copy of a source blob into the destination container,
    /// overwriting any destination blob of the same name. The blob's bytes
    /// never pass through this process.
    async fn copy_object(&self, name: &str) -> Result<(), StorageError>;

    /// Write one metadata key on a source blob, preserving the other keys.
    async fn set_metadata(
        &self,
        name: &str,
        key: &str,
        value: &str,
    ) -> Result<(), StorageError>;
}

/// A single event in the life of a transfer run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferEvent {
    Listed { name: String },
    CopyStarted { name: String },
    CopyCompleted { name: String },
    CopySkipped { name: String },
    CopyFailed { name: String, reason: String },
    /// Progress callback from the service-side copy. Used for logging only,
    /// never for control decisions.
    BytesTransferred { name: String, bytes: u64 },
}

/// Injected logging/progress capability with a single record operation.
/// Production uses [`TracingSink`]; tests substitute a capturing mock.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait ProgressSink: Send + Sync {
    fn record(&self, event: &TransferEvent);
}

/// Progress sink that forwards every event to `tracing`.
#[derive(Debug, Default)]
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn record(&self, event: &TransferEvent) {
        match event {
            TransferEvent::Listed { name } => debug!(blob = %name, "listed source blob"),
            TransferEvent::CopyStarted { name } => info!(blob = %name, "start to copy"),
            TransferEvent::CopyCompleted { name } => info!(blob = %name, "completed copy"),
            TransferEvent::CopySkipped { name } => {
                debug!(blob = %name, "already transferred, skipping")
            }
            TransferEvent::CopyFailed { name, reason } => {
                error!(blob = %name, reason = %reason, "failed to copy")
            }
            TransferEvent::BytesTransferred { name, bytes } => {
                debug!(blob = %name, bytes, "bytes transferred")
            }
        }
    }
}
