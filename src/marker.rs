//! Per-blob checksum/marker read and the pure copy decision.
//!
//! Each source blob carries its own transfer state: the service-computed
//! content MD5 plus a marker metadata attribute recording the MD5 at the time
//! of the last successful transfer. Reading both and comparing them is all
//! the decision needs.

use tracing::debug;

use crate::contract::{StorageClient, StorageError};

/// Metadata key on the source blob recording the content checksum as of its
/// last successful transfer.
pub const MARKER_METADATA_KEY: &str = "transfermarker";

/// Checksum state of one source blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumMarker {
    /// The blob's current content MD5 as reported by the storage service.
    pub current_checksum: String,
    /// Marker value recorded by a previous successful transfer, if any.
    pub recorded_marker: Option<String>,
}

/// What to do with one blob, decided purely from its [`ChecksumMarker`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyDecision {
    /// Copy the blob, then record this checksum as the new marker.
    Copy(String),
    /// The marker matches the current checksum: already transferred.
    Skip,
}

/// Fetches properties and metadata for `name` and derives its marker state.
///
/// A blob without a usable content checksum is an error; the worker records
/// it as failed and the run continues. Transport errors surface the same way.
pub async fn read_marker<C>(client: &C, name: &str) -> Result<ChecksumMarker, StorageError>
where
    C: StorageClient + ?Sized,
{
    let properties = client.fetch_properties(name).await?;

    let current_checksum = match properties.content_md5 {
        Some(checksum) if !checksum.is_empty() => checksum,
        _ => return Err(format!("blob {name}: content checksum unavailable").into()),
    };

    let recorded_marker = properties.metadata.get(MARKER_METADATA_KEY).cloned();
    match &recorded_marker {
        Some(marker) if *marker == current_checksum => {
            debug!(blob = %name, checksum = %current_checksum, "marker matches current checksum")
        }
        Some(marker) => {
            debug!(
                blob = %name,
                marker = %marker,
                checksum = %current_checksum,
                "marker found but value does not match"
            )
        }
        None => debug!(blob = %name, checksum = %current_checksum, "no marker recorded"),
    }

    Ok(ChecksumMarker {
        current_checksum,
        recorded_marker,
    })
}

/// Pure decision over a successful marker read. Failed reads never get here;
/// the worker classifies them as failed directly.
pub fn decide(marker: &ChecksumMarker) -> CopyDecision {
    match &marker.recorded_marker {
        Some(recorded) if *recorded == marker.current_checksum => CopyDecision::Skip,
        _ => CopyDecision::Copy(marker.current_checksum.clone()),
    }
}
