//! Copy executor: the server-side copy, then the marker write.

use tracing::{info, warn};

use crate::contract::{StorageClient, StorageError};
use crate::marker::MARKER_METADATA_KEY;

/// Copies `name` into the destination container, then records `checksum` as
/// the marker on the source blob.
///
/// The marker is written only after the copy completes. A crash between the
/// two leaves no marker, so the next run re-copies instead of skipping a
/// stale destination blob.
pub async fn copy_and_mark<C>(client: &C, name: &str, checksum: &str) -> Result<(), StorageError>
where
    C: StorageClient + ?Sized,
{
    client.copy_object(name).await?;

    if let Err(e) = client
        .set_metadata(name, MARKER_METADATA_KEY, checksum)
        .await
    {
        warn!(blob = %name, error = %e, "copied but failed to record marker; next run re-copies");
        return Err(e);
    }

    info!(blob = %name, checksum = %checksum, "marker recorded");
    Ok(())
}
