//! Per-run orchestration: list, decide, copy, record.
//!
//! Blobs are processed strictly one at a time, in listing order, on a single
//! logical thread of control. The error handling is a two-level boundary:
//!   - an inner per-object boundary ([`process_object`]) that converts every
//!     failure into a tagged [`CopyOutcome`] and lets the run continue;
//!   - an outer per-run boundary that treats a listing failure as fatal and
//!     returns [`TransferError`] carrying whatever was recorded so far.
//!
//! The only shared mutable state is the single [`TransferReport`], mutated
//! exclusively by this control thread.

use futures::{pin_mut, StreamExt};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::contract::{ObjectDescriptor, ProgressSink, StorageClient, StorageError, TransferEvent};
use crate::copier;
use crate::lister;
use crate::marker::{self, CopyDecision};
use crate::report::{CopyOutcome, TransferReport};

/// Per-run options. An empty prefix lists the whole source container.
#[derive(Debug, Clone, Default)]
pub struct TransferOptions {
    pub prefix: String,
}

/// Fatal, per-run failures. Per-object failures never surface here; they are
/// recorded in the report and the run continues.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("failed to list source container: {cause}")]
    Listing {
        cause: StorageError,
        /// Outcomes accumulated before the listing failed. Objects past the
        /// failure point never appear in any list.
        partial: TransferReport,
    },
}

/// Runs one full transfer: every blob yielded by the listing ends up in
/// exactly one of the report's succeeded/skipped/failed lists.
pub async fn run_transfer<C, S>(
    client: &C,
    sink: &S,
    options: &TransferOptions,
) -> Result<TransferReport, TransferError>
where
    C: StorageClient + ?Sized,
    S: ProgressSink + ?Sized,
{
    info!(prefix = %options.prefix, "starting transfer run");
    let mut report = TransferReport::new();

    let objects = lister::list_objects(client, &options.prefix);
    pin_mut!(objects);

    while let Some(next) = objects.next().await {
        let object = match next {
            Ok(object) => object,
            Err(cause) => {
                error!(error = %cause, "listing failed, aborting run");
                return Err(TransferError::Listing {
                    cause,
                    partial: report,
                });
            }
        };

        report.record_listed(&object.name);
        sink.record(&TransferEvent::Listed {
            name: object.name.clone(),
        });

        let outcome = process_object(client, sink, &object).await;
        report.record(&object.name, outcome);
    }

    report.log_summary();
    Ok(report)
}

/// Inner per-object boundary: every failure becomes a tagged outcome, never
/// an escaping error.
async fn process_object<C, S>(client: &C, sink: &S, object: &ObjectDescriptor) -> CopyOutcome
where
    C: StorageClient + ?Sized,
    S: ProgressSink + ?Sized,
{
    let marker = match marker::read_marker(client, &object.name).await {
        Ok(marker) => marker,
        Err(e) => {
            warn!(blob = %object.name, error = %e, "failed to read checksum");
            sink.record(&TransferEvent::CopyFailed {
                name: object.name.clone(),
                reason: e.to_string(),
            });
            return CopyOutcome::Failed;
        }
    };

    match marker::decide(&marker) {
        CopyDecision::Skip => {
            sink.record(&TransferEvent::CopySkipped {
                name: object.name.clone(),
            });
            CopyOutcome::Skipped
        }
        CopyDecision::Copy(checksum) => {
            info!(blob = %object.name, "start to copy");
            sink.record(&TransferEvent::CopyStarted {
                name: object.name.clone(),
            });
            match copier::copy_and_mark(client, &object.name, &checksum).await {
                Ok(()) => {
                    info!(blob = %object.name, "completed copy");
                    sink.record(&TransferEvent::CopyCompleted {
                        name: object.name.clone(),
                    });
                    CopyOutcome::Succeeded
                }
                Err(e) => {
                    error!(blob = %object.name, error = %e, "failed to copy");
                    sink.record(&TransferEvent::CopyFailed {
                        name: object.name.clone(),
                        reason: e.to_string(),
                    });
                    CopyOutcome::Failed
                }
            }
        }
    }
}
