//! Sweep execution and scheduling.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use postline_shared::ReaperConfig;

use crate::attachment::{Attachment, AttachmentError, AttachmentRepository, ReapClaim};
use crate::storage::BlobStore;

/// Outcome of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Expired unlinked attachments found.
    pub candidates: usize,
    /// Removed (blob and row).
    pub deleted: usize,
    /// Left in place after a failure, retried next sweep.
    pub deferred: usize,
    /// Linked or removed by someone else between listing and claiming.
    pub skipped: usize,
}

enum Outcome {
    Deleted,
    Deferred,
    Skipped,
}

/// Orphan attachment reaper.
pub struct Reaper<A: AttachmentRepository, B: BlobStore> {
    attachments: Arc<A>,
    blobs: Arc<B>,
    config: ReaperConfig,
    running: Mutex<()>,
}

impl<A: AttachmentRepository, B: BlobStore> Reaper<A, B> {
    /// Create a new reaper.
    #[must_use]
    pub fn new(attachments: Arc<A>, blobs: Arc<B>, config: ReaperConfig) -> Self {
        Self {
            attachments,
            blobs,
            config,
            running: Mutex::new(()),
        }
    }

    /// Run one sweep now.
    ///
    /// Returns `None` without doing anything if another sweep is in progress.
    ///
    /// # Errors
    ///
    /// Returns an error only if the candidate list cannot be read. Failures on
    /// individual candidates are counted as deferred.
    pub async fn sweep_once(&self) -> Result<Option<SweepReport>, AttachmentError> {
        self.sweep_at(Utc::now()).await
    }

    /// Run one sweep as if the current time were `now`.
    pub async fn sweep_at(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Option<SweepReport>, AttachmentError> {
        let Ok(_guard) = self.running.try_lock() else {
            debug!("Sweep already running, skipping");
            return Ok(None);
        };

        let cutoff = now - self.config.retention();
        let candidates = self.attachments.find_unlinked_before(cutoff).await?;

        let mut report = SweepReport {
            candidates: candidates.len(),
            ..SweepReport::default()
        };

        for candidate in &candidates {
            match self.reap(candidate).await {
                Outcome::Deleted => report.deleted += 1,
                Outcome::Deferred => report.deferred += 1,
                Outcome::Skipped => report.skipped += 1,
            }
        }

        info!(
            cutoff = %cutoff,
            candidates = report.candidates,
            deleted = report.deleted,
            deferred = report.deferred,
            skipped = report.skipped,
            "Orphan sweep finished"
        );

        Ok(Some(report))
    }

    async fn reap(&self, candidate: &Attachment) -> Outcome {
        let claim = match self.attachments.claim_unlinked(candidate.id).await {
            Ok(Some(claim)) => claim,
            Ok(None) => {
                debug!(attachment_id = %candidate.id, "Attachment linked or gone, skipping");
                return Outcome::Skipped;
            }
            Err(e) => {
                warn!(attachment_id = %candidate.id, error = %e, "Failed to claim attachment");
                return Outcome::Deferred;
            }
        };

        let blob_name = claim.attachment().blob_name.clone();

        match self.blobs.delete_if_exists(&blob_name).await {
            Ok(existed) => {
                if !existed {
                    debug!(attachment_id = %candidate.id, blob = %blob_name, "Blob already absent");
                }
            }
            Err(e) => {
                warn!(
                    attachment_id = %candidate.id,
                    blob = %blob_name,
                    error = %e,
                    "Failed to delete blob, deferring"
                );
                if let Err(e) = claim.release().await {
                    warn!(attachment_id = %candidate.id, error = %e, "Failed to release claim");
                }
                return Outcome::Deferred;
            }
        }

        match claim.delete().await {
            Ok(()) => {
                debug!(attachment_id = %candidate.id, blob = %blob_name, "Orphan attachment removed");
                Outcome::Deleted
            }
            Err(e) => {
                warn!(attachment_id = %candidate.id, error = %e, "Failed to delete attachment row, deferring");
                Outcome::Deferred
            }
        }
    }
}

impl<A, B> Reaper<A, B>
where
    A: AttachmentRepository + 'static,
    B: BlobStore + 'static,
{
    /// Sweep on the configured interval until `shutdown` is cancelled.
    ///
    /// The first sweep runs immediately. Ticks missed while a sweep runs long
    /// are dropped.
    pub fn spawn(self: Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(self.config.interval());
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            info!(
                interval_secs = self.config.interval_secs,
                retention_secs = self.config.retention_secs,
                "Starting orphan attachment reaper"
            );

            loop {
                tokio::select! {
                    () = shutdown.cancelled() => {
                        info!("Orphan attachment reaper stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        if let Err(e) = self.sweep_once().await {
                            error!(error = %e, "Orphan sweep failed");
                        }
                    }
                }
            }
        })
    }
}
