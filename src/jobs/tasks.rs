/// Background task implementations
use crate::{
    blob_store::{BlobCategory, DeleteOutcome},
    context::AppContext,
    error::{VidError, VidResult},
};
use chrono::Utc;
use std::collections::HashSet;
use tracing::{info, warn};

/// Outcome of one reconciliation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub orphans_removed: u64,
    /// Unreferenced but younger than the grace period
    pub orphans_deferred: u64,
    pub dangling_detached: u64,
}

/// Compare the blob listing with the references held in the metadata store
///
/// Unreferenced blobs older than `grace` are deleted. Ready videos whose blob
/// is missing are marked pending so read paths stop returning them.
pub async fn reconcile_media(ctx: &AppContext, grace: chrono::Duration) -> VidResult<SweepReport> {
    let mut report = SweepReport::default();

    // List before collecting references: a row inserted meanwhile is still seen
    let mut listed = Vec::new();
    for category in BlobCategory::ALL {
        listed.extend(ctx.blob_store.list(category).await?);
    }

    let mut referenced: HashSet<String> = HashSet::new();
    referenced.extend(ctx.videos.referenced_blobs().await?);
    referenced.extend(ctx.channels.referenced_avatars().await?);
    referenced.extend(ctx.users.referenced_avatars().await?);
    referenced.insert(ctx.config.media.default_thumbnail.clone());
    referenced.insert(ctx.config.media.default_avatar.clone());

    let cutoff = Utc::now() - grace;
    for entry in listed {
        if referenced.contains(&entry.reference) {
            continue;
        }
        if entry.modified > cutoff {
            report.orphans_deferred += 1;
            continue;
        }
        if ctx.blob_store.delete(&entry.reference).await? == DeleteOutcome::Deleted {
            info!(reference = %entry.reference, size = entry.size, "Removed orphan blob");
            report.orphans_removed += 1;
        }
    }

    for (video_id, reference) in ctx.videos.ready_references().await? {
        match ctx.blob_store.exists(&reference).await {
            Ok(true) => continue,
            Ok(false) => {}
            // Unparseable references can never be served
            Err(VidError::Validation(_)) => {}
            Err(e) => return Err(e),
        }
        if ctx.videos.detach(video_id, &reference).await?.rows_affected > 0 {
            warn!(video_id, reference = %reference, "Detached video with missing blob");
            report.dangling_detached += 1;
        }
    }

    Ok(report)
}

/// Health check - verify all systems are operational
pub async fn health_check(ctx: &AppContext) -> VidResult<()> {
    // Check database connectivity
    sqlx::query("SELECT 1").fetch_one(&ctx.db).await?;

    Ok(())
}
