use std::sync::Arc;
use tokio::time::{interval, Duration};
use tracing::{error, info};

pub mod tasks;

/// Job scheduler for background tasks
pub struct JobScheduler {
    context: Arc<crate::context::AppContext>,
}

impl JobScheduler {
    pub fn new(context: Arc<crate::context::AppContext>) -> Self {
        Self { context }
    }

    /// Start all background jobs
    pub fn start(self: Arc<Self>) {
        info!("Starting background job scheduler");

        if self.context.config.maintenance.reconcile_enabled {
            tokio::spawn(Self::media_reconcile_job(Arc::clone(&self)));
        } else {
            info!("Media reconciliation disabled");
        }

        // Spawn monitoring tasks
        tokio::spawn(Self::health_check_job(Arc::clone(&self)));

        info!("Background jobs started");
    }

    /// Remove orphaned blobs and detach dangling videos
    async fn media_reconcile_job(scheduler: Arc<Self>) {
        let maintenance = scheduler.context.config.maintenance.clone();
        let grace = match maintenance.orphan_grace() {
            Ok(grace) => grace,
            Err(e) => {
                error!("Media reconciliation not started: {}", e);
                return;
            }
        };
        let mut interval = interval(Duration::from_secs(maintenance.reconcile_interval_secs));

        loop {
            interval.tick().await;
            info!("Running media reconciliation");

            match tasks::reconcile_media(&scheduler.context, grace).await {
                Ok(report) => {
                    if report.orphans_removed > 0 || report.dangling_detached > 0 {
                        info!(
                            orphans_removed = report.orphans_removed,
                            orphans_deferred = report.orphans_deferred,
                            dangling_detached = report.dangling_detached,
                            "Media reconciliation repaired storage"
                        );
                    } else {
                        info!("Media reconciliation: stores consistent");
                    }
                }
                Err(e) => error!("Failed to reconcile media: {}", e),
            }
        }
    }

    /// Health check job (runs every 5 minutes)
    async fn health_check_job(scheduler: Arc<Self>) {
        let mut interval = interval(Duration::from_secs(300)); // Every 5 minutes

        loop {
            interval.tick().await;

            match tasks::health_check(&scheduler.context).await {
                Ok(_) => {
                    // Silent success - health is good
                }
                Err(e) => error!("Health check failed: {}", e),
            }
        }
    }
}
