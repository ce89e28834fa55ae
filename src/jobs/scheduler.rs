use chrono::Utc;
use tokio::time::{interval, Duration, MissedTickBehavior};

use super::ExpiryJob;

/// Runs the expiry job for every document class on a fixed interval.
///
/// The HTTP job endpoints stay available; this only replaces an external
/// cron trigger for single-node deployments.
pub struct ExpiryScheduler {
    job: ExpiryJob,
    interval_secs: u64,
}

impl ExpiryScheduler {
    pub fn new(job: ExpiryJob, interval_secs: u64) -> Self {
        Self { job, interval_secs }
    }

    pub async fn run(self) {
        tracing::info!(
            interval_secs = self.interval_secs,
            "Document expiry scheduler started"
        );

        let mut tick = interval(Duration::from_secs(self.interval_secs));
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tick.tick().await;
            match self.job.run_all(Utc::now()).await {
                Ok(summary) => tracing::info!(
                    checked = summary.total_checked,
                    sent = summary.notifications_sent,
                    errors = summary.errors.len(),
                    "Scheduled expiry check completed"
                ),
                Err(e) => tracing::error!(error = %e, "Scheduled expiry check failed"),
            }
        }
    }
}
