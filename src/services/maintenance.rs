use tokio_cron_scheduler::{Job, JobScheduler};

use crate::error::{Error, Result};
use crate::services::job_service::JobService;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MaintenanceReport {
    pub deactivated: u64,
    pub reconciled: u64,
}

/// Closes postings past their deadline, then repairs drifted application counters.
pub async fn run_once(jobs: &JobService) -> Result<MaintenanceReport> {
    let deactivated = jobs.deactivate_expired().await?;
    let reconciled = jobs.reconcile_counts().await?;
    Ok(MaintenanceReport {
        deactivated,
        reconciled,
    })
}

fn scheduler_error(e: impl std::fmt::Debug) -> Error {
    Error::Internal(format!("Scheduler error: {:?}", e))
}

/// Starts the maintenance schedule. The returned scheduler must be kept alive.
pub async fn start(jobs: JobService, cron: &str) -> Result<JobScheduler> {
    let sched = JobScheduler::new().await.map_err(scheduler_error)?;

    let job = Job::new_async(cron, move |_id, _lock| {
        let jobs = jobs.clone();
        Box::pin(async move {
            match run_once(&jobs).await {
                Ok(report) => tracing::debug!(
                    deactivated = report.deactivated,
                    reconciled = report.reconciled,
                    "maintenance run finished"
                ),
                Err(e) => tracing::error!(error = ?e, "maintenance run failed"),
            }
        })
    })
    .map_err(scheduler_error)?;

    sched.add(job).await.map_err(scheduler_error)?;
    sched.start().await.map_err(scheduler_error)?;
    tracing::info!(cron, "maintenance scheduler started");
    Ok(sched)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheduler_errors_surface_as_internal() {
        let err = scheduler_error("bad cron");
        assert!(matches!(err, Error::Internal(msg) if msg.contains("bad cron")));
    }
}
