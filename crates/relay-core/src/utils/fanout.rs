/// Concurrent fan-out helper for independent I/O-bound jobs
use crate::error::RelayError;
use futures::future::{join_all, BoxFuture};
use tracing::error;

/// Drives all jobs to completion and aggregates failures.
///
/// Jobs run concurrently on the calling task; nothing is cancelled on first
/// failure and there is no timeout here, the underlying calls own their own
/// deadlines. After every job has finished, any failure is reported as a
/// single Handled 500 listing each failing job; otherwise the collected
/// results are returned (in submission order).
pub async fn run_all<T>(
    jobs: Vec<BoxFuture<'_, Result<T, RelayError>>>,
) -> Result<Vec<T>, RelayError> {
    let total = jobs.len();
    let outcomes = join_all(jobs).await;

    let mut results = Vec::with_capacity(total);
    let mut failures = 0;

    for (job, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            Ok(result) => results.push(result),
            Err(err) => {
                failures += 1;
                error!(job, error = %err, "Parallel job failed");
            }
        }
    }

    if failures > 0 {
        return Err(RelayError::with_status(
            format!(
                "Error(s) while running parallel jobs: {} of {} failed",
                failures, total
            ),
            500,
        ));
    }

    Ok(results)
}
