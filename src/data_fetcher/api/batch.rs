//! Chunked execution of independent upstream calls

use futures::future::join_all;
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::AppError;

/// Outcome counts of one [`run_batches`] invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub succeeded: usize,
    pub not_found: usize,
    pub failed: usize,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.succeeded + self.not_found + self.failed
    }
}

/// Runs `calls` in chunks of `batch_size`, sleeping `delay` between chunks.
///
/// Calls inside a chunk run concurrently and every call settles before the
/// next chunk starts. A failing call never cancels its siblings; failures
/// are logged and counted, not returned. No delay follows the last chunk.
/// A `batch_size` of zero is treated as one.
pub async fn run_batches<T, F, Fut>(calls: Vec<F>, batch_size: usize, delay: Duration) -> BatchReport
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    let batch_size = batch_size.max(1);
    let total = calls.len();
    let batch_count = total.div_ceil(batch_size);
    let mut report = BatchReport::default();
    let mut pending = calls.into_iter().peekable();
    let mut batch_index = 0usize;

    while pending.peek().is_some() {
        batch_index += 1;
        let chunk: Vec<Fut> = pending.by_ref().take(batch_size).map(|call| call()).collect();
        debug!(
            "Running batch {}/{} with {} calls",
            batch_index,
            batch_count,
            chunk.len()
        );

        for result in join_all(chunk).await {
            match result {
                Ok(_) => report.succeeded += 1,
                Err(e) if e.is_not_found() => {
                    debug!("Batch call found no data: {}", e);
                    report.not_found += 1;
                }
                Err(e) => {
                    warn!("Batch call failed: {}", e);
                    report.failed += 1;
                }
            }
        }

        if pending.peek().is_some() && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    info!(
        "Batches complete: {} calls, {} succeeded, {} not found, {} failed",
        total, report.succeeded, report.not_found, report.failed
    );
    report
}
