use anyhow::{anyhow, Context, Result};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::ingest::Ingestor;
use crate::models::Sample;

use super::scheduler::Scheduler;
use super::source::SampleSource;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

const CAPTURE_TIMEOUT_SECS: u64 = 10;

pub type SharedSource = Arc<Mutex<Box<dyn SampleSource>>>;

/// Producer: capture on the scheduler's cadence and hand samples to the
/// ingest worker. A full queue drops the sample rather than piling up.
pub async fn capture_loop(
    source: SharedSource,
    mut scheduler: Scheduler,
    queue: mpsc::Sender<Sample>,
    cancel_token: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = tokio::time::sleep(scheduler.interval()) => {
                let captured = tokio::time::timeout(
                    Duration::from_secs(CAPTURE_TIMEOUT_SECS),
                    capture_once(Arc::clone(&source)),
                )
                .await;

                let sample = match captured {
                    Ok(Ok(sample)) => sample,
                    Ok(Err(err)) => {
                        log_error!("sample capture failed: {err:?}");
                        None
                    }
                    Err(_) => {
                        log_warn!("sample capture timeout (> {}s)", CAPTURE_TIMEOUT_SECS);
                        None
                    }
                };

                let previous = scheduler.state();
                let state = scheduler.observe(sample.as_ref().map(|s| s.tab));
                if state != previous {
                    log_debug!("scheduler {:?} -> {:?}", previous, state);
                }

                let Some(sample) = sample.filter(|s| s.tab.is_market()) else {
                    continue;
                };
                match queue.try_send(sample) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => log_warn!("ingest queue full, dropping sample"),
                    Err(TrySendError::Closed(_)) => {
                        log_info!("ingest queue closed, capture loop exiting");
                        break;
                    }
                }
            }
            _ = cancel_token.cancelled() => {
                log_info!("capture loop shutting down");
                break;
            }
        }
    }
}

async fn capture_once(source: SharedSource) -> Result<Option<Sample>> {
    tokio::task::spawn_blocking(move || {
        let mut guard = source
            .lock()
            .map_err(|_| anyhow!("sample source lock poisoned"))?;
        guard.capture()
    })
    .await
    .context("capture worker join failed")?
}

/// Consumer: the only task that touches the baseline and the store, so no
/// sample is ever processed twice concurrently.
pub async fn ingest_worker(
    mut ingestor: Ingestor,
    mut queue: mpsc::Receiver<Sample>,
    cancel_token: CancellationToken,
) -> Ingestor {
    loop {
        tokio::select! {
            received = queue.recv() => {
                let Some(sample) = received else {
                    break;
                };
                if let Err(err) = ingestor.ingest(sample).await {
                    log_error!("sample ingest failed: {err:?}");
                }
            }
            _ = cancel_token.cancelled() => {
                log_info!("ingest worker shutting down");
                break;
            }
        }
    }
    ingestor
}
