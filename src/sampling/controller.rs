use anyhow::{bail, Context, Result};
use log::info;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::ingest::Ingestor;
use crate::settings::SamplingSettings;

use super::loop_worker::{capture_loop, ingest_worker, SharedSource};
use super::scheduler::Scheduler;
use super::source::SampleSource;

/// Owns the capture task and the ingest worker.
#[derive(Default)]
pub struct SamplingController {
    capture: Option<JoinHandle<()>>,
    ingest: Option<JoinHandle<Ingestor>>,
    cancel_token: Option<CancellationToken>,
}

impl SamplingController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.capture.is_some()
    }

    pub fn start_sampling(
        &mut self,
        source: Box<dyn SampleSource>,
        ingestor: Ingestor,
        settings: &SamplingSettings,
    ) -> Result<()> {
        if self.is_running() {
            bail!("sampling already active");
        }

        let cancel_token = CancellationToken::new();
        let (queue_tx, queue_rx) = mpsc::channel(settings.queue_capacity.max(1));
        let source: SharedSource = Arc::new(Mutex::new(source));

        self.ingest = Some(tokio::spawn(ingest_worker(
            ingestor,
            queue_rx,
            cancel_token.clone(),
        )));
        self.capture = Some(tokio::spawn(capture_loop(
            source,
            Scheduler::new(settings),
            queue_tx,
            cancel_token.clone(),
        )));
        self.cancel_token = Some(cancel_token);

        info!("Sampling started");
        Ok(())
    }

    /// Cancel both tasks and hand the ingestor back.
    pub async fn stop_sampling(&mut self) -> Result<Option<Ingestor>> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.capture.take() {
            handle.await.context("capture loop task failed to join")?;
        }

        match self.ingest.take() {
            Some(handle) => {
                let ingestor = handle.await.context("ingest worker task failed to join")?;
                info!("Sampling stopped");
                Ok(Some(ingestor))
            }
            None => Ok(None),
        }
    }
}
