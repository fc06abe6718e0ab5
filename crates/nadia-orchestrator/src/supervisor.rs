use std::sync::Arc;

use nadia_tracker::FlushedBatch;
use tokio::sync::{mpsc, watch};
use tracing::{error, info};

use crate::pipeline::Pipeline;

/// Consumes flushed batches from the activity tracker and drives each one
/// through the [`Pipeline`], mirroring the reference scheduler engine's
/// `tokio::select!` run loop shape.
pub struct Supervisor {
    pipeline: Arc<Pipeline>,
    dispatch_rx: mpsc::Receiver<FlushedBatch>,
}

impl Supervisor {
    pub fn new(pipeline: Arc<Pipeline>, dispatch_rx: mpsc::Receiver<FlushedBatch>) -> Self {
        Self { pipeline, dispatch_rx }
    }

    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!("orchestrator supervisor started");
        loop {
            tokio::select! {
                batch = self.dispatch_rx.recv() => {
                    match batch {
                        Some(batch) => {
                            let pipeline = Arc::clone(&self.pipeline);
                            tokio::spawn(async move {
                                if let Err(e) = pipeline.ingest(batch).await {
                                    error!(error = %e, "pipeline ingest failed");
                                }
                            });
                        }
                        None => {
                            info!("dispatch channel closed, supervisor exiting");
                            break;
                        }
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("orchestrator supervisor shutting down");
                        break;
                    }
                }
            }
        }
    }
}
