//! Dispatch pool: drains the summary queue into the AI worker.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{Semaphore, broadcast, mpsc, watch};
use tracing::{error, info, warn};
use uuid::Uuid;

use paperhub_core::config::worker::WorkerConfig;
use paperhub_service::SummaryRequest;
use paperhub_service::summary::{SummaryCallback, SummaryService};

use crate::ai_client::{AiClient, DeliveryError};

/// Final result of one dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchOutcome {
    /// Job the request belonged to.
    pub job_id: Uuid,
    /// File being summarized.
    pub file_id: Uuid,
    /// Attempts made.
    pub attempts: u32,
    /// Error of the last attempt, `None` when accepted.
    pub error: Option<String>,
}

impl DispatchOutcome {
    /// Whether the AI worker accepted the request.
    pub fn accepted(&self) -> bool {
        self.error.is_none()
    }
}

/// Delivers queued summary requests with bounded concurrency and retries.
///
/// A request that cannot be delivered is reported back through the
/// summary service's error path, so its file ends `failed` instead of
/// staying `processing`.
pub struct DispatchWorker {
    /// Incoming requests.
    rx: mpsc::Receiver<SummaryRequest>,
    /// AI worker client.
    client: Arc<dyn AiClient>,
    /// Applies failure results.
    summaries: SummaryService,
    /// Pool settings.
    config: WorkerConfig,
    /// Outcome fan-out.
    outcomes: broadcast::Sender<DispatchOutcome>,
}

impl std::fmt::Debug for DispatchWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchWorker")
            .field("concurrency", &self.config.concurrency)
            .field("max_attempts", &self.config.max_attempts)
            .finish()
    }
}

impl DispatchWorker {
    /// Create a dispatch worker reading from `rx`.
    pub fn new(
        rx: mpsc::Receiver<SummaryRequest>,
        client: Arc<dyn AiClient>,
        summaries: SummaryService,
        config: WorkerConfig,
    ) -> Self {
        let (outcomes, _) = broadcast::channel(config.queue_capacity.max(16));
        Self {
            rx,
            client,
            summaries,
            config,
            outcomes,
        }
    }

    /// Receive the outcome of every dispatch finished after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<DispatchOutcome> {
        self.outcomes.subscribe()
    }

    /// Run until the cancel signal fires or every sender is gone, then wait
    /// for in-flight deliveries.
    pub async fn run(mut self, mut cancel: watch::Receiver<bool>) {
        let concurrency = self.config.concurrency.max(1);
        let semaphore = Arc::new(Semaphore::new(concurrency));
        info!(
            concurrency,
            max_attempts = self.config.max_attempts,
            "Dispatch worker started"
        );

        loop {
            let request = tokio::select! {
                changed = cancel.changed() => {
                    if changed.is_err() || *cancel.borrow() {
                        info!("Dispatch worker received shutdown signal");
                        break;
                    }
                    continue;
                }
                next = self.rx.recv() => match next {
                    Some(request) => request,
                    None => {
                        info!("Summary queue closed");
                        break;
                    }
                },
            };

            let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                break;
            };

            let client = Arc::clone(&self.client);
            let summaries = self.summaries.clone();
            let outcomes = self.outcomes.clone();
            let max_attempts = self.config.max_attempts.max(1);
            let backoff = Duration::from_millis(self.config.retry_backoff_ms);

            tokio::spawn(async move {
                let _permit = permit;
                let outcome =
                    deliver(client.as_ref(), &summaries, &request, max_attempts, backoff).await;
                // No subscribers is fine.
                let _ = outcomes.send(outcome);
            });
        }

        info!("Dispatch worker waiting for in-flight deliveries");
        let _ = tokio::time::timeout(
            Duration::from_secs(30),
            semaphore.acquire_many(concurrency as u32),
        )
        .await;
        info!("Dispatch worker stopped");
    }
}

/// Deliver one request, retrying transient failures with linear backoff.
async fn deliver(
    client: &dyn AiClient,
    summaries: &SummaryService,
    request: &SummaryRequest,
    max_attempts: u32,
    backoff: Duration,
) -> DispatchOutcome {
    let mut attempt = 0;
    let failure = loop {
        attempt += 1;
        match client.summarize(request).await {
            Ok(()) => {
                info!(
                    job_id = %request.job_id,
                    file_id = %request.file_id,
                    attempt,
                    "Summary request accepted by AI worker"
                );
                return DispatchOutcome {
                    job_id: request.job_id,
                    file_id: request.file_id,
                    attempts: attempt,
                    error: None,
                };
            }
            Err(e @ DeliveryError::Transient(_)) if attempt < max_attempts => {
                warn!(
                    job_id = %request.job_id,
                    attempt,
                    max_attempts,
                    error = %e,
                    "Summary dispatch failed, retrying"
                );
                tokio::time::sleep(backoff * attempt).await;
            }
            Err(e) => break e,
        }
    };

    error!(
        job_id = %request.job_id,
        file_id = %request.file_id,
        attempts = attempt,
        error = %failure,
        "Summary dispatch gave up"
    );

    let message = format!("Summary service unavailable: {}", failure.reason());
    let callback = SummaryCallback::failed(request.file_id, request.job_id, message.clone());
    if let Err(e) = summaries.process_callback(callback).await {
        error!(job_id = %request.job_id, error = %e, "Failed to record dispatch failure");
    }

    DispatchOutcome {
        job_id: request.job_id,
        file_id: request.file_id,
        attempts: attempt,
        error: Some(message),
    }
}
