//! Outbound summarization requests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use uuid::Uuid;

use paperhub_core::error::AppError;
use paperhub_core::result::AppResult;
use paperhub_entity::summary::SummaryStyle;

/// One summarization request bound for the AI worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRequest {
    /// Job tracking the attempt.
    pub job_id: Uuid,
    /// File to summarize.
    pub file_id: Uuid,
    /// Object key the worker fetches the document from.
    pub storage_path: String,
    /// Requested style.
    pub style: SummaryStyle,
    /// Extra instructions.
    pub custom_instructions: Option<String>,
    /// Summary language.
    pub language: String,
    /// Where the worker reports the result.
    pub callback_url: Option<String>,
}

/// Hands summarization requests to whatever talks to the AI worker.
///
/// `dispatch` must not wait for the summary itself; it only has to accept
/// the request or report that it could not.
#[async_trait]
pub trait SummaryDispatcher: Send + Sync + std::fmt::Debug {
    /// Accept a request for asynchronous delivery.
    async fn dispatch(&self, request: SummaryRequest) -> AppResult<()>;
}

/// Dispatcher feeding a bounded in-process queue drained by the dispatch
/// worker.
#[derive(Debug, Clone)]
pub struct ChannelDispatcher {
    tx: mpsc::Sender<SummaryRequest>,
}

impl ChannelDispatcher {
    /// A dispatcher and the receiving end of its queue.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<SummaryRequest>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Free slots left in the queue.
    pub fn remaining_capacity(&self) -> usize {
        self.tx.capacity()
    }
}

#[async_trait]
impl SummaryDispatcher for ChannelDispatcher {
    async fn dispatch(&self, request: SummaryRequest) -> AppResult<()> {
        self.tx.try_send(request).map_err(|e| match e {
            TrySendError::Full(_) => AppError::upstream("Summary queue is full"),
            TrySendError::Closed(_) => AppError::upstream("Summary dispatcher is not running"),
        })
    }
}
