//! Summarization orchestration: generate, callbacks, lookups and the
//! dispatcher seam towards the AI worker.

pub mod dispatch;
pub mod service;

pub use dispatch::{ChannelDispatcher, SummaryDispatcher, SummaryRequest};
pub use service::{
    CallbackOutcome, GenerateSummaryRequest, GenerateSummaryResponse, SummaryCallback,
    SummaryService, SummaryStatus, SummaryView,
};
