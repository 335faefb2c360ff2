//! Summary domain entities.

pub mod model;
pub mod style;

pub use model::{NewSummary, Summary, SummaryHistoryItem};
pub use style::{StyleInfo, SummaryStyle};
