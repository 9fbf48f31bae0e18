//! Claude-backed rollup summaries and their cache.

pub mod cache;
pub mod claude;
pub mod prompt;

pub use cache::{CachedSummarizer, SummaryCache};
pub use claude::ClaudeClient;
