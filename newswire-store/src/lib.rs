//! Persistence and orchestration services for the newswire pipeline
//!
//! - `store`: deduplicated hash-keyed persistence, one table per source
//! - `backfill`: the day-by-day historical ingestion orchestrator
//! - `summarizer`: the language-model handoff seam

pub mod backfill;
pub mod store;
pub mod summarizer;

pub use backfill::{Backfill, BackfillConfig, BackfillError, BackfillReport};
pub use store::{ContentStore, StoreError};
pub use summarizer::{Summarizer, SummarizerError};
