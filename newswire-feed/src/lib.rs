//! Feed-side components of the newswire pipeline
//!
//! This crate presents a remote reverse-chronological message feed as a
//! cached, randomly-offsettable sequence, extracts all items for a target
//! calendar day, and parses raw bodies into structured records:
//! - `FeedProvider`: the abstract remote collaborator (Telegram behind the
//!   `telegram` feature, or an in-memory fixture)
//! - `ChannelCursor`: paginated history walk with an append-only cache
//! - `extractor`: date-bucket collection over the descending feed
//! - `format`: payload parsing policies (passthrough and structured wire
//!   reports)

pub mod cursor;
pub mod error;
pub mod extractor;
pub mod format;
pub mod provider;
pub mod source;
#[cfg(feature = "telegram")]
pub mod telegram;

pub use cursor::{ChannelCursor, PAGE_SIZE};
pub use error::FeedError;
pub use extractor::collect_for_date;
pub use format::{FormatStrategy, Passthrough, WireReport};
pub use provider::{FeedProvider, StaticProvider};
pub use source::ChannelSource;
#[cfg(feature = "telegram")]
pub use telegram::{TelegramConfig, TelegramFeed};
