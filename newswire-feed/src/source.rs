//! A channel bound to a parsing policy

use std::sync::Arc;

use chrono::NaiveDate;
use newswire_core::Record;

use crate::cursor::ChannelCursor;
use crate::error::FeedError;
use crate::extractor::collect_for_date;
use crate::format::FormatStrategy;
use crate::provider::FeedProvider;

/// One remote channel together with the format strategy that turns its raw
/// bodies into records.
pub struct ChannelSource {
    cursor: ChannelCursor,
    format: Arc<dyn FormatStrategy>,
}

impl ChannelSource {
    pub fn new(
        provider: Arc<dyn FeedProvider>,
        channel: impl Into<String>,
        format: Arc<dyn FormatStrategy>,
    ) -> Self {
        Self {
            cursor: ChannelCursor::new(provider, channel),
            format,
        }
    }

    /// Logical identity of the source; also names its storage table.
    pub fn name(&self) -> &str {
        self.cursor.channel()
    }

    /// All storable records for one UTC day, in feed order.
    ///
    /// Bodies the strategy cannot parse are dropped; the strategy's day
    /// finalizer decides whether records are stored per item or batched.
    pub async fn records_for_date(&mut self, day: NaiveDate) -> Result<Vec<Record>, FeedError> {
        let items = collect_for_date(&mut self.cursor, day).await?;
        let records: Vec<Record> = items
            .iter()
            .filter_map(|item| self.format.format(&item.body))
            .collect();
        Ok(self.format.finalize_day(records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{Passthrough, WireReport};
    use crate::provider::StaticProvider;
    use chrono::{TimeZone, Utc};
    use newswire_core::FeedItem;

    fn at(day: NaiveDate, hour: u32) -> i64 {
        Utc.from_utc_datetime(&day.and_hms_opt(hour, 0, 0).unwrap())
            .timestamp()
    }

    #[tokio::test]
    async fn test_passthrough_day_is_one_digest() {
        let day = NaiveDate::from_ymd_opt(2023, 12, 12).unwrap();
        let items = vec![
            FeedItem::from_unix(at(day, 12), "A"),
            FeedItem::from_unix(at(day, 9), ""),
            FeedItem::from_unix(at(day, 8), "B"),
        ];
        let provider = Arc::new(StaticProvider::new(items));
        let mut source = ChannelSource::new(provider, "wire", Arc::new(Passthrough));

        let records = source.records_for_date(day).await.unwrap();
        assert_eq!(
            records,
            vec![Record::digest(vec!["A".to_string(), "B".to_string()])]
        );
    }

    #[tokio::test]
    async fn test_unparseable_bodies_are_dropped() {
        let day = NaiveDate::from_ymd_opt(2023, 12, 12).unwrap();
        let wire = "DTG: x\n-----\n-Daily Events-\nSomething happened.\n";
        let items = vec![
            FeedItem::from_unix(at(day, 12), wire),
            FeedItem::from_unix(at(day, 8), "not a wire report"),
        ];
        let provider = Arc::new(StaticProvider::new(items));
        let mut source = ChannelSource::new(provider, "wire", Arc::new(WireReport));

        let records = source.records_for_date(day).await.unwrap();
        assert_eq!(records.len(), 1);
        assert!(matches!(records[0], Record::Report(_)));
    }
}
