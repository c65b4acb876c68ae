//! Date-bucket extraction over a descending feed

use chrono::{NaiveDate, NaiveTime};
use newswire_core::FeedItem;
use tracing::debug;

use crate::cursor::{ChannelCursor, PAGE_SIZE};
use crate::error::FeedError;

/// Collect every feed item whose UTC day equals `day`, in feed order.
///
/// The feed is newest-first, so the first item strictly older than the start
/// of the target day proves nothing further can match. That stop, together
/// with the cursor's end-of-history flag, bounds the walk even when the
/// target day predates all available history. Pages are scanned at disjoint
/// offsets, so an item is never collected twice.
pub async fn collect_for_date(
    cursor: &mut ChannelCursor,
    day: NaiveDate,
) -> Result<Vec<FeedItem>, FeedError> {
    let day_start = day.and_time(NaiveTime::MIN).and_utc();
    let mut collected = Vec::new();
    let mut offset = 0;

    loop {
        let page = cursor.fetch_page(PAGE_SIZE, offset).await?;
        if page.is_empty() {
            break;
        }

        let mut past_date = false;
        for item in &page {
            if item.day() == day {
                collected.push(item.clone());
            } else if item.date < day_start {
                // everything after this item is older still
                past_date = true;
                break;
            }
        }
        if past_date {
            break;
        }
        // page tail already precedes the target day
        if page.last().map(|item| item.date < day_start).unwrap_or(true) {
            break;
        }
        if cursor.end_of_history() {
            break;
        }
        offset += PAGE_SIZE;
    }

    debug!(
        channel = %cursor.channel(),
        %day,
        items = collected.len(),
        pages = offset / PAGE_SIZE + 1,
        "date extraction finished"
    );
    Ok(collected)
}
