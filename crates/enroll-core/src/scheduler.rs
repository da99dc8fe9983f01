//! The serving order.
//!
//! Items are served by priority rank (see [`crate::queue::PRIORITY_RANKS`]),
//! then by creation time, then by id. The id tiebreak makes the order total
//! even when two items share a timestamp.

use std::cmp::Ordering;

use crate::queue::{QueueEntry, QueueItem, QueueStatus};

/// Comparator for the serving order.
pub fn serving_order(a: &QueueItem, b: &QueueItem) -> Ordering {
  a.priority
    .rank()
    .cmp(&b.priority.rank())
    .then_with(|| a.created_at.cmp(&b.created_at))
    .then_with(|| a.id.cmp(&b.id))
}

/// The waiting item that should be served next, if any.
pub fn next_to_serve<'a, I>(items: I) -> Option<&'a QueueItem>
where
  I: IntoIterator<Item = &'a QueueItem>,
{
  items
    .into_iter()
    .filter(|item| item.status == QueueStatus::Waiting)
    .min_by(|a, b| serving_order(a, b))
}

/// Sort enriched entries into serving order in place.
pub fn sort_for_service(entries: &mut [QueueEntry]) {
  entries.sort_by(|a, b| serving_order(&a.item, &b.item));
}
