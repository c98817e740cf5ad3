//! Watchlist Entries
//!
//! Persisted watchlist rows and the list operations applied to them
//! (ordering, insertion order numbers, moves).

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::instrument::Instrument;

/// One row of the persisted watchlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchEntry {
    /// Unique entry id.
    pub id: String,
    /// Instrument identifier (`BASE/QUOTE`).
    pub pair_string: String,
    /// Whether the entry is polled.
    #[serde(default = "default_active")]
    pub is_active: bool,
    /// Display position; unique, not necessarily contiguous.
    pub order: i64,
    /// When the entry was created.
    pub date_added: DateTime<Utc>,
}

const fn default_active() -> bool {
    true
}

impl WatchEntry {
    /// Create an active entry for an instrument.
    #[must_use]
    pub fn new(instrument: Instrument, order: i64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            pair_string: instrument.as_str().to_string(),
            is_active: true,
            order,
            date_added: Utc::now(),
        }
    }

    /// Resolve the pair string. Unknown pairs resolve to `None`.
    #[must_use]
    pub fn instrument(&self) -> Option<Instrument> {
        self.pair_string.parse().ok()
    }
}

/// Sort entries by display order.
pub fn sort_by_order(entries: &mut [WatchEntry]) {
    entries.sort_by_key(|e| e.order);
}

/// Order number for the next appended entry.
#[must_use]
pub fn next_order(entries: &[WatchEntry]) -> i64 {
    entries.iter().map(|e| e.order).max().map_or(0, |max| max + 1)
}

/// Instruments of active entries with a known pair, in list order.
#[must_use]
pub fn active_instruments(entries: &[WatchEntry]) -> Vec<Instrument> {
    entries
        .iter()
        .filter(|e| e.is_active)
        .filter_map(WatchEntry::instrument)
        .collect()
}

/// Move the items at `offsets` so they sit before the item originally at
/// `destination`, preserving their relative order.
///
/// Offsets past the end are ignored; a destination past the end appends.
pub fn move_offsets<T>(items: &mut Vec<T>, offsets: &BTreeSet<usize>, destination: usize) {
    let len = items.len();
    let destination = destination.min(len);
    let moved_before = offsets.iter().filter(|&&o| o < destination).count();

    let mut moved = Vec::with_capacity(offsets.len());
    let mut kept = Vec::with_capacity(len);
    for (index, item) in items.drain(..).enumerate() {
        if offsets.contains(&index) {
            moved.push(item);
        } else {
            kept.push(item);
        }
    }

    let insert_at = (destination - moved_before).min(kept.len());
    kept.splice(insert_at..insert_at, moved);
    *items = kept;
}

/// Rewrite `order` to each entry's list position.
pub fn renumber(entries: &mut [WatchEntry]) {
    for (index, entry) in entries.iter_mut().enumerate() {
        entry.order = i64::try_from(index).unwrap_or(i64::MAX);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(offsets: &[usize]) -> BTreeSet<usize> {
        offsets.iter().copied().collect()
    }

    #[test]
    fn new_entry_is_active_with_pair_string() {
        let entry = WatchEntry::new(Instrument::EurUsd, 3);
        assert!(entry.is_active);
        assert_eq!(entry.pair_string, "EUR/USD");
        assert_eq!(entry.order, 3);
        assert_eq!(entry.instrument(), Some(Instrument::EurUsd));
        assert!(Uuid::parse_str(&entry.id).is_ok());
    }

    #[test]
    fn unknown_pair_string_resolves_to_none() {
        let mut entry = WatchEntry::new(Instrument::EurUsd, 0);
        entry.pair_string = "XAU/USD".to_string();
        assert_eq!(entry.instrument(), None);
    }

    #[test]
    fn next_order_on_empty_is_zero() {
        assert_eq!(next_order(&[]), 0);
    }

    #[test]
    fn next_order_follows_maximum_not_length() {
        let entries = vec![
            WatchEntry::new(Instrument::UsdJpy, 0),
            WatchEntry::new(Instrument::EurUsd, 7),
        ];
        assert_eq!(next_order(&entries), 8);
    }

    #[test]
    fn sort_uses_order_field() {
        let mut entries = vec![
            WatchEntry::new(Instrument::UsdJpy, 5),
            WatchEntry::new(Instrument::EurUsd, 1),
        ];
        sort_by_order(&mut entries);
        assert_eq!(entries[0].instrument(), Some(Instrument::EurUsd));
    }

    #[test]
    fn active_instruments_skip_inactive_and_unknown() {
        let mut inactive = WatchEntry::new(Instrument::GbpUsd, 1);
        inactive.is_active = false;
        let mut unknown = WatchEntry::new(Instrument::UsdCad, 2);
        unknown.pair_string = "bogus".to_string();
        let entries = vec![WatchEntry::new(Instrument::UsdJpy, 0), inactive, unknown];

        assert_eq!(active_instruments(&entries), vec![Instrument::UsdJpy]);
    }

    #[test]
    fn move_first_to_end() {
        let mut items = vec!['a', 'b', 'c'];
        move_offsets(&mut items, &set(&[0]), 3);
        assert_eq!(items, vec!['b', 'c', 'a']);
    }

    #[test]
    fn move_last_to_front() {
        let mut items = vec!['a', 'b', 'c'];
        move_offsets(&mut items, &set(&[2]), 0);
        assert_eq!(items, vec!['c', 'a', 'b']);
    }

    #[test]
    fn move_multiple_keeps_relative_order() {
        let mut items = vec!['a', 'b', 'c', 'd', 'e'];
        move_offsets(&mut items, &set(&[0, 2]), 4);
        assert_eq!(items, vec!['b', 'd', 'a', 'c', 'e']);
    }

    #[test]
    fn move_onto_itself_is_noop() {
        let mut items = vec!['a', 'b', 'c'];
        move_offsets(&mut items, &set(&[1]), 1);
        assert_eq!(items, vec!['a', 'b', 'c']);
        move_offsets(&mut items, &set(&[1]), 2);
        assert_eq!(items, vec!['a', 'b', 'c']);
    }

    #[test]
    fn renumber_assigns_positions() {
        let mut entries = vec![
            WatchEntry::new(Instrument::UsdJpy, 10),
            WatchEntry::new(Instrument::EurUsd, 20),
        ];
        renumber(&mut entries);
        assert_eq!(entries[0].order, 0);
        assert_eq!(entries[1].order, 1);
    }

    #[test]
    fn serializes_with_camel_case_fields() {
        let entry = WatchEntry::new(Instrument::UsdJpy, 0);
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["pairString"], "USD/JPY");
        assert_eq!(json["isActive"], true);
        assert!(json.get("dateAdded").is_some());
    }

    #[test]
    fn missing_active_flag_defaults_to_true() {
        let json = r#"{"id":"x","pairString":"EUR/USD","order":0,"dateAdded":"2025-09-13T03:00:00Z"}"#;
        let entry: WatchEntry = serde_json::from_str(json).unwrap();
        assert!(entry.is_active);
    }
}
