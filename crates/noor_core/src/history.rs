//! crates/noor_core/src/history.rs
//!
//! Reading-history policy shared by every account store.

use crate::domain::HistoryItem;

/// Maximum number of entries kept per user.
pub const HISTORY_CAP: usize = 20;

/// Puts `item` at the front of `history`, dropping any older entry for the same
/// chapter and evicting from the tail past [`HISTORY_CAP`].
pub fn push_entry(history: &mut Vec<HistoryItem>, item: HistoryItem) {
    history.retain(|h| h.surah_number != item.surah_number);
    history.insert(0, item);
    history.truncate(HISTORY_CAP);
}
