//! Advisory collection statistics
//!
//! Extracted from the collection's own schema by the stats collaborator.
//! Stored alongside each snapshot for display; correctness decisions never
//! depend on them.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckStats {
    pub deck_id: i64,
    pub deck_name: String,
    pub card_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionStats {
    pub total_cards: i64,
    pub total_decks: i64,
    pub total_notes: i64,
    pub total_revlog: i64,
    pub deck_stats: Vec<DeckStats>,
}
