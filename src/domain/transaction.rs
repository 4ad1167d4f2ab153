//! Transaction domain entity.
//! Storage-agnostic representation of a bitcoin purchase or sale.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Tag for a purchase.
pub const TYPE_BUY: i8 = 1;
/// Tag for a sale.
pub const TYPE_SELL: i8 = 2;

/// Domain entity representing a recorded transaction.
///
/// `id`, `created_at` and `version` are owned by the store: they are
/// assigned on insert and `version` is bumped by every successful update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub amount_btc: f64,
    pub price_per_btc: i64,
    pub transaction_type: i8,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub note: String,
    pub version: i32,
}

impl Transaction {
    /// Builds an unsaved candidate. Store-owned fields are left at their
    /// zero values until `insert` fills them in.
    pub fn new(amount_btc: f64, price_per_btc: i64, transaction_type: i8, note: String) -> Self {
        Self {
            id: 0,
            created_at: DateTime::<Utc>::default(),
            amount_btc,
            price_per_btc,
            transaction_type,
            note,
            version: 0,
        }
    }
}
