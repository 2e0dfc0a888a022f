//! Core domain types for the expense ledger.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Database identifier for an expense entry.
///
/// Ids are assigned monotonically by the store and are never reused, even
/// after the entry they identified has been deleted.
pub type ExpenseId = i64;

/// Opaque, stable identifier of a ledger member (e.g. a chat user id).
pub type UserId = i64;

/// One recorded expense.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseEntry {
    /// Unique id assigned by the store.
    pub id: ExpenseId,
    /// The member who recorded the expense.
    pub user_id: UserId,
    /// The member's name at the time of recording.
    ///
    /// Not re-resolved later: historical entries keep the name as entered.
    pub display_name: String,
    /// Positive amount in the ledger's single implicit currency.
    pub amount: f64,
    /// The classifier label assigned at insert time, stored denormalised
    /// and never recomputed on read.
    pub category: String,
    /// The note as typed by the user, unmodified.
    pub description: String,
    /// Insertion timestamp (UTC). The sort and filter key for every
    /// time-windowed query.
    pub recorded_at: OffsetDateTime,
}

/// The fields required to create an expense entry.
///
/// The store assigns `id` and `recorded_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewExpense {
    /// The member recording the expense.
    pub user_id: UserId,
    /// The member's name at the time of recording.
    pub display_name: String,
    /// Positive amount to record.
    pub amount: f64,
    /// The category label assigned by the classifier.
    pub category: String,
    /// The free-text note for the expense.
    pub description: String,
}

/// A partial update to an expense entry.
///
/// Fields left as `None` are not touched. `id` and `recorded_at` can never
/// change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpenseUpdate {
    /// Replacement amount, if any.
    pub amount: Option<f64>,
    /// Replacement category label, if any.
    pub category: Option<String>,
    /// Replacement description, if any.
    pub description: Option<String>,
}

impl ExpenseUpdate {
    /// Whether applying the update would change nothing.
    pub fn is_empty(&self) -> bool {
        self.amount.is_none() && self.category.is_none() && self.description.is_none()
    }
}
