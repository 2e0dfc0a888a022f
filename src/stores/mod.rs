//! Contains the ledger store trait and its SQLite implementation.

mod sqlite;

pub use sqlite::SQLiteExpenseStore;

use serde::Serialize;
use time::OffsetDateTime;

use crate::{
    Error,
    model::{ExpenseEntry, ExpenseId, ExpenseUpdate, NewExpense},
};

/// A category label together with the amount summed against it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    /// The category label.
    pub category: String,
    /// The summed amount for the category.
    pub total: f64,
}

/// A member display name together with the amount they recorded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserTotal {
    /// The member's display name.
    pub display_name: String,
    /// The summed amount the member recorded.
    pub total: f64,
}

/// One (member, category) cell of the spending matrix.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserCategoryTotal {
    /// The member's display name.
    pub display_name: String,
    /// The category label.
    pub category: String,
    /// The summed amount the member recorded against the category.
    pub total: f64,
}

/// Handles the persistence and aggregate querying of expense entries.
///
/// Implementations must serialize mutating calls so that aggregate reads
/// never observe a partially-applied write, and must keep entries across
/// process restarts.
///
/// All aggregate queries accept an optional inclusive lower bound on
/// `recorded_at`; `None` means all time. Ties in the sum-ordered results
/// are broken by label ascending so the output is deterministic.
pub trait ExpenseStore {
    /// Persist a new entry, stamping it with the current time, and return
    /// the stored entry with its freshly assigned id.
    fn insert(&mut self, expense: NewExpense) -> Result<ExpenseEntry, Error>;

    /// Physically remove the entry with `id`. Returns whether a row was
    /// actually removed; deleting an absent id is not an error.
    fn delete(&mut self, id: ExpenseId) -> Result<bool, Error>;

    /// Apply a partial update to the entry with `id`. Returns `false` when
    /// the id does not exist or the update carries no fields.
    fn update(&mut self, id: ExpenseId, update: ExpenseUpdate) -> Result<bool, Error>;

    /// Look up a single entry by id.
    fn get(&self, id: ExpenseId) -> Result<Option<ExpenseEntry>, Error>;

    /// The most recently recorded entries, newest first, at most `limit`.
    fn recent(&self, limit: u32) -> Result<Vec<ExpenseEntry>, Error>;

    /// The sum of all amounts recorded at or after `since`. Zero when no
    /// entries match.
    fn total(&self, since: Option<OffsetDateTime>) -> Result<f64, Error>;

    /// Per-category sums, descending by sum.
    fn total_by_category(&self, since: Option<OffsetDateTime>)
    -> Result<Vec<CategoryTotal>, Error>;

    /// Per-member sums, descending by sum.
    fn total_by_user(&self, since: Option<OffsetDateTime>) -> Result<Vec<UserTotal>, Error>;

    /// Per-member, per-category sums, ordered by display name then
    /// category ascending.
    fn total_by_user_and_category(
        &self,
        since: Option<OffsetDateTime>,
    ) -> Result<Vec<UserCategoryTotal>, Error>;
}
