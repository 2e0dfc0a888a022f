//! Implements a SQLite backed expense store.

use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{Connection, Row, params_from_iter, types::Value};
use time::OffsetDateTime;

use crate::{
    Error,
    db::{CreateTable, MapRow},
    model::{ExpenseEntry, ExpenseId, ExpenseUpdate, NewExpense},
    stores::{CategoryTotal, ExpenseStore, UserCategoryTotal, UserTotal},
};

/// Stores expense entries in a SQLite database.
///
/// The connection is shared behind a mutex, so each mutating call runs as
/// its own serialized statement and aggregate reads always see a complete
/// ledger. Timestamps are written in UTC, which keeps the TEXT column in
/// chronological collation order.
#[derive(Debug, Clone)]
pub struct SQLiteExpenseStore {
    connection: Arc<Mutex<Connection>>,
}

impl SQLiteExpenseStore {
    /// Create a new store for the SQLite `connection`.
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self { connection }
    }

    fn connection(&self) -> Result<MutexGuard<'_, Connection>, Error> {
        self.connection.lock().map_err(|_| Error::DatabaseLockError)
    }
}

impl ExpenseStore for SQLiteExpenseStore {
    /// Create a new entry in the database, stamped with the current UTC
    /// time.
    ///
    /// # Errors
    /// This function will return an [Error::SqlError] if there is an SQL
    /// error.
    fn insert(&mut self, expense: NewExpense) -> Result<ExpenseEntry, Error> {
        let recorded_at = OffsetDateTime::now_utc();

        let entry = self
            .connection()?
            .prepare(
                "INSERT INTO expense (user_id, display_name, amount, category, description, recorded_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 RETURNING id, user_id, display_name, amount, category, description, recorded_at",
            )?
            .query_row(
                (
                    expense.user_id,
                    expense.display_name,
                    expense.amount,
                    expense.category,
                    expense.description,
                    recorded_at,
                ),
                Self::map_row,
            )?;

        Ok(entry)
    }

    /// Remove the entry with `id`.
    ///
    /// Deleting an id that is not in the database returns `Ok(false)`, so a
    /// caller may safely retry.
    fn delete(&mut self, id: ExpenseId) -> Result<bool, Error> {
        let rows_deleted = self
            .connection()?
            .execute("DELETE FROM expense WHERE id = ?1", [id])?;

        Ok(rows_deleted > 0)
    }

    /// Overwrite the supplied fields of the entry with `id`, leaving the
    /// rest (including `recorded_at`) untouched.
    fn update(&mut self, id: ExpenseId, update: ExpenseUpdate) -> Result<bool, Error> {
        let mut set_clauses = vec![];
        let mut parameters: Vec<Value> = vec![];

        if let Some(amount) = update.amount {
            set_clauses.push(format!("amount = ?{}", parameters.len() + 1));
            parameters.push(Value::Real(amount));
        }

        if let Some(category) = update.category {
            set_clauses.push(format!("category = ?{}", parameters.len() + 1));
            parameters.push(Value::Text(category));
        }

        if let Some(description) = update.description {
            set_clauses.push(format!("description = ?{}", parameters.len() + 1));
            parameters.push(Value::Text(description));
        }

        if set_clauses.is_empty() {
            return Ok(false);
        }

        parameters.push(Value::Integer(id));
        let statement = format!(
            "UPDATE expense SET {} WHERE id = ?{}",
            set_clauses.join(", "),
            parameters.len()
        );

        let rows_updated = self
            .connection()?
            .execute(&statement, params_from_iter(parameters.iter()))?;

        Ok(rows_updated > 0)
    }

    /// Retrieve an entry in the database by its `id`.
    fn get(&self, id: ExpenseId) -> Result<Option<ExpenseEntry>, Error> {
        let result = self
            .connection()?
            .prepare(
                "SELECT id, user_id, display_name, amount, category, description, recorded_at
                 FROM expense WHERE id = :id",
            )?
            .query_row(&[(":id", &id)], Self::map_row);

        match result {
            Ok(entry) => Ok(Some(entry)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(error) => Err(error.into()),
        }
    }

    /// The most recently recorded entries, newest first.
    ///
    /// Entries that share a timestamp are returned in reverse insertion
    /// order.
    fn recent(&self, limit: u32) -> Result<Vec<ExpenseEntry>, Error> {
        self.connection()?
            .prepare(
                "SELECT id, user_id, display_name, amount, category, description, recorded_at
                 FROM expense
                 ORDER BY recorded_at DESC, id DESC
                 LIMIT :limit",
            )?
            .query_map(&[(":limit", &limit)], Self::map_row)?
            .map(|maybe_entry| maybe_entry.map_err(Error::from))
            .collect()
    }

    /// The sum of all amounts recorded at or after `since`.
    ///
    /// Returns zero rather than an error when no entries match.
    fn total(&self, since: Option<OffsetDateTime>) -> Result<f64, Error> {
        let connection = self.connection()?;

        let total = match since {
            Some(since) => connection.query_row(
                "SELECT COALESCE(SUM(amount), 0.0) FROM expense WHERE recorded_at >= ?1",
                [since],
                |row| row.get(0),
            )?,
            None => connection.query_row(
                "SELECT COALESCE(SUM(amount), 0.0) FROM expense",
                [],
                |row| row.get(0),
            )?,
        };

        Ok(total)
    }

    /// Per-category sums, descending by sum with ties broken by category
    /// label ascending.
    fn total_by_category(
        &self,
        since: Option<OffsetDateTime>,
    ) -> Result<Vec<CategoryTotal>, Error> {
        let mut statement = String::from("SELECT category, SUM(amount) FROM expense");
        if since.is_some() {
            statement.push_str(" WHERE recorded_at >= ?1");
        }
        statement.push_str(" GROUP BY category ORDER BY SUM(amount) DESC, category ASC");

        let connection = self.connection()?;
        let mut prepared = connection.prepare(&statement)?;
        let map_total = |row: &Row| {
            Ok(CategoryTotal {
                category: row.get(0)?,
                total: row.get(1)?,
            })
        };

        let totals = match since {
            Some(since) => prepared
                .query_map([since], map_total)?
                .collect::<Result<Vec<_>, _>>()?,
            None => prepared
                .query_map([], map_total)?
                .collect::<Result<Vec<_>, _>>()?,
        };

        Ok(totals)
    }

    /// Per-member sums, descending by sum with ties broken by display name
    /// ascending.
    fn total_by_user(&self, since: Option<OffsetDateTime>) -> Result<Vec<UserTotal>, Error> {
        let mut statement = String::from("SELECT display_name, SUM(amount) FROM expense");
        if since.is_some() {
            statement.push_str(" WHERE recorded_at >= ?1");
        }
        statement.push_str(" GROUP BY display_name ORDER BY SUM(amount) DESC, display_name ASC");

        let connection = self.connection()?;
        let mut prepared = connection.prepare(&statement)?;
        let map_total = |row: &Row| {
            Ok(UserTotal {
                display_name: row.get(0)?,
                total: row.get(1)?,
            })
        };

        let totals = match since {
            Some(since) => prepared
                .query_map([since], map_total)?
                .collect::<Result<Vec<_>, _>>()?,
            None => prepared
                .query_map([], map_total)?
                .collect::<Result<Vec<_>, _>>()?,
        };

        Ok(totals)
    }

    /// The member/category spending matrix, ordered by display name then
    /// category ascending.
    fn total_by_user_and_category(
        &self,
        since: Option<OffsetDateTime>,
    ) -> Result<Vec<UserCategoryTotal>, Error> {
        let mut statement = String::from("SELECT display_name, category, SUM(amount) FROM expense");
        if since.is_some() {
            statement.push_str(" WHERE recorded_at >= ?1");
        }
        statement
            .push_str(" GROUP BY display_name, category ORDER BY display_name ASC, category ASC");

        let connection = self.connection()?;
        let mut prepared = connection.prepare(&statement)?;
        let map_total = |row: &Row| {
            Ok(UserCategoryTotal {
                display_name: row.get(0)?,
                category: row.get(1)?,
                total: row.get(2)?,
            })
        };

        let totals = match since {
            Some(since) => prepared
                .query_map([since], map_total)?
                .collect::<Result<Vec<_>, _>>()?,
            None => prepared
                .query_map([], map_total)?
                .collect::<Result<Vec<_>, _>>()?,
        };

        Ok(totals)
    }
}

impl CreateTable for SQLiteExpenseStore {
    fn create_table(connection: &Connection) -> Result<(), rusqlite::Error> {
        connection.execute(
            "CREATE TABLE IF NOT EXISTS expense (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_id INTEGER NOT NULL,
                    display_name TEXT NOT NULL,
                    amount REAL NOT NULL,
                    category TEXT NOT NULL,
                    description TEXT NOT NULL,
                    recorded_at TEXT NOT NULL
                    )",
            (),
        )?;

        // Ensure the sequence starts at 1
        connection.execute(
            "INSERT OR IGNORE INTO sqlite_sequence (name, seq) VALUES ('expense', 0)",
            (),
        )?;

        Ok(())
    }
}

impl MapRow for SQLiteExpenseStore {
    type ReturnType = ExpenseEntry;

    fn map_row_with_offset(row: &Row, offset: usize) -> Result<Self::ReturnType, rusqlite::Error> {
        Ok(ExpenseEntry {
            id: row.get(offset)?,
            user_id: row.get(offset + 1)?,
            display_name: row.get(offset + 2)?,
            amount: row.get(offset + 3)?,
            category: row.get(offset + 4)?,
            description: row.get(offset + 5)?,
            recorded_at: row.get(offset + 6)?,
        })
    }
}
