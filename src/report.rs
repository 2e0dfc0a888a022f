//! Composes store aggregates into the user-facing totals and balance
//! reports.
//!
//! Every entry point (direct command, button shortcut, anything a transport
//! adds later) goes through these two functions, so there is exactly one
//! implementation of each report.

use std::collections::BTreeMap;

use serde::Serialize;
use time::OffsetDateTime;

use crate::{
    Error,
    classifier::CategoryClassifier,
    period::Period,
    stores::{CategoryTotal, ExpenseStore},
};

/// Totals closer together than this are reported as settled. Absorbs the
/// rounding that creeps in when odd totals are split in half.
pub const SETTLED_THRESHOLD: f64 = 1.0;

/// One labelled share of a report total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShareRow {
    /// The category label or member display name.
    pub label: String,
    /// The summed amount for this row.
    pub total: f64,
    /// This row's share of the report total, 0-100. Zero when the report
    /// total is zero.
    pub percent: f64,
}

/// Spending totals for one named period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TotalsReport {
    /// The period the report covers.
    pub period: Period,
    /// The resolved lower bound of the window; `None` means all time.
    pub since: Option<OffsetDateTime>,
    /// The sum over every entry in the window.
    pub total: f64,
    /// Per-category shares, descending by amount.
    pub by_category: Vec<ShareRow>,
    /// Per-member shares, descending by amount.
    pub by_user: Vec<ShareRow>,
}

/// One member's side of the balance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserBalance {
    /// The member's display name.
    pub display_name: String,
    /// Everything the member has recorded, all time.
    pub total: f64,
    /// The member's share of the combined total, 0-100.
    pub percent: f64,
}

/// Who owes whom, if anyone.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Settlement {
    /// The totals are within [SETTLED_THRESHOLD] of each other; nobody owes
    /// anything.
    Settled,
    /// `debtor` owes `creditor` `amount` to even out the ledger.
    Owes {
        /// The member who has spent less.
        debtor: String,
        /// The member who has spent more.
        creditor: String,
        /// Half the difference between the two totals.
        amount: f64,
    },
}

/// How the ledger stands between the two members, all time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalanceReport {
    /// The two members' shares, largest spender first.
    pub users: Vec<UserBalance>,
    /// The combined total of both members.
    pub total: f64,
    /// The amount each member would have spent under an even split.
    pub half: f64,
    /// All-time spending per category bucket, descending by amount. Labels
    /// the classifier does not know fold into the default bucket.
    pub by_category: Vec<CategoryTotal>,
    /// The computed settlement.
    pub settlement: Settlement,
}

/// The result of a balance query.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BalanceOutcome {
    /// Fewer than two members have recorded expenses, so there is nothing
    /// to settle yet.
    InsufficientData,
    /// A settlement could be computed.
    Balance(BalanceReport),
}

/// Build the totals report for `period`, resolved against `now`.
pub fn totals_report<S: ExpenseStore>(
    store: &S,
    period: Period,
    now: OffsetDateTime,
) -> Result<TotalsReport, Error> {
    let since = period.resolve(now);
    let total = store.total(since)?;

    let by_category = store
        .total_by_category(since)?
        .into_iter()
        .map(|row| ShareRow {
            percent: percent_of(row.total, total),
            label: row.category,
            total: row.total,
        })
        .collect();

    let by_user = store
        .total_by_user(since)?
        .into_iter()
        .map(|row| ShareRow {
            percent: percent_of(row.total, total),
            label: row.display_name,
            total: row.total,
        })
        .collect();

    Ok(TotalsReport {
        period,
        since,
        total,
        by_category,
        by_user,
    })
}

/// Build the all-time balance between the two members.
///
/// Balance is deliberately not period-scoped: settling up only makes sense
/// over the whole ledger.
pub fn balance_report<S: ExpenseStore>(
    store: &S,
    classifier: &CategoryClassifier,
) -> Result<BalanceOutcome, Error> {
    let cells = store.total_by_user_and_category(None)?;

    let mut user_totals: BTreeMap<String, f64> = BTreeMap::new();
    let mut bucket_totals: BTreeMap<String, f64> = BTreeMap::new();

    for cell in cells {
        let bucket = classifier.bucket(&cell.category).to_string();
        *bucket_totals.entry(bucket).or_insert(0.0) += cell.total;
        *user_totals.entry(cell.display_name).or_insert(0.0) += cell.total;
    }

    if user_totals.len() < 2 {
        return Ok(BalanceOutcome::InsufficientData);
    }

    let mut users: Vec<(String, f64)> = user_totals.into_iter().collect();
    users.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    // The registry caps membership at two, so anything beyond the two
    // largest spenders can only be stale data from before a rename.
    users.truncate(2);

    let total = users[0].1 + users[1].1;
    let half = total / 2.0;
    let difference = (users[0].1 - users[1].1).abs();

    let settlement = if difference > SETTLED_THRESHOLD {
        Settlement::Owes {
            debtor: users[1].0.clone(),
            creditor: users[0].0.clone(),
            amount: difference / 2.0,
        }
    } else {
        Settlement::Settled
    };

    let users = users
        .into_iter()
        .map(|(display_name, user_total)| UserBalance {
            percent: percent_of(user_total, total),
            display_name,
            total: user_total,
        })
        .collect();

    let mut by_category: Vec<CategoryTotal> = bucket_totals
        .into_iter()
        .map(|(category, category_total)| CategoryTotal {
            category,
            total: category_total,
        })
        .collect();
    by_category.sort_by(|a, b| {
        b.total
            .total_cmp(&a.total)
            .then_with(|| a.category.cmp(&b.category))
    });

    Ok(BalanceOutcome::Balance(BalanceReport {
        users,
        total,
        half,
        by_category,
        settlement,
    }))
}

fn percent_of(amount: f64, total: f64) -> f64 {
    if total > 0.0 { amount / total * 100.0 } else { 0.0 }
}

#[cfg(test)]
mod report_tests {
    use std::sync::{Arc, Mutex};

    use rusqlite::{Connection, params};
    use time::{OffsetDateTime, macros::datetime};

    use crate::{
        classifier::CategoryClassifier,
        db::initialize,
        model::NewExpense,
        period::Period,
        stores::{ExpenseStore, SQLiteExpenseStore},
    };

    use super::{BalanceOutcome, Settlement, balance_report, totals_report};

    fn init_store() -> (Arc<Mutex<Connection>>, SQLiteExpenseStore) {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();

        let connection = Arc::new(Mutex::new(connection));
        let store = SQLiteExpenseStore::new(connection.clone());

        (connection, store)
    }

    fn expense(user_id: i64, display_name: &str, amount: f64, category: &str) -> NewExpense {
        NewExpense {
            user_id,
            display_name: display_name.to_string(),
            amount,
            category: category.to_string(),
            description: category.to_lowercase(),
        }
    }

    #[test]
    fn totals_report_computes_percentages() {
        let (_connection, mut store) = init_store();
        store.insert(expense(1, "Ann", 75.0, "Food")).unwrap();
        store.insert(expense(2, "Ben", 25.0, "Transport")).unwrap();

        let report = totals_report(&store, Period::All, OffsetDateTime::now_utc()).unwrap();

        assert_eq!(report.total, 100.0);
        assert_eq!(report.since, None);

        assert_eq!(report.by_category[0].label, "Food");
        assert_eq!(report.by_category[0].percent, 75.0);
        assert_eq!(report.by_category[1].label, "Transport");
        assert_eq!(report.by_category[1].percent, 25.0);

        assert_eq!(report.by_user[0].label, "Ann");
        assert_eq!(report.by_user[0].percent, 75.0);
    }

    #[test]
    fn totals_report_on_empty_store_is_all_zero() {
        let (_connection, store) = init_store();

        let report = totals_report(&store, Period::All, OffsetDateTime::now_utc()).unwrap();

        assert_eq!(report.total, 0.0);
        assert!(report.by_category.is_empty());
        assert!(report.by_user.is_empty());
    }

    #[test]
    fn totals_report_excludes_entries_before_the_window() {
        let (connection, mut store) = init_store();

        let old = store.insert(expense(1, "Ann", 100.0, "Food")).unwrap();
        store.insert(expense(1, "Ann", 40.0, "Food")).unwrap();
        connection
            .lock()
            .unwrap()
            .execute(
                "UPDATE expense SET recorded_at = ?1 WHERE id = ?2",
                params![datetime!(2000-01-01 0:00 UTC), old.id],
            )
            .unwrap();

        let report = totals_report(&store, Period::Week, OffsetDateTime::now_utc()).unwrap();

        assert_eq!(report.total, 40.0);
        assert!(report.since.is_some());
    }

    #[test]
    fn balance_reports_who_owes_whom() {
        let (_connection, mut store) = init_store();
        store.insert(expense(1, "Ann", 200.0, "Food")).unwrap();
        store.insert(expense(1, "Ann", 100.0, "Home")).unwrap();
        store.insert(expense(2, "Ben", 100.0, "Food")).unwrap();

        let outcome = balance_report(&store, &CategoryClassifier::default()).unwrap();

        let BalanceOutcome::Balance(report) = outcome else {
            panic!("expected a balance, got {outcome:?}");
        };

        assert_eq!(report.total, 400.0);
        assert_eq!(report.half, 200.0);
        assert_eq!(report.users[0].display_name, "Ann");
        assert_eq!(report.users[0].total, 300.0);
        assert_eq!(report.users[0].percent, 75.0);
        assert_eq!(report.users[1].display_name, "Ben");
        assert_eq!(report.users[1].total, 100.0);
        assert_eq!(
            report.settlement,
            Settlement::Owes {
                debtor: "Ben".to_string(),
                creditor: "Ann".to_string(),
                amount: 100.0,
            }
        );
    }

    #[test]
    fn balance_within_threshold_is_settled() {
        let (_connection, mut store) = init_store();
        store.insert(expense(1, "Ann", 150.0, "Food")).unwrap();
        store.insert(expense(2, "Ben", 149.0, "Food")).unwrap();

        let outcome = balance_report(&store, &CategoryClassifier::default()).unwrap();

        let BalanceOutcome::Balance(report) = outcome else {
            panic!("expected a balance, got {outcome:?}");
        };

        assert_eq!(report.settlement, Settlement::Settled);
    }

    #[test]
    fn balance_needs_two_members() {
        let (_connection, mut store) = init_store();

        let empty = balance_report(&store, &CategoryClassifier::default()).unwrap();
        assert_eq!(empty, BalanceOutcome::InsufficientData);

        store.insert(expense(1, "Ann", 50.0, "Food")).unwrap();
        let single = balance_report(&store, &CategoryClassifier::default()).unwrap();
        assert_eq!(single, BalanceOutcome::InsufficientData);
    }

    #[test]
    fn balance_folds_unknown_categories_into_default_bucket() {
        let (_connection, mut store) = init_store();
        store.insert(expense(1, "Ann", 30.0, "Souvenirs")).unwrap();
        store.insert(expense(2, "Ben", 10.0, "Food")).unwrap();

        let outcome = balance_report(&store, &CategoryClassifier::default()).unwrap();

        let BalanceOutcome::Balance(report) = outcome else {
            panic!("expected a balance, got {outcome:?}");
        };

        assert_eq!(report.by_category[0].category, "Other");
        assert_eq!(report.by_category[0].total, 30.0);
        assert_eq!(report.by_category[1].category, "Food");
        assert_eq!(report.by_category[1].total, 10.0);
    }
}
