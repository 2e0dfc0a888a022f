//! Split Ledger is a shared-expense tracker for exactly two people.
//!
//! Free-text messages like `12,50 biedronka run` become categorised ledger
//! entries, and the ledger answers totals, balance and history queries over
//! named periods (including the salary cycle that starts on the 10th of
//! each month, rolled back over weekends).
//!
//! The chat transport is deliberately out of scope. [LedgerService] exposes
//! the structured requests a transport adapter needs; the bundled binary is
//! a terminal stand-in for one.

#![warn(missing_docs)]

mod access;
mod classifier;
mod db;
mod error;
mod model;
mod period;
mod report;
mod service;
mod stores;

pub use access::{AccessRegistry, MEMBER_CAPACITY, RegistrationOutcome};
pub use classifier::{CategoryClassifier, DEFAULT_CATEGORY, MatchMode};
pub use db::initialize as initialize_db;
pub use error::Error;
pub use model::{ExpenseEntry, ExpenseId, ExpenseUpdate, NewExpense, UserId};
pub use period::Period;
pub use report::{
    BalanceOutcome, BalanceReport, SETTLED_THRESHOLD, Settlement, ShareRow, TotalsReport,
    UserBalance, balance_report, totals_report,
};
pub use service::{
    AddExpenseRequest, AddExpenseResponse, DEFAULT_HISTORY_LIMIT, LedgerService, PeerNotification,
    QueryRequest, QueryResponse,
};
pub use stores::{CategoryTotal, ExpenseStore, SQLiteExpenseStore, UserCategoryTotal, UserTotal};
