//! The transport-agnostic request layer: structured add, query, update and
//! delete requests in, structured results out.
//!
//! A chat transport (or the bundled REPL binary) translates inbound
//! messages into these request types and renders the responses however it
//! likes; the core never formats text for a particular messenger.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    Error,
    access::{AccessRegistry, RegistrationOutcome},
    classifier::CategoryClassifier,
    model::{ExpenseEntry, ExpenseId, ExpenseUpdate, NewExpense, UserId},
    period::Period,
    report::{BalanceOutcome, TotalsReport, balance_report, totals_report},
    stores::ExpenseStore,
};

/// How many entries a history query returns when the caller does not say.
pub const DEFAULT_HISTORY_LIMIT: u32 = 10;

/// A request to record one expense from a free-text chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddExpenseRequest {
    /// The sender of the message.
    pub user_id: UserId,
    /// The sender's name at the time of the message.
    pub display_name: String,
    /// The raw message text, expected to match `<amount> <description>`.
    pub raw_text: String,
}

/// Payload for a best-effort message to the other member.
///
/// Delivery is the transport's problem: a failure to deliver must be
/// logged and swallowed, never surfaced to the submitter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeerNotification {
    /// The member to notify.
    pub recipient_user_id: UserId,
    /// The recorded amount.
    pub amount: f64,
    /// The assigned category.
    pub category: String,
    /// The expense description.
    pub description: String,
    /// Who recorded the expense.
    pub display_name: String,
}

/// The confirmation returned for a recorded expense.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AddExpenseResponse {
    /// The entry as persisted, including its assigned id.
    pub entry: ExpenseEntry,
    /// Notification payload for the other member, when one is registered.
    pub notification: Option<PeerNotification>,
}

/// A read-only query against the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum QueryRequest {
    /// Spending totals with per-category and per-member breakdowns.
    Totals {
        /// The period to report over; defaults to [Period::DEFAULT].
        period: Option<Period>,
    },
    /// The all-time settlement between the two members.
    Balance,
    /// The most recent entries.
    History {
        /// Maximum number of entries; defaults to [DEFAULT_HISTORY_LIMIT].
        limit: Option<u32>,
    },
}

/// The structured result of a [QueryRequest].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum QueryResponse {
    /// Totals for the requested period.
    Totals(TotalsReport),
    /// The settlement between the members.
    Balance(BalanceOutcome),
    /// Recent entries, newest first.
    History {
        /// The entries, newest first.
        entries: Vec<ExpenseEntry>,
    },
}

/// Wires the classifier, the access registry and a ledger store into the
/// operations a chat transport needs.
pub struct LedgerService<S> {
    store: S,
    classifier: CategoryClassifier,
    registry: AccessRegistry,
}

impl<S: ExpenseStore> LedgerService<S> {
    /// Create a service over `store` with the given collaborators.
    pub fn new(store: S, classifier: CategoryClassifier, registry: AccessRegistry) -> Self {
        Self {
            store,
            classifier,
            registry,
        }
    }

    /// Handle a `/start`-style registration request.
    ///
    /// The first two distinct callers become the ledger's members; everyone
    /// after that is turned away.
    pub fn register(&self, user_id: UserId) -> RegistrationOutcome {
        self.registry.try_register(user_id)
    }

    /// Record one expense from a free-text message.
    ///
    /// # Errors
    /// Returns [Error::AccessDenied] for unregistered senders,
    /// [Error::UnrecognisedExpenseFormat] when the text does not match
    /// `<amount> <description>`, and [Error::NonPositiveAmount] when the
    /// amount parses to zero. No entry is created in any error case.
    pub fn add_expense(&mut self, request: AddExpenseRequest) -> Result<AddExpenseResponse, Error> {
        self.authorize(request.user_id)?;

        let (amount, description) = parse_expense_text(&request.raw_text)?;
        if amount <= 0.0 {
            return Err(Error::NonPositiveAmount(amount));
        }

        let category = self.classifier.classify(&description).to_string();
        let entry = self.store.insert(NewExpense {
            user_id: request.user_id,
            display_name: request.display_name,
            amount,
            category,
            description,
        })?;

        tracing::info!(
            id = entry.id,
            amount = entry.amount,
            category = %entry.category,
            "recorded expense"
        );

        let notification = self
            .registry
            .peer_of(entry.user_id)
            .map(|recipient_user_id| PeerNotification {
                recipient_user_id,
                amount: entry.amount,
                category: entry.category.clone(),
                description: entry.description.clone(),
                display_name: entry.display_name.clone(),
            });

        Ok(AddExpenseResponse {
            entry,
            notification,
        })
    }

    /// Answer a read-only query. `now` anchors period resolution.
    pub fn query(
        &self,
        user_id: UserId,
        request: QueryRequest,
        now: OffsetDateTime,
    ) -> Result<QueryResponse, Error> {
        self.authorize(user_id)?;

        match request {
            QueryRequest::Totals { period } => {
                let period = period.unwrap_or(Period::DEFAULT);
                Ok(QueryResponse::Totals(totals_report(
                    &self.store,
                    period,
                    now,
                )?))
            }
            QueryRequest::Balance => Ok(QueryResponse::Balance(balance_report(
                &self.store,
                &self.classifier,
            )?)),
            QueryRequest::History { limit } => Ok(QueryResponse::History {
                entries: self
                    .store
                    .recent(limit.unwrap_or(DEFAULT_HISTORY_LIMIT))?,
            }),
        }
    }

    /// Delete the entry with `id`. Returns whether anything was removed;
    /// repeating a delete is a no-op, not an error.
    pub fn delete(&mut self, user_id: UserId, id: ExpenseId) -> Result<bool, Error> {
        self.authorize(user_id)?;

        let deleted = self.store.delete(id)?;
        if deleted {
            tracing::info!(id, "deleted expense");
        }

        Ok(deleted)
    }

    /// Apply a partial update to the entry with `id`.
    pub fn update(
        &mut self,
        user_id: UserId,
        id: ExpenseId,
        update: ExpenseUpdate,
    ) -> Result<bool, Error> {
        self.authorize(user_id)?;
        self.store.update(id, update)
    }

    /// The classifier, for help surfaces listing categories and keywords.
    pub fn classifier(&self) -> &CategoryClassifier {
        &self.classifier
    }

    fn authorize(&self, user_id: UserId) -> Result<(), Error> {
        if self.registry.is_authorized(user_id) {
            Ok(())
        } else {
            tracing::warn!("denied request from unregistered user {user_id}");
            Err(Error::AccessDenied)
        }
    }
}

/// Split `<amount> <description>` into a non-negative amount and a
/// non-empty description. The fraction separator may be a comma or a dot.
fn parse_expense_text(raw_text: &str) -> Result<(f64, String), Error> {
    let text = raw_text.trim();

    let Some((amount_token, rest)) = text.split_once(char::is_whitespace) else {
        return Err(Error::UnrecognisedExpenseFormat(raw_text.to_string()));
    };

    let description = rest.trim_start();
    if description.is_empty() {
        return Err(Error::UnrecognisedExpenseFormat(raw_text.to_string()));
    }

    let Some(amount) = parse_amount(amount_token) else {
        return Err(Error::UnrecognisedExpenseFormat(raw_text.to_string()));
    };

    Ok((amount, description.to_string()))
}

/// Parse a decimal token of digits with at most one `.` or `,` separator.
fn parse_amount(token: &str) -> Option<f64> {
    let normalised = token.replace(',', ".");

    let mut parts = normalised.split('.');
    let integer = parts.next()?;
    let fraction = parts.next();
    if parts.next().is_some() {
        return None;
    }

    if integer.is_empty() || !integer.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }

    if let Some(fraction) = fraction {
        if fraction.is_empty() || !fraction.bytes().all(|byte| byte.is_ascii_digit()) {
            return None;
        }
    }

    normalised.parse().ok()
}
