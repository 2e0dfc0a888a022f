//! Defines the crate-level error type shared by the stores, the request
//! layer, and the binary.

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// A free-text expense message did not match `<amount> <description>`.
    ///
    /// This is user-correctable: callers should show the expected format
    /// rather than treating the request as a server fault.
    #[error("could not parse \"{0}\" as an amount followed by a description")]
    UnrecognisedExpenseFormat(String),

    /// An expense amount was zero or negative.
    ///
    /// The ledger records spending only, so every entry must carry a
    /// positive amount.
    #[error("{0} is not a positive amount")]
    NonPositiveAmount(f64),

    /// A query named a period that is not one of `week`, `month`, `year`,
    /// `all` or `salary`.
    ///
    /// Callers should fall back to the default period instead of surfacing
    /// this to the user.
    #[error("unknown period \"{0}\"")]
    InvalidPeriod(String),

    /// The caller is not one of the registered members.
    #[error("user is not registered with this ledger")]
    AccessDenied,

    /// The requested resource could not be found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// Could not acquire the database lock.
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}
