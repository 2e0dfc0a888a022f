//! A terminal stand-in for the chat transport: reads chat-style messages
//! from stdin and prints the structured results.

use std::{
    io::{self, BufRead},
    str::FromStr,
    sync::{Arc, Mutex},
};

use clap::Parser;
use rusqlite::Connection;
use time::OffsetDateTime;
use tracing_subscriber::EnvFilter;

use split_ledger::{
    AccessRegistry, AddExpenseRequest, CategoryClassifier, Error, ExpenseUpdate, LedgerService,
    MEMBER_CAPACITY, MatchMode, Period, QueryRequest, RegistrationOutcome, SQLiteExpenseStore,
    UserId, initialize_db,
};

/// The shared-expense ledger, driven from the terminal.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the ledger SQLite database.
    #[arg(long, default_value = "expenses.db")]
    db_path: String,

    /// Numeric id of the member sending the messages.
    #[arg(long)]
    user_id: UserId,

    /// Display name of the member sending the messages.
    #[arg(long)]
    name: String,

    /// How classifier keywords match descriptions.
    #[arg(long, default_value = "substring", value_parser = ["substring", "whole-word"])]
    match_mode: String,
}

fn main() {
    setup_logging();

    let args = Args::parse();

    let match_mode = match args.match_mode.as_str() {
        "whole-word" => MatchMode::WholeWord,
        _ => MatchMode::Substring,
    };

    let connection = Connection::open(&args.db_path).expect("could not open the ledger database");
    initialize_db(&connection).expect("could not initialise the ledger schema");

    let store = SQLiteExpenseStore::new(Arc::new(Mutex::new(connection)));
    let mut service = LedgerService::new(
        store,
        CategoryClassifier::new(match_mode),
        AccessRegistry::new(),
    );

    tracing::info!("ledger ready at {}", args.db_path);
    println!("Send /start to register, /help for commands, /quit to exit.");

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        let line = line.trim();

        if line.is_empty() {
            continue;
        }
        if line == "/quit" {
            break;
        }

        handle_line(&mut service, args.user_id, &args.name, line);
    }
}

fn setup_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();
}

fn handle_line(
    service: &mut LedgerService<SQLiteExpenseStore>,
    user_id: UserId,
    name: &str,
    line: &str,
) {
    let now = OffsetDateTime::now_utc();
    let mut words = line.split_whitespace();
    let command = words.next().unwrap_or_default();

    let result = match command {
        "/start" => {
            print_registration(service.register(user_id), name);
            Ok(())
        }
        "/help" => {
            print_help();
            Ok(())
        }
        "/categories" => {
            print_categories(service.classifier());
            Ok(())
        }
        "/stats" => {
            let period = match words.next().map(Period::from_str) {
                Some(Ok(period)) => Some(period),
                Some(Err(Error::InvalidPeriod(token))) => {
                    println!("Unknown period \"{token}\", using the current month.");
                    None
                }
                _ => None,
            };
            run_query(service, user_id, QueryRequest::Totals { period }, now)
        }
        "/balance" => run_query(service, user_id, QueryRequest::Balance, now),
        "/history" => {
            let limit = words.next().and_then(|token| token.parse().ok());
            run_query(service, user_id, QueryRequest::History { limit }, now)
        }
        "/delete" => match words.next().and_then(|token| token.parse().ok()) {
            Some(id) => service.delete(user_id, id).map(|deleted| {
                if deleted {
                    println!("Deleted expense {id}.");
                } else {
                    println!("No expense with id {id}.");
                }
            }),
            None => {
                println!("Usage: /delete <id>");
                Ok(())
            }
        },
        "/edit" => handle_edit(service, user_id, words),
        _ if command.starts_with('/') => {
            println!("Unknown command {command}. Try /help.");
            Ok(())
        }
        _ => add_expense(service, user_id, name, line),
    };

    if let Err(error) = result {
        print_error(error);
    }
}

fn add_expense(
    service: &mut LedgerService<SQLiteExpenseStore>,
    user_id: UserId,
    name: &str,
    line: &str,
) -> Result<(), Error> {
    let response = service.add_expense(AddExpenseRequest {
        user_id,
        display_name: name.to_string(),
        raw_text: line.to_string(),
    })?;

    let entry = &response.entry;
    println!(
        "Recorded #{}: {:.2} | {} | {} | {}",
        entry.id, entry.amount, entry.category, entry.description, entry.display_name
    );

    // Printing is this transport's delivery; a real messenger would log and
    // swallow delivery failures here instead of surfacing them.
    if let Some(notification) = response.notification {
        println!(
            "(notify user {}: {} spent {:.2} on {})",
            notification.recipient_user_id,
            notification.display_name,
            notification.amount,
            notification.description
        );
    }

    Ok(())
}

fn handle_edit<'a>(
    service: &mut LedgerService<SQLiteExpenseStore>,
    user_id: UserId,
    mut words: impl Iterator<Item = &'a str>,
) -> Result<(), Error> {
    let Some(id) = words.next().and_then(|token| token.parse().ok()) else {
        println!("Usage: /edit <id> [amount=..] [category=..] [description=..]");
        return Ok(());
    };

    let mut update = ExpenseUpdate::default();
    for pair in words {
        match pair.split_once('=') {
            Some(("amount", value)) => update.amount = value.parse().ok(),
            Some(("category", value)) => update.category = Some(value.to_string()),
            Some(("description", value)) => update.description = Some(value.to_string()),
            _ => println!("Ignoring \"{pair}\"."),
        }
    }

    if update.is_empty() {
        println!("Nothing to change.");
        return Ok(());
    }

    if service.update(user_id, id, update)? {
        println!("Updated expense {id}.");
    } else {
        println!("No expense with id {id}.");
    }

    Ok(())
}

fn run_query(
    service: &LedgerService<SQLiteExpenseStore>,
    user_id: UserId,
    request: QueryRequest,
    now: OffsetDateTime,
) -> Result<(), Error> {
    let response = service.query(user_id, request, now)?;

    match serde_json::to_string_pretty(&response) {
        Ok(json) => println!("{json}"),
        Err(error) => tracing::error!("could not serialise the query response: {error}"),
    }

    Ok(())
}

fn print_registration(outcome: RegistrationOutcome, name: &str) {
    match outcome {
        RegistrationOutcome::Registered { members } => {
            println!("Welcome, {name}! Registered members: {members}/{MEMBER_CAPACITY}.");
        }
        RegistrationOutcome::AlreadyRegistered { members } => {
            println!("You are already registered, {name}. Members: {members}/{MEMBER_CAPACITY}.");
        }
        RegistrationOutcome::Full => {
            println!("This ledger already has {MEMBER_CAPACITY} members.");
        }
    }
}

fn print_categories(classifier: &CategoryClassifier) {
    for label in classifier.labels() {
        match classifier.keywords(label) {
            Some(keywords) => println!("{label}: {}", keywords.join(", ")),
            None => println!("{label}: everything else"),
        }
    }
}

fn print_help() {
    println!("Record an expense by sending: <amount> <description>");
    println!("  e.g. 500 groceries, 12,50 taxi");
    println!("/stats [week|month|year|salary|all] - spending totals");
    println!("/balance - who owes whom");
    println!("/history [n] - recent entries");
    println!("/delete <id> - remove an entry");
    println!("/edit <id> amount=.. category=.. description=.. - change an entry");
    println!("/categories - category keywords");
    println!("/quit - exit");
}

fn print_error(error: Error) {
    match error {
        Error::UnrecognisedExpenseFormat(_) => {
            println!("Could not read that. Use: <amount> <description>, e.g. 500 groceries.");
        }
        Error::NonPositiveAmount(_) => println!("The amount must be greater than zero."),
        Error::AccessDenied => {
            println!("You do not have access to this ledger. Send /start to register.");
        }
        Error::InvalidPeriod(period) => {
            println!("Unknown period \"{period}\". Try week, month, year, salary or all.");
        }
        error => {
            tracing::error!("request failed: {error}");
            println!("Something went wrong, check the logs for details.");
        }
    }
}
