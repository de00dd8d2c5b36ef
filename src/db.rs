//! Database initialization: table creation and seed data for the shared
//! category and theme lookup tables.

use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};

use crate::Error;

/// The default spending categories available to every user.
const DEFAULT_CATEGORIES: [&str; 10] = [
    "General",
    "Bills",
    "Groceries",
    "Dining Out",
    "Transportation",
    "Entertainment",
    "Personal Care",
    "Education",
    "Lifestyle",
    "Shopping",
];

/// The default color themes used to tag pots and budgets.
const DEFAULT_THEMES: [(&str, &str); 15] = [
    ("Green", "#277C78"),
    ("Yellow", "#F2CDAC"),
    ("Cyan", "#82C9D7"),
    ("Navy", "#626070"),
    ("Red", "#C94736"),
    ("Purple", "#826CB0"),
    ("Turquoise", "#597C7C"),
    ("Brown", "#93674F"),
    ("Magenta", "#934F6F"),
    ("Blue", "#3F82B2"),
    ("Grey", "#97A0AC"),
    ("Army", "#7F9161"),
    ("Pink", "#AF81BA"),
    ("Gold", "#CAB361"),
    ("Orange", "#BE6C49"),
];

/// Create the application tables and seed the category and theme lookup
/// tables, all within a single exclusive transaction.
///
/// Amount columns hold integer minor units (cents). Binary floating point is
/// never used for money.
///
/// # Errors
/// Returns an error if a table cannot be created or if there is an SQL error.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    connection.execute("PRAGMA foreign_keys = ON", ())?;

    let transaction =
        SqlTransaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    transaction.execute(
        "CREATE TABLE IF NOT EXISTS user (
            id INTEGER PRIMARY KEY,
            balance_current INTEGER NOT NULL DEFAULT 0,
            balance_income INTEGER NOT NULL DEFAULT 0,
            balance_expenses INTEGER NOT NULL DEFAULT 0
            )",
        (),
    )?;

    transaction.execute(
        "CREATE TABLE IF NOT EXISTS category (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE
            )",
        (),
    )?;

    transaction.execute(
        "CREATE TABLE IF NOT EXISTS theme (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            color TEXT NOT NULL
            )",
        (),
    )?;

    transaction.execute(
        "CREATE TABLE IF NOT EXISTS pot (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            owner_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            target INTEGER NOT NULL CHECK(target > 0),
            total INTEGER NOT NULL DEFAULT 0 CHECK(total >= 0),
            theme_id INTEGER NOT NULL,
            FOREIGN KEY(owner_id) REFERENCES user(id),
            FOREIGN KEY(theme_id) REFERENCES theme(id),
            UNIQUE(owner_id, name),
            UNIQUE(owner_id, theme_id)
            )",
        (),
    )?;

    transaction.execute(
        "CREATE TABLE IF NOT EXISTS budget (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            owner_id INTEGER NOT NULL,
            category_id INTEGER NOT NULL,
            maximum INTEGER NOT NULL CHECK(maximum > 0),
            theme_id INTEGER NOT NULL,
            FOREIGN KEY(owner_id) REFERENCES user(id),
            FOREIGN KEY(category_id) REFERENCES category(id),
            FOREIGN KEY(theme_id) REFERENCES theme(id),
            UNIQUE(owner_id, category_id),
            UNIQUE(owner_id, theme_id)
            )",
        (),
    )?;

    transaction.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            owner_id INTEGER NOT NULL,
            category_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            amount INTEGER NOT NULL CHECK(amount > 0),
            kind TEXT NOT NULL CHECK(kind IN ('income', 'expense')),
            date TEXT NOT NULL,
            recurring INTEGER NOT NULL DEFAULT 0,
            avatar TEXT,
            FOREIGN KEY(owner_id) REFERENCES user(id),
            FOREIGN KEY(category_id) REFERENCES category(id)
            )",
        (),
    )?;

    for name in DEFAULT_CATEGORIES {
        transaction.execute("INSERT OR IGNORE INTO category (name) VALUES (?1)", (name,))?;
    }

    for (name, color) in DEFAULT_THEMES {
        transaction.execute(
            "INSERT OR IGNORE INTO theme (name, color) VALUES (?1, ?2)",
            (name, color),
        )?;
    }

    transaction.commit()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;

    use super::initialize;

    #[test]
    fn initialize_seeds_lookup_tables() {
        let connection = Connection::open_in_memory().unwrap();

        initialize(&connection).unwrap();

        let category_count: i64 = connection
            .query_row("SELECT COUNT(id) FROM category", [], |row| row.get(0))
            .unwrap();
        let theme_count: i64 = connection
            .query_row("SELECT COUNT(id) FROM theme", [], |row| row.get(0))
            .unwrap();

        assert_eq!(category_count, 10);
        assert_eq!(theme_count, 15);
    }

    #[test]
    fn initialize_is_idempotent() {
        let connection = Connection::open_in_memory().unwrap();

        initialize(&connection).unwrap();
        initialize(&connection).unwrap();

        let theme_count: i64 = connection
            .query_row("SELECT COUNT(id) FROM theme", [], |row| row.get(0))
            .unwrap();

        assert_eq!(theme_count, 15);
    }

    #[test]
    fn transaction_amounts_must_be_positive() {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        connection
            .execute("INSERT INTO user (id) VALUES (1)", ())
            .unwrap();

        let result = connection.execute(
            "INSERT INTO \"transaction\" (owner_id, category_id, name, amount, kind, date)
             VALUES (1, 1, 'Refund', -50, 'income', '2025-01-01')",
            (),
        );

        assert!(result.is_err());
    }
}
