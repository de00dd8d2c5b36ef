//! Defines the transaction model and the atomic ledger operations that keep
//! the user's balance and their transaction history consistent.
//!
//! Every mutation here opens one SQLite transaction with IMMEDIATE behavior,
//! applies the balance delta and the record write inside it, and commits them
//! together. Any error before the commit drops the transaction, which rolls
//! every step back.

use rusqlite::{
    Connection, Row, Transaction as SqlTransaction, TransactionBehavior,
    types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    Error, MAX_NAME_LENGTH,
    database_id::{CategoryId, TransactionId, UserId},
    user::{BalanceDelta, apply_balance_delta, get_user},
};

// ============================================================================
// MODELS
// ============================================================================

/// Whether a transaction brings money in or spends it.
///
/// The sign of a transaction lives here; `amount` is always a positive
/// magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Money earned, added to the balance.
    Income,
    /// Money spent, subtracted from the balance.
    Expense,
}

impl TransactionKind {
    fn as_str(self) -> &'static str {
        match self {
            TransactionKind::Income => "income",
            TransactionKind::Expense => "expense",
        }
    }
}

impl ToSql for TransactionKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for TransactionKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "income" => Ok(TransactionKind::Income),
            "expense" => Ok(TransactionKind::Expense),
            other => Err(FromSqlError::Other(
                format!("unknown transaction kind \"{other}\"").into(),
            )),
        }
    }
}

/// A single income or expense event in a user's ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// The ID of the user who owns the transaction.
    pub owner_id: UserId,
    /// The ID of the category the transaction belongs to.
    pub category_id: CategoryId,
    /// The name of the category, resolved at read time.
    pub category_name: String,
    /// The counterparty or purpose, e.g. "Netflix".
    pub name: String,
    /// The magnitude of the transaction in minor units (cents), always positive.
    pub amount: i64,
    /// Whether the amount was earned or spent.
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    /// When the transaction happened.
    pub date: Date,
    /// Whether this transaction is part of a recurring bill series.
    pub recurring: bool,
    /// An optional avatar image URL for display.
    pub avatar: Option<String>,
}

/// The fields a caller supplies to create or overwrite a transaction.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionPayload {
    /// The counterparty or purpose of the transaction.
    pub name: String,
    /// The magnitude in minor units (cents); must be positive.
    pub amount: i64,
    /// Whether the amount was earned or spent.
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    /// When the transaction happened.
    pub date: Date,
    /// Whether this transaction is part of a recurring bill series.
    #[serde(default)]
    pub recurring: bool,
    /// The category to file the transaction under.
    pub category_id: CategoryId,
    /// An optional avatar image URL for display.
    #[serde(default)]
    pub avatar: Option<String>,
}

impl TransactionPayload {
    /// Check the field-level constraints and normalize the name.
    ///
    /// # Errors
    /// Returns [Error::EmptyName], [Error::NameTooLong] or
    /// [Error::InvalidAmount] if a field is out of range.
    fn validated(mut self) -> Result<Self, Error> {
        self.name = self.name.trim().to_owned();

        if self.name.is_empty() {
            return Err(Error::EmptyName);
        }

        if self.name.chars().count() > MAX_NAME_LENGTH {
            return Err(Error::NameTooLong);
        }

        if self.amount <= 0 {
            return Err(Error::InvalidAmount);
        }

        Ok(self)
    }
}

// ============================================================================
// BALANCE ARITHMETIC
// ============================================================================

/// The balance delta applied when a transaction of `kind`/`amount` is created.
pub(crate) fn balance_delta(kind: TransactionKind, amount: i64) -> BalanceDelta {
    match kind {
        TransactionKind::Income => BalanceDelta {
            current: amount,
            income: amount,
            expenses: 0,
        },
        TransactionKind::Expense => BalanceDelta {
            current: -amount,
            income: 0,
            expenses: amount,
        },
    }
}

/// The single net adjustment for replacing `(original_kind, original_amount)`
/// with `(new_kind, new_amount)`.
///
/// Applying the net form rather than a reversal followed by a re-application
/// means the balance never passes through a transient intermediate state
/// inside the unit.
pub(crate) fn net_adjustment(
    original_kind: TransactionKind,
    original_amount: i64,
    new_kind: TransactionKind,
    new_amount: i64,
) -> BalanceDelta {
    use TransactionKind::{Expense, Income};

    match (original_kind, new_kind) {
        (Income, Income) => BalanceDelta {
            current: new_amount - original_amount,
            income: new_amount - original_amount,
            expenses: 0,
        },
        (Income, Expense) => BalanceDelta {
            current: -original_amount - new_amount,
            income: -original_amount,
            expenses: new_amount,
        },
        (Expense, Income) => BalanceDelta {
            current: original_amount + new_amount,
            income: new_amount,
            expenses: -original_amount,
        },
        (Expense, Expense) => BalanceDelta {
            current: original_amount - new_amount,
            income: 0,
            expenses: new_amount - original_amount,
        },
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

pub(crate) const TRANSACTION_COLUMNS: &str = "t.id, t.owner_id, t.category_id, category.name, \
     t.name, t.amount, t.kind, t.date, t.recurring, t.avatar";

pub(crate) fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    Ok(Transaction {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        category_id: row.get(2)?,
        category_name: row.get(3)?,
        name: row.get(4)?,
        amount: row.get(5)?,
        kind: row.get(6)?,
        date: row.get(7)?,
        recurring: row.get(8)?,
        avatar: row.get(9)?,
    })
}

/// Retrieve one of `owner`'s transactions by its `id`, with the category name
/// resolved.
///
/// # Errors
/// Returns [Error::NotFound] if the transaction does not exist or belongs to
/// another user, or [Error::SqlError] if there is some other SQL error.
pub fn get_transaction(
    owner: UserId,
    id: TransactionId,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let query = format!(
        "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\" t \
         INNER JOIN category ON t.category_id = category.id \
         WHERE t.id = :id AND t.owner_id = :owner"
    );

    connection
        .prepare(&query)?
        .query_one(&[(":id", &id), (":owner", &owner)], map_transaction_row)
        .map_err(|error| error.into())
}

/// Create a transaction for `owner` and apply its balance delta, as one atomic
/// unit.
///
/// An expense larger than the current balance is rejected before any write.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `owner` has no ledger record or the category does not exist,
/// - [Error::InsufficientFunds] if an expense exceeds the current balance,
/// - [Error::EmptyName], [Error::NameTooLong] or [Error::InvalidAmount] for bad fields,
/// - [Error::SqlError] if there is some other SQL error.
pub fn create_transaction(
    owner: UserId,
    payload: TransactionPayload,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let payload = payload.validated()?;

    let db_transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    let user = get_user(owner, &db_transaction)?;

    if payload.kind == TransactionKind::Expense && payload.amount > user.balance.current {
        return Err(Error::InsufficientFunds);
    }

    apply_balance_delta(
        owner,
        balance_delta(payload.kind, payload.amount),
        &db_transaction,
    )?;

    let id: TransactionId = db_transaction.query_row(
        "INSERT INTO \"transaction\" (owner_id, category_id, name, amount, kind, date, recurring, avatar)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         RETURNING id",
        (
            owner,
            payload.category_id,
            &payload.name,
            payload.amount,
            payload.kind,
            payload.date,
            payload.recurring,
            &payload.avatar,
        ),
        |row| row.get(0),
    )?;

    let transaction = get_transaction(owner, id, &db_transaction)?;

    db_transaction.commit()?;

    Ok(transaction)
}

/// Delete one of `owner`'s transactions and reverse its balance delta, as one
/// atomic unit.
///
/// # Errors
/// Returns [Error::NotFound] if the transaction does not exist or belongs to
/// another user, or [Error::SqlError] if there is some other SQL error.
pub fn delete_transaction(
    owner: UserId,
    id: TransactionId,
    connection: &Connection,
) -> Result<(), Error> {
    let db_transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    let transaction = get_transaction(owner, id, &db_transaction)?;

    apply_balance_delta(
        owner,
        balance_delta(transaction.kind, transaction.amount).reversed(),
        &db_transaction,
    )?;

    db_transaction.execute(
        "DELETE FROM \"transaction\" WHERE id = :id AND owner_id = :owner",
        &[(":id", &id), (":owner", &owner)],
    )?;

    db_transaction.commit()?;

    Ok(())
}

/// Overwrite one of `owner`'s transactions and apply the net balance
/// adjustment, as one atomic unit.
///
/// The adjustment is computed once from the old and new `(kind, amount)` pair
/// rather than reversing and re-applying, so the stored balance moves straight
/// to its final value.
///
/// # Errors
/// Returns [Error::NotFound] if the transaction does not exist or belongs to
/// another user, a validation error for bad fields, or [Error::SqlError] if
/// there is some other SQL error.
pub fn update_transaction(
    owner: UserId,
    id: TransactionId,
    payload: TransactionPayload,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let payload = payload.validated()?;

    let db_transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    let original = get_transaction(owner, id, &db_transaction)?;

    apply_balance_delta(
        owner,
        net_adjustment(original.kind, original.amount, payload.kind, payload.amount),
        &db_transaction,
    )?;

    db_transaction.execute(
        "UPDATE \"transaction\" SET
            category_id = :category_id,
            name = :name,
            amount = :amount,
            kind = :kind,
            date = :date,
            recurring = :recurring,
            avatar = :avatar
         WHERE id = :id AND owner_id = :owner",
        rusqlite::named_params! {
            ":category_id": payload.category_id,
            ":name": payload.name,
            ":amount": payload.amount,
            ":kind": payload.kind,
            ":date": payload.date,
            ":recurring": payload.recurring,
            ":avatar": payload.avatar,
            ":id": id,
            ":owner": owner,
        },
    )?;

    let updated = get_transaction(owner, id, &db_transaction)?;

    db_transaction.commit()?;

    Ok(updated)
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        Error, initialize_db,
        user::{create_user, get_user},
    };

    use super::{
        TransactionKind, TransactionPayload, create_transaction, delete_transaction,
        get_transaction, net_adjustment, update_transaction,
    };

    const OWNER: i64 = 1;

    fn get_test_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        initialize_db(&connection).unwrap();
        create_user(OWNER, &connection).unwrap();
        connection
    }

    fn payload(amount: i64, kind: TransactionKind) -> TransactionPayload {
        TransactionPayload {
            name: "Test".to_owned(),
            amount,
            kind,
            date: date!(2025 - 08 - 15),
            recurring: false,
            category_id: 1,
            avatar: None,
        }
    }

    fn count_transactions(connection: &Connection) -> i64 {
        connection
            .query_row("SELECT COUNT(id) FROM \"transaction\"", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn create_income_applies_balance_delta() {
        let connection = get_test_connection();

        let transaction =
            create_transaction(OWNER, payload(50_000, TransactionKind::Income), &connection)
                .unwrap();

        let balance = get_user(OWNER, &connection).unwrap().balance;
        assert_eq!(balance.current, 50_000);
        assert_eq!(balance.income, 50_000);
        assert_eq!(balance.expenses, 0);
        assert!(!transaction.category_name.is_empty());
    }

    #[test]
    fn create_expense_applies_balance_delta() {
        let connection = get_test_connection();
        create_transaction(OWNER, payload(50_000, TransactionKind::Income), &connection).unwrap();

        create_transaction(OWNER, payload(12_500, TransactionKind::Expense), &connection).unwrap();

        let balance = get_user(OWNER, &connection).unwrap().balance;
        assert_eq!(balance.current, 37_500);
        assert_eq!(balance.income, 50_000);
        assert_eq!(balance.expenses, 12_500);
    }

    #[test]
    fn overspending_is_rejected_without_writes() {
        let connection = get_test_connection();
        create_transaction(OWNER, payload(100, TransactionKind::Income), &connection).unwrap();

        let result =
            create_transaction(OWNER, payload(101, TransactionKind::Expense), &connection);

        assert_eq!(result, Err(Error::InsufficientFunds));
        let balance = get_user(OWNER, &connection).unwrap().balance;
        assert_eq!(balance.current, 100);
        assert_eq!(balance.expenses, 0);
        assert_eq!(count_transactions(&connection), 1);
    }

    #[test]
    fn expense_equal_to_balance_is_allowed() {
        let connection = get_test_connection();
        create_transaction(OWNER, payload(100, TransactionKind::Income), &connection).unwrap();

        create_transaction(OWNER, payload(100, TransactionKind::Expense), &connection).unwrap();

        let balance = get_user(OWNER, &connection).unwrap().balance;
        assert_eq!(balance.current, 0);
    }

    #[test]
    fn failed_insert_rolls_back_balance_update() {
        let connection = get_test_connection();
        create_transaction(OWNER, payload(1_000, TransactionKind::Income), &connection).unwrap();

        // A dangling category ID makes the insert fail after the balance has
        // already been updated inside the unit.
        let mut bad_payload = payload(500, TransactionKind::Expense);
        bad_payload.category_id = 9_999;
        let result = create_transaction(OWNER, bad_payload, &connection);

        assert_eq!(result, Err(Error::NotFound));
        let balance = get_user(OWNER, &connection).unwrap().balance;
        assert_eq!(balance.current, 1_000, "balance delta must be rolled back");
        assert_eq!(balance.expenses, 0);
        assert_eq!(count_transactions(&connection), 1);
    }

    #[test]
    fn create_for_unknown_user_is_not_found() {
        let connection = get_test_connection();

        let result = create_transaction(42, payload(100, TransactionKind::Income), &connection);

        assert_eq!(result, Err(Error::NotFound));
    }

    #[test]
    fn create_rejects_non_positive_amount() {
        let connection = get_test_connection();

        let result = create_transaction(OWNER, payload(0, TransactionKind::Income), &connection);

        assert_eq!(result, Err(Error::InvalidAmount));
    }

    #[test]
    fn create_rejects_blank_name() {
        let connection = get_test_connection();
        let mut blank = payload(100, TransactionKind::Income);
        blank.name = "   ".to_owned();

        let result = create_transaction(OWNER, blank, &connection);

        assert_eq!(result, Err(Error::EmptyName));
    }

    #[test]
    fn delete_reverses_the_original_delta() {
        let connection = get_test_connection();
        create_transaction(OWNER, payload(50_000, TransactionKind::Income), &connection).unwrap();
        let expense =
            create_transaction(OWNER, payload(7_500, TransactionKind::Expense), &connection)
                .unwrap();

        delete_transaction(OWNER, expense.id, &connection).unwrap();

        let balance = get_user(OWNER, &connection).unwrap().balance;
        assert_eq!(balance.current, 50_000);
        assert_eq!(balance.expenses, 0);
        assert_eq!(
            get_transaction(OWNER, expense.id, &connection),
            Err(Error::NotFound)
        );
    }

    #[test]
    fn delete_of_another_users_transaction_is_not_found() {
        let connection = get_test_connection();
        create_user(2, &connection).unwrap();
        let transaction =
            create_transaction(OWNER, payload(100, TransactionKind::Income), &connection).unwrap();

        let result = delete_transaction(2, transaction.id, &connection);

        assert_eq!(result, Err(Error::NotFound));
        let balance = get_user(OWNER, &connection).unwrap().balance;
        assert_eq!(balance.current, 100, "the owner's balance must be untouched");
    }

    #[test]
    fn net_adjustment_covers_all_four_kind_transitions() {
        use TransactionKind::{Expense, Income};

        let same_income = net_adjustment(Income, 100, Income, 150);
        assert_eq!((same_income.current, same_income.income, same_income.expenses), (50, 50, 0));

        let income_to_expense = net_adjustment(Income, 100, Expense, 40);
        assert_eq!(
            (
                income_to_expense.current,
                income_to_expense.income,
                income_to_expense.expenses
            ),
            (-140, -100, 40)
        );

        let expense_to_income = net_adjustment(Expense, 30, Income, 70);
        assert_eq!(
            (
                expense_to_income.current,
                expense_to_income.income,
                expense_to_income.expenses
            ),
            (100, 70, -30)
        );

        let same_expense = net_adjustment(Expense, 80, Expense, 50);
        assert_eq!((same_expense.current, same_expense.income, same_expense.expenses), (30, 0, -30));
    }

    #[test]
    fn update_income_to_expense_moves_balance_straight_to_final_value() {
        let connection = get_test_connection();
        create_transaction(OWNER, payload(400, TransactionKind::Income), &connection).unwrap();
        let original =
            create_transaction(OWNER, payload(100, TransactionKind::Income), &connection).unwrap();
        // current = 500, income = 500, expenses = 0

        update_transaction(
            OWNER,
            original.id,
            payload(40, TransactionKind::Expense),
            &connection,
        )
        .unwrap();

        let balance = get_user(OWNER, &connection).unwrap().balance;
        assert_eq!(balance.current, 360);
        assert_eq!(balance.income, 400);
        assert_eq!(balance.expenses, 40);
    }

    #[test]
    fn update_matches_delete_then_create() {
        let connection = get_test_connection();
        create_user(2, &connection).unwrap();
        for owner in [OWNER, 2] {
            create_transaction(owner, payload(400, TransactionKind::Income), &connection).unwrap();
        }
        let updated_one =
            create_transaction(OWNER, payload(100, TransactionKind::Income), &connection).unwrap();
        let replaced_one =
            create_transaction(2, payload(100, TransactionKind::Income), &connection).unwrap();

        update_transaction(
            OWNER,
            updated_one.id,
            payload(40, TransactionKind::Expense),
            &connection,
        )
        .unwrap();

        delete_transaction(2, replaced_one.id, &connection).unwrap();
        create_transaction(2, payload(40, TransactionKind::Expense), &connection).unwrap();

        let updated_balance = get_user(OWNER, &connection).unwrap().balance;
        let replaced_balance = get_user(2, &connection).unwrap().balance;
        assert_eq!(updated_balance, replaced_balance);
    }

    #[test]
    fn update_overwrites_fields() {
        let connection = get_test_connection();
        let original =
            create_transaction(OWNER, payload(100, TransactionKind::Income), &connection).unwrap();

        let mut new_fields = payload(250, TransactionKind::Income);
        new_fields.name = "Paycheck".to_owned();
        new_fields.recurring = true;
        let updated = update_transaction(OWNER, original.id, new_fields, &connection).unwrap();

        assert_eq!(updated.name, "Paycheck");
        assert_eq!(updated.amount, 250);
        assert!(updated.recurring);
        assert_eq!(updated.id, original.id);
    }

    #[test]
    fn update_missing_transaction_is_not_found() {
        let connection = get_test_connection();

        let result = update_transaction(
            OWNER,
            999,
            payload(100, TransactionKind::Income),
            &connection,
        );

        assert_eq!(result, Err(Error::NotFound));
    }
}
