//! The API endpoint URIs.

/// The route to enrol a user in the ledger.
pub const USERS: &str = "/api/users";
/// The route to read the caller's balance.
pub const BALANCE: &str = "/api/balance";
/// The route to create and list transactions.
pub const TRANSACTIONS: &str = "/api/transactions";
/// The route to read the five most recent transactions.
pub const RECENT_TRANSACTIONS: &str = "/api/transactions/recent";
/// The route to edit or delete a transaction.
pub const TRANSACTION: &str = "/api/transactions/{transaction_id}";
/// The route to create and list pots.
pub const POTS: &str = "/api/pots";
/// The route to edit or delete a pot.
pub const POT: &str = "/api/pots/{pot_id}";
/// The route to move money from the balance into a pot.
pub const POT_ADD: &str = "/api/pots/{pot_id}/add";
/// The route to move money from a pot back into the balance.
pub const POT_WITHDRAW: &str = "/api/pots/{pot_id}/withdraw";
/// The route to create and list budgets.
pub const BUDGETS: &str = "/api/budgets";
/// The route to edit or delete a budget.
pub const BUDGET: &str = "/api/budgets/{budget_id}";
/// The route to read the recurring-bills view.
pub const RECURRING: &str = "/api/recurring";
/// The route to list the transaction categories.
pub const CATEGORIES: &str = "/api/categories";
/// The route to list the color themes.
pub const THEMES: &str = "/api/themes";
