//! Application router configuration.

use axum::{
    Router, middleware,
    routing::{get, post, put},
};

use crate::{
    AppState,
    budget::{
        create_budget_endpoint, delete_budget_endpoint, list_budgets_endpoint,
        update_budget_endpoint,
    },
    category::list_categories_endpoint,
    endpoints,
    logging::logging_middleware,
    pot::{
        add_to_pot_endpoint, create_pot_endpoint, delete_pot_endpoint, list_pots_endpoint,
        update_pot_endpoint, withdraw_from_pot_endpoint,
    },
    recurring::recurring_bills_endpoint,
    theme::list_themes_endpoint,
    transaction::{
        create_transaction_endpoint, delete_transaction_endpoint, edit_transaction_endpoint,
        list_transactions_endpoint, recent_transactions_endpoint,
    },
    user::{create_user_endpoint, get_balance_endpoint},
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(endpoints::USERS, post(create_user_endpoint))
        .route(endpoints::BALANCE, get(get_balance_endpoint))
        .route(
            endpoints::TRANSACTIONS,
            post(create_transaction_endpoint).get(list_transactions_endpoint),
        )
        .route(
            endpoints::RECENT_TRANSACTIONS,
            get(recent_transactions_endpoint),
        )
        .route(
            endpoints::TRANSACTION,
            put(edit_transaction_endpoint).delete(delete_transaction_endpoint),
        )
        .route(
            endpoints::POTS,
            post(create_pot_endpoint).get(list_pots_endpoint),
        )
        .route(
            endpoints::POT,
            put(update_pot_endpoint).delete(delete_pot_endpoint),
        )
        .route(endpoints::POT_ADD, post(add_to_pot_endpoint))
        .route(endpoints::POT_WITHDRAW, post(withdraw_from_pot_endpoint))
        .route(
            endpoints::BUDGETS,
            post(create_budget_endpoint).get(list_budgets_endpoint),
        )
        .route(
            endpoints::BUDGET,
            put(update_budget_endpoint).delete(delete_budget_endpoint),
        )
        .route(endpoints::RECURRING, get(recurring_bills_endpoint))
        .route(endpoints::CATEGORIES, get(list_categories_endpoint))
        .route(endpoints::THEMES, get(list_themes_endpoint))
        .layer(middleware::from_fn(logging_middleware))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use rusqlite::Connection;

    use crate::{AppState, PaginationConfig, USER_ID_HEADER, endpoints};

    use super::build_router;

    fn get_test_server() -> TestServer {
        let state = AppState::new(
            Connection::open_in_memory().unwrap(),
            "Europe/London",
            PaginationConfig::default(),
        )
        .unwrap();

        TestServer::new(build_router(state)).unwrap()
    }

    #[tokio::test]
    async fn requests_without_a_user_header_are_unauthorized() {
        let server = get_test_server();

        let response = server.get(endpoints::BALANCE).await;

        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn categories_do_not_require_a_user() {
        let server = get_test_server();

        let response = server.get(endpoints::CATEGORIES).await;

        response.assert_status_ok();
    }

    #[tokio::test]
    async fn balance_round_trip() {
        let server = get_test_server();

        server
            .post(endpoints::USERS)
            .add_header(USER_ID_HEADER, "1")
            .await
            .assert_status(StatusCode::CREATED);

        let response = server
            .get(endpoints::BALANCE)
            .add_header(USER_ID_HEADER, "1")
            .await;

        response.assert_status_ok();
    }
}
