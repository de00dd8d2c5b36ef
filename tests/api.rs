//! End-to-end tests that exercise the JSON API through the full router,
//! covering the ledger flows a client would actually run: enrolling, posting
//! transactions, moving money through pots, budgeting and the recurring view.

use axum_test::TestServer;
use rusqlite::Connection;
use serde_json::{Value, json};

use coinkeeper::{AppState, PaginationConfig, USER_ID_HEADER, build_router, endpoints};

fn get_test_server() -> TestServer {
    let state = AppState::new(
        Connection::open_in_memory().expect("Could not create in-memory database."),
        "Europe/London",
        PaginationConfig::default(),
    )
    .expect("Could not create app state.");

    TestServer::new(build_router(state)).expect("Could not create test server.")
}

async fn enroll(server: &TestServer, user_id: &str) {
    server
        .post(endpoints::USERS)
        .add_header(USER_ID_HEADER, user_id)
        .await
        .assert_status(axum::http::StatusCode::CREATED);
}

fn transaction(name: &str, amount: i64, kind: &str, date: &str) -> Value {
    json!({
        "name": name,
        "amount": amount,
        "type": kind,
        "date": date,
        "categoryId": 1,
    })
}

async fn balance(server: &TestServer, user_id: &str) -> Value {
    let response = server
        .get(endpoints::BALANCE)
        .add_header(USER_ID_HEADER, user_id)
        .await;
    response.assert_status_ok();

    response.json::<Value>()["data"].clone()
}

#[tokio::test]
async fn transactions_move_the_balance() {
    let server = get_test_server();
    enroll(&server, "1").await;

    server
        .post(endpoints::TRANSACTIONS)
        .add_header(USER_ID_HEADER, "1")
        .json(&transaction("Paycheck", 250_000, "income", "2025-08-01"))
        .await
        .assert_status(axum::http::StatusCode::CREATED);

    let response = server
        .post(endpoints::TRANSACTIONS)
        .add_header(USER_ID_HEADER, "1")
        .json(&transaction("Groceries", 7_500, "expense", "2025-08-02"))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);

    let body = response.json::<Value>();
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"]["type"], json!("expense"));
    assert_eq!(body["data"]["categoryName"], json!("General"));

    let balance = balance(&server, "1").await;
    assert_eq!(balance["current"], json!(242_500));
    assert_eq!(balance["income"], json!(250_000));
    assert_eq!(balance["expenses"], json!(7_500));
}

#[tokio::test]
async fn overspending_is_rejected_with_the_error_envelope() {
    let server = get_test_server();
    enroll(&server, "1").await;

    let response = server
        .post(endpoints::TRANSACTIONS)
        .add_header(USER_ID_HEADER, "1")
        .json(&transaction("Rent", 90_000, "expense", "2025-08-01"))
        .await;

    response.assert_status(axum::http::StatusCode::BAD_REQUEST);
    let body = response.json::<Value>();
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["error"]["reason"], json!("insufficient_funds"));

    let balance = balance(&server, "1").await;
    assert_eq!(balance["current"], json!(0));
    assert_eq!(balance["expenses"], json!(0));
}

#[tokio::test]
async fn deleting_a_transaction_reverses_it() {
    let server = get_test_server();
    enroll(&server, "1").await;

    let response = server
        .post(endpoints::TRANSACTIONS)
        .add_header(USER_ID_HEADER, "1")
        .json(&transaction("Paycheck", 100_000, "income", "2025-08-01"))
        .await;
    let id = response.json::<Value>()["data"]["id"].clone();

    server
        .delete(&format!("/api/transactions/{id}"))
        .add_header(USER_ID_HEADER, "1")
        .await
        .assert_status_ok();

    let balance = balance(&server, "1").await;
    assert_eq!(balance["current"], json!(0));
    assert_eq!(balance["income"], json!(0));
}

#[tokio::test]
async fn pot_lifecycle_conserves_money() {
    let server = get_test_server();
    enroll(&server, "1").await;

    server
        .post(endpoints::TRANSACTIONS)
        .add_header(USER_ID_HEADER, "1")
        .json(&transaction("Paycheck", 100_000, "income", "2025-08-01"))
        .await
        .assert_status(axum::http::StatusCode::CREATED);

    let response = server
        .post(endpoints::POTS)
        .add_header(USER_ID_HEADER, "1")
        .json(&json!({ "name": "Holiday", "target": 50_000, "themeId": 1 }))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);
    let pot_id = response.json::<Value>()["data"]["id"].clone();

    server
        .post(&format!("/api/pots/{pot_id}/add"))
        .add_header(USER_ID_HEADER, "1")
        .json(&json!({ "amount": 30_000 }))
        .await
        .assert_status_ok();

    assert_eq!(balance(&server, "1").await["current"], json!(70_000));

    server
        .post(&format!("/api/pots/{pot_id}/withdraw"))
        .add_header(USER_ID_HEADER, "1")
        .json(&json!({ "amount": 10_000 }))
        .await
        .assert_status_ok();

    assert_eq!(balance(&server, "1").await["current"], json!(80_000));

    // Deleting the pot refunds the remaining 20,000.
    server
        .delete(&format!("/api/pots/{pot_id}"))
        .add_header(USER_ID_HEADER, "1")
        .await
        .assert_status_ok();

    assert_eq!(balance(&server, "1").await["current"], json!(100_000));
}

#[tokio::test]
async fn duplicate_pot_names_are_rejected() {
    let server = get_test_server();
    enroll(&server, "1").await;

    server
        .post(endpoints::POTS)
        .add_header(USER_ID_HEADER, "1")
        .json(&json!({ "name": "Holiday", "target": 50_000, "themeId": 1 }))
        .await
        .assert_status(axum::http::StatusCode::CREATED);

    let response = server
        .post(endpoints::POTS)
        .add_header(USER_ID_HEADER, "1")
        .json(&json!({ "name": "Holiday", "target": 10_000, "themeId": 2 }))
        .await;

    response.assert_status(axum::http::StatusCode::BAD_REQUEST);
    assert_eq!(
        response.json::<Value>()["error"]["reason"],
        json!("duplicate_pot_name")
    );
}

#[tokio::test]
async fn users_cannot_see_each_others_data() {
    let server = get_test_server();
    enroll(&server, "1").await;
    enroll(&server, "2").await;

    let response = server
        .post(endpoints::TRANSACTIONS)
        .add_header(USER_ID_HEADER, "1")
        .json(&transaction("Paycheck", 100_000, "income", "2025-08-01"))
        .await;
    let id = response.json::<Value>()["data"]["id"].clone();

    // User 2 cannot delete user 1's transaction.
    server
        .delete(&format!("/api/transactions/{id}"))
        .add_header(USER_ID_HEADER, "2")
        .await
        .assert_status(axum::http::StatusCode::NOT_FOUND);

    let listing = server
        .get(endpoints::TRANSACTIONS)
        .add_header(USER_ID_HEADER, "2")
        .await;
    listing.assert_status_ok();
    assert_eq!(
        listing.json::<Value>()["data"]["pagination"]["total"],
        json!(0)
    );
}

#[tokio::test]
async fn transaction_listing_filters_and_paginates() {
    let server = get_test_server();
    enroll(&server, "1").await;

    server
        .post(endpoints::TRANSACTIONS)
        .add_header(USER_ID_HEADER, "1")
        .json(&transaction("Paycheck", 100_000, "income", "2025-08-01"))
        .await
        .assert_status(axum::http::StatusCode::CREATED);
    for (name, date) in [("Coffee", "2025-08-02"), ("Cinema", "2025-08-03")] {
        server
            .post(endpoints::TRANSACTIONS)
            .add_header(USER_ID_HEADER, "1")
            .json(&transaction(name, 1_000, "expense", date))
            .await
            .assert_status(axum::http::StatusCode::CREATED);
    }

    let response = server
        .get(endpoints::TRANSACTIONS)
        .add_query_param("search", "ci")
        .add_header(USER_ID_HEADER, "1")
        .await;

    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["data"]["pagination"]["total"], json!(1));
    assert_eq!(body["data"]["transactions"][0]["name"], json!("Cinema"));

    let page = server
        .get(endpoints::TRANSACTIONS)
        .add_query_param("page", "2")
        .add_query_param("pageSize", "2")
        .add_header(USER_ID_HEADER, "1")
        .await;
    let body = page.json::<Value>();
    assert_eq!(body["data"]["pagination"]["totalPages"], json!(2));
    assert_eq!(
        body["data"]["transactions"].as_array().map(Vec::len),
        Some(1)
    );
}

#[tokio::test]
async fn budget_rollup_reports_spending() {
    let server = get_test_server();
    enroll(&server, "1").await;

    server
        .post(endpoints::BUDGETS)
        .add_header(USER_ID_HEADER, "1")
        .json(&json!({ "categoryId": 1, "maximum": 50_000, "themeId": 1 }))
        .await
        .assert_status(axum::http::StatusCode::CREATED);

    let response = server
        .get(endpoints::BUDGETS)
        .add_header(USER_ID_HEADER, "1")
        .await;

    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["data"][0]["categoryName"], json!("General"));
    assert_eq!(body["data"][0]["totalSpent"], json!(0));
}

#[tokio::test]
async fn recurring_view_deduplicates_series() {
    let server = get_test_server();
    enroll(&server, "1").await;

    server
        .post(endpoints::TRANSACTIONS)
        .add_header(USER_ID_HEADER, "1")
        .json(&transaction("Paycheck", 100_000, "income", "2020-01-01"))
        .await
        .assert_status(axum::http::StatusCode::CREATED);
    for date in ["2020-02-15", "2020-03-15"] {
        let mut bill = transaction("Netflix", 1_500, "expense", date);
        bill["recurring"] = json!(true);
        server
            .post(endpoints::TRANSACTIONS)
            .add_header(USER_ID_HEADER, "1")
            .json(&bill)
            .await
            .assert_status(axum::http::StatusCode::CREATED);
    }

    let response = server
        .get(endpoints::RECURRING)
        .add_header(USER_ID_HEADER, "1")
        .await;

    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["data"]["summary"]["totalCount"], json!(1));
    assert_eq!(body["data"]["summary"]["totalToPay"], json!(1_500));
    assert_eq!(body["data"]["transactions"][0]["date"], json!("2020-03-15"));
    assert_eq!(body["data"]["transactions"][0]["dayOfMonth"], json!(15));
}

#[tokio::test]
async fn validation_errors_are_unprocessable() {
    let server = get_test_server();
    enroll(&server, "1").await;

    let response = server
        .post(endpoints::TRANSACTIONS)
        .add_header(USER_ID_HEADER, "1")
        .json(&transaction("   ", 1_000, "income", "2025-08-01"))
        .await;

    response.assert_status(axum::http::StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        response.json::<Value>()["error"]["reason"],
        json!("validation_error")
    );
}
