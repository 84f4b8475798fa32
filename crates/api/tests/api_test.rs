//! End-to-end tests driving the router against an in-memory database.

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header::CONTENT_TYPE},
};
use coinpurse_api::{AppState, create_router};
use coinpurse_db::migration::{Migrator, MigratorTrait};
use http_body_util::BodyExt;
use sea_orm::{ConnectOptions, Database};
use serde_json::{Value, json};
use tower::ServiceExt;

const BOUNDARY: &str = "coinpurse-test-boundary";

async fn test_app() -> Router {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(options).await.expect("in-memory database");
    Migrator::up(&db, None).await.expect("migrations");
    create_router(AppState::new(db))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(
        app,
        Request::builder().uri(uri).body(Body::empty()).unwrap(),
    )
    .await
}

async fn with_json(app: &Router, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
    send(
        app,
        Request::builder()
            .method(method)
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
}

async fn delete(app: &Router, uri: &str) -> StatusCode {
    send(
        app,
        Request::builder()
            .method("DELETE")
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .0
}

async fn upload(app: &Router, uri: &str, file_name: &str, contents: &str) -> (StatusCode, Value) {
    let body = format!(
        "--{BOUNDARY}\r\n\
Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
Content-Type: application/octet-stream\r\n\r\n\
{contents}\r\n\
--{BOUNDARY}--\r\n"
    );
    send(
        app,
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap(),
    )
    .await
}

async fn create_account(app: &Router, currency: &str, balance: &str) -> i64 {
    let (status, body) = with_json(
        app,
        "POST",
        "/api/v1/accounts",
        json!({"name": format!("{currency} account"), "currency": currency, "balance": balance}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["id"].as_i64().unwrap()
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_health() {
    let app = test_app().await;
    let (status, body) = get(&app, "/api/v1/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "up");
}

// ============================================================================
// Transactions
// ============================================================================

#[tokio::test]
async fn test_transaction_lifecycle_moves_balance() {
    let app = test_app().await;
    let account_id = create_account(&app, "USD", "1000.00").await;

    let (status, created) = with_json(
        &app,
        "POST",
        "/api/v1/transactions",
        json!({"account_id": account_id, "amount": "-150.00", "transaction_date": "2024-06-01"}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    assert_eq!(created["currency"], "USD");
    let transaction_uri = format!("/api/v1/transactions/{}", created["id"]);
    let account_uri = format!("/api/v1/accounts/{account_id}");

    let (_, account) = get(&app, &account_uri).await;
    assert_eq!(account["balance"], "850.00");

    let (status, updated) =
        with_json(&app, "PATCH", &transaction_uri, json!({"amount": -200})).await;
    assert_eq!(status, StatusCode::OK, "{updated}");
    assert_eq!(updated["amount"], "-200.00");
    let (_, account) = get(&app, &account_uri).await;
    assert_eq!(account["balance"], "800.00");

    assert_eq!(delete(&app, &transaction_uri).await, StatusCode::NO_CONTENT);
    let (_, account) = get(&app, &account_uri).await;
    assert_eq!(account["balance"], "1000.00");

    let (status, body) = get(&app, &transaction_uri).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NOT_FOUND");
}

#[tokio::test]
async fn test_amount_with_three_decimals_is_rejected() {
    let app = test_app().await;
    let account_id = create_account(&app, "USD", "10").await;

    let (status, body) = with_json(
        &app,
        "POST",
        "/api/v1/transactions",
        json!({"account_id": account_id, "amount": "1.234"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_transaction_on_unknown_account_is_not_found() {
    let app = test_app().await;
    let (status, body) = with_json(
        &app,
        "POST",
        "/api/v1/transactions",
        json!({"account_id": 77, "amount": "5.00"}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "ACCOUNT_NOT_FOUND");
    assert_eq!(body["message"], "Account 77 not found");
}

// ============================================================================
// Transfers and rates
// ============================================================================

#[tokio::test]
async fn test_cross_currency_transfer_with_imported_rate() {
    let app = test_app().await;
    let (status, body) = upload(
        &app,
        "/api/v1/currency-rates/import/csv",
        "rates.csv",
        "currency_from,rate_to_usd,effective_from,effective_to\nEUR,1.08,2024-01-01T00:00:00Z,",
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["imported"], 1);

    let eur = create_account(&app, "EUR", "500").await;
    let usd = create_account(&app, "USD", "0").await;

    let (status, transfer) = with_json(
        &app,
        "POST",
        "/api/v1/transfers",
        json!({"from_account_id": eur, "to_account_id": usd, "from_amount": "100"}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{transfer}");
    assert_eq!(transfer["to_amount"], "108.00");
    assert_eq!(transfer["exchange_rate"], "1.08");

    let (_, account) = get(&app, &format!("/api/v1/accounts/{eur}")).await;
    assert_eq!(account["balance"], "400.00");
    assert_eq!(account["default_currency"], "USD");
    assert_eq!(account["balance_in_default_currency"], "432.00");

    let transfer_uri = format!("/api/v1/transfers/{}", transfer["id"]);
    assert_eq!(delete(&app, &transfer_uri).await, StatusCode::NO_CONTENT);
    let (_, account) = get(&app, &format!("/api/v1/accounts/{usd}")).await;
    assert_eq!(account["balance"], "0.00");
}

#[tokio::test]
async fn test_insufficient_funds_is_reported_with_its_code() {
    let app = test_app().await;
    let a = create_account(&app, "USD", "50").await;
    let b = create_account(&app, "USD", "0").await;

    let (status, body) = with_json(
        &app,
        "POST",
        "/api/v1/transfers",
        json!({"from_account_id": a, "to_account_id": b, "from_amount": "100.00"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INSUFFICIENT_FUNDS");

    let (_, account) = get(&app, &format!("/api/v1/accounts/{a}")).await;
    assert_eq!(account["balance"], "50.00");
}

#[tokio::test]
async fn test_convert_and_current_rates() {
    let app = test_app().await;
    let (status, _) = upload(
        &app,
        "/api/v1/currency-rates/import/json",
        "rates.json",
        r#"{"rates": [{"currency_from": "EUR", "rate_to_usd": 1.08, "effective_from": "2024-01-01"}]}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = get(&app, "/api/v1/currency-rates/convert?amount=1000&from=EUR&to=USD").await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["converted_amount"], "1080");

    let (status, body) = get(&app, "/api/v1/currency-rates/convert?amount=10&from=EUR&to=GBP").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "EXCHANGE_RATE_NOT_FOUND");

    let (_, body) = get(&app, "/api/v1/currency-rates/current").await;
    assert_eq!(body["rates"]["USD"], "1");
    assert_eq!(body["rates"]["EUR"], "1.08");
}

#[tokio::test]
async fn test_import_rejects_wrong_extension_and_bad_rows() {
    let app = test_app().await;

    let (status, _) = upload(
        &app,
        "/api/v1/currency-rates/import/csv",
        "rates.txt",
        "currency_from,rate_to_usd,effective_from\nEUR,1.08,2024-01-01",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = upload(
        &app,
        "/api/v1/currency-rates/import/csv",
        "rates.csv",
        "currency_from,rate_to_usd,effective_from\nEUR,1.08,2024-01-01\nGBP,abc,2024-01-01",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");

    let (_, body) = get(&app, "/api/v1/currency-rates").await;
    assert_eq!(body["total"], 0, "a bad row aborts the whole import");
}

// ============================================================================
// Accounts, categories, settings
// ============================================================================

#[tokio::test]
async fn test_account_list_is_paginated() {
    let app = test_app().await;
    for _ in 0..3 {
        create_account(&app, "USD", "1").await;
    }

    let (status, body) = get(&app, "/api/v1/accounts?skip=2&limit=2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);
    assert_eq!(body["page"], 2);
    assert_eq!(body["size"], 2);
    assert_eq!(body["pages"], 2);
    assert_eq!(body["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_negative_opening_balance_is_rejected() {
    let app = test_app().await;
    let (status, _) = with_json(
        &app,
        "POST",
        "/api/v1/accounts",
        json!({"name": "Card", "currency": "USD", "balance": "-1.00"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_negative_balance_correction_is_rejected() {
    let app = test_app().await;
    let account_id = create_account(&app, "USD", "25").await;
    let account_uri = format!("/api/v1/accounts/{account_id}");

    let (status, body) = with_json(&app, "PATCH", &account_uri, json!({"balance": "-0.01"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");

    let (_, account) = get(&app, &account_uri).await;
    assert_eq!(account["balance"], "25.00");

    let (status, account) = with_json(&app, "PATCH", &account_uri, json!({"balance": "0"})).await;
    assert_eq!(status, StatusCode::OK, "{account}");
    assert_eq!(account["balance"], "0.00");
}

#[tokio::test]
async fn test_category_depth_and_delete_conflict() {
    let app = test_app().await;
    let (_, food) = with_json(&app, "POST", "/api/v1/categories", json!({"name": "Food"})).await;
    let (status, groceries) = with_json(
        &app,
        "POST",
        "/api/v1/categories",
        json!({"name": "Groceries", "parent_id": food["id"]}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = with_json(
        &app,
        "POST",
        "/api/v1/categories",
        json!({"name": "Produce", "parent_id": groceries["id"]}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let status = delete(&app, &format!("/api/v1/categories/{}", food["id"])).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_category_hierarchy_nests_children() {
    let app = test_app().await;
    let (_, food) = with_json(&app, "POST", "/api/v1/categories", json!({"name": "Food"})).await;
    let (_, salary) = with_json(
        &app,
        "POST",
        "/api/v1/categories",
        json!({"name": "Salary", "kind": "income"}),
    )
    .await;
    let (_, groceries) = with_json(
        &app,
        "POST",
        "/api/v1/categories",
        json!({"name": "Groceries", "parent_id": food["id"]}),
    )
    .await;
    assert_eq!(groceries["kind"], "expense");

    let (status, body) = with_json(
        &app,
        "POST",
        "/api/v1/categories",
        json!({"name": "Bonus", "parent_id": food["id"], "kind": "income"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    let (status, tree) = get(&app, "/api/v1/categories/hierarchy").await;
    assert_eq!(status, StatusCode::OK, "{tree}");
    let roots = tree.as_array().unwrap();
    assert_eq!(roots.len(), 2);
    assert_eq!(roots[0]["id"], food["id"]);
    assert_eq!(roots[0]["children"][0]["id"], groceries["id"]);
    assert_eq!(roots[1]["id"], salary["id"]);
    assert_eq!(roots[1]["kind"], "income");
    assert_eq!(roots[1]["children"], json!([]));
}

// ============================================================================
// Budgets
// ============================================================================

#[tokio::test]
async fn test_budget_tracks_category_spending() {
    let app = test_app().await;
    let account_id = create_account(&app, "USD", "1000.00").await;
    let (_, food) = with_json(&app, "POST", "/api/v1/categories", json!({"name": "Food"})).await;
    let (_, groceries) = with_json(
        &app,
        "POST",
        "/api/v1/categories",
        json!({"name": "Groceries", "parent_id": food["id"]}),
    )
    .await;
    for (amount, category, date) in [
        ("-40.00", &food, "2026-03-02"),
        ("-25.50", &groceries, "2026-03-31"),
        ("-99.00", &food, "2026-04-01"),
        ("15.00", &food, "2026-03-10"),
    ] {
        let (status, body) = with_json(
            &app,
            "POST",
            "/api/v1/transactions",
            json!({
                "account_id": account_id,
                "amount": amount,
                "category_id": category["id"],
                "transaction_date": date,
            }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
    }

    let (status, budget) = with_json(
        &app,
        "POST",
        "/api/v1/budgets",
        json!({"budget_year": 2026, "budget_month": 3, "category_id": food["id"], "planned_amount": "100"}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{budget}");
    assert_eq!(budget["currency"], "USD");
    assert_eq!(budget["planned_amount"], "100.00");
    assert_eq!(budget["actual_amount"], "65.50");
    assert_eq!(budget["variance"], "34.50");
    assert_eq!(budget["status"], "favorable");

    let (status, body) = with_json(
        &app,
        "POST",
        "/api/v1/budgets",
        json!({"budget_year": 2026, "budget_month": 3, "category_id": food["id"], "planned_amount": "50"}),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "BUDGET_ALREADY_EXISTS");

    let (status, list) = get(&app, "/api/v1/budgets?year=2026&month=3").await;
    assert_eq!(status, StatusCode::OK, "{list}");
    assert_eq!(list["total"], 1);
    assert_eq!(list["summary"]["total_planned"], "100.00");
    assert_eq!(list["summary"]["expense_actual"], "65.50");
    assert_eq!(list["summary"]["income_actual"], "0.00");

    let budget_uri = format!("/api/v1/budgets/{}", budget["id"]);
    let (status, updated) =
        with_json(&app, "PATCH", &budget_uri, json!({"planned_amount": "60"})).await;
    assert_eq!(status, StatusCode::OK, "{updated}");
    assert_eq!(updated["status"], "unfavorable");

    assert_eq!(delete(&app, &budget_uri).await, StatusCode::NO_CONTENT);
    let (status, _) = get(&app, &budget_uri).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_budget_rules_report_their_codes() {
    let app = test_app().await;
    let (_, food) = with_json(&app, "POST", "/api/v1/categories", json!({"name": "Food"})).await;

    let (status, body) = with_json(
        &app,
        "POST",
        "/api/v1/budgets",
        json!({"budget_year": 2026, "budget_month": 13, "category_id": food["id"], "planned_amount": "10"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INVALID_BUDGET_PERIOD");

    let (status, body) = with_json(
        &app,
        "POST",
        "/api/v1/budgets",
        json!({"budget_year": 2026, "budget_month": 3, "category_id": food["id"], "planned_amount": "-10"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "NEGATIVE_PLANNED_AMOUNT");

    let (status, _) = with_json(
        &app,
        "POST",
        "/api/v1/budgets",
        json!({"budget_year": 2026, "budget_month": 3, "category_id": 999, "planned_amount": "10"}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_budget_without_rate_reports_unavailable_actuals() {
    let app = test_app().await;
    let account_id = create_account(&app, "GBP", "500.00").await;
    let (_, food) = with_json(&app, "POST", "/api/v1/categories", json!({"name": "Food"})).await;
    let (status, body) = with_json(
        &app,
        "POST",
        "/api/v1/transactions",
        json!({
            "account_id": account_id,
            "amount": "-20.00",
            "category_id": food["id"],
            "transaction_date": "2026-03-05",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let (status, budget) = with_json(
        &app,
        "POST",
        "/api/v1/budgets",
        json!({"budget_year": 2026, "budget_month": 3, "category_id": food["id"], "planned_amount": "100"}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{budget}");
    assert_eq!(budget["actual_amount"], Value::Null);
    assert_eq!(budget["status"], Value::Null);
    assert_eq!(budget["unconverted_currencies"], json!(["GBP"]));

    let (status, list) = get(&app, "/api/v1/budgets?year=2026&month=3").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["summary"]["total_planned"], "100.00");
    assert_eq!(list["summary"]["total_actual"], Value::Null);
}

#[tokio::test]
async fn test_settings_default_currency() {
    let app = test_app().await;
    let (status, body) = get(&app, "/api/v1/settings").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["default_currency"], "USD");

    let (status, body) =
        with_json(&app, "PATCH", "/api/v1/settings", json!({"default_currency": "eur"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["default_currency"], "EUR");

    let (status, _) =
        with_json(&app, "PATCH", "/api/v1/settings", json!({"default_currency": "EURO"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
