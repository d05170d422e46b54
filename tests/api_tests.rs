//! API integration tests
//!
//! These tests drive a running server with the default configuration and a
//! freshly migrated database. Run with: cargo test -- --ignored

use reqwest::Client;
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080/api/v1";

/// Log in as the bootstrap admin and return a bearer token
async fn admin_token(client: &Client) -> String {
    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "email": "admin@athenaeum.local",
            "password": "admin"
        }))
        .send()
        .await
        .expect("Failed to send login request");

    let body: Value = response.json().await.expect("Failed to parse login response");
    body["token"].as_str().expect("No token in response").to_string()
}

/// Register a student and return (token, member_id)
async fn register_student(client: &Client, email: &str) -> (String, i64) {
    let response = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&json!({
            "name": "Test Student",
            "email": email,
            "password": "secret123"
        }))
        .send()
        .await
        .expect("Failed to send register request");
    assert_eq!(response.status(), 201);

    let member: Value = response.json().await.expect("Failed to parse register response");
    let member_id = member["id"].as_i64().expect("No member id");

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({ "email": email, "password": "secret123" }))
        .send()
        .await
        .expect("Failed to send login request");
    let body: Value = response.json().await.expect("Failed to parse login response");
    let token = body["token"].as_str().expect("No token").to_string();

    (token, member_id)
}

/// Create a book and return its id
async fn create_book(client: &Client, token: &str, title: &str, quantity: i32) -> i64 {
    let response = client
        .post(format!("{}/books", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({
            "title": title,
            "author": "Test Author",
            "quantity": quantity
        }))
        .send()
        .await
        .expect("Failed to send create book request");
    assert_eq!(response.status(), 201);

    let book: Value = response.json().await.expect("Failed to parse book response");
    assert_eq!(book["available"], book["quantity"]);
    book["id"].as_i64().expect("No book id")
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_login_invalid_credentials() {
    let client = Client::new();

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "email": "admin@athenaeum.local",
            "password": "wrong"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_request_approve_return_cycle() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let (student, _member_id) = register_student(&client, "cycle@test.local").await;

    let book_id = create_book(&client, &admin, "Workflow Cycle Book", 1).await;

    // Student requests the book
    let response = client
        .post(format!("{}/loans/requests", BASE_URL))
        .header("Authorization", format!("Bearer {}", student))
        .json(&json!({ "book_id": book_id }))
        .send()
        .await
        .expect("Failed to submit request");
    assert_eq!(response.status(), 201);
    let loan: Value = response.json().await.unwrap();
    let loan_id = loan["id"].as_i64().unwrap();
    assert_eq!(loan["status"], "pending");

    // A pending request does not touch stock
    let response = client
        .get(format!("{}/books/{}", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", admin))
        .send()
        .await
        .unwrap();
    let book: Value = response.json().await.unwrap();
    assert_eq!(book["available"], 1);

    // Admin approves: loan issued, stock -1, due date set
    let response = client
        .post(format!("{}/loans/requests/{}/approve", BASE_URL, loan_id))
        .header("Authorization", format!("Bearer {}", admin))
        .json(&json!({ "notes": "desk pickup" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let loan: Value = response.json().await.unwrap();
    assert_eq!(loan["status"], "issued");
    assert!(loan["issued_at"].is_string());
    assert!(loan["due_at"].is_string());

    let response = client
        .get(format!("{}/books/{}", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", admin))
        .send()
        .await
        .unwrap();
    let book: Value = response.json().await.unwrap();
    assert_eq!(book["available"], 0);

    // Second approve attempt fails: wrong state
    let response = client
        .post(format!("{}/loans/requests/{}/approve", BASE_URL, loan_id))
        .header("Authorization", format!("Bearer {}", admin))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 422);

    // Return: fine 0 (on time), stock back
    let response = client
        .post(format!("{}/loans/{}/return", BASE_URL, loan_id))
        .header("Authorization", format!("Bearer {}", admin))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let loan: Value = response.json().await.unwrap();
    assert_eq!(loan["status"], "returned");
    let fine: f64 = loan["fine"].as_str().expect("No fine recorded").parse().unwrap();
    assert_eq!(fine, 0.0);

    let response = client
        .get(format!("{}/books/{}", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", admin))
        .send()
        .await
        .unwrap();
    let book: Value = response.json().await.unwrap();
    assert_eq!(book["available"], 1);

    // Double return fails
    let response = client
        .post(format!("{}/loans/{}/return", BASE_URL, loan_id))
        .header("Authorization", format!("Bearer {}", admin))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 422);
}

#[tokio::test]
#[ignore]
async fn test_exhausted_stock_rejects_issue() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let (_s1, member1) = register_student(&client, "stock1@test.local").await;
    let (_s2, member2) = register_student(&client, "stock2@test.local").await;

    let book_id = create_book(&client, &admin, "Single Copy Book", 1).await;

    // First member takes the only copy
    let response = client
        .post(format!("{}/loans/issue", BASE_URL))
        .header("Authorization", format!("Bearer {}", admin))
        .json(&json!({ "member_id": member1, "book_id": book_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);

    // Second member is refused: no copies left
    let response = client
        .post(format!("{}/loans/issue", BASE_URL))
        .header("Authorization", format!("Bearer {}", admin))
        .json(&json!({ "member_id": member2, "book_id": book_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 422);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "BookNotAvailable");

    // Stock unchanged by the failed attempt
    let response = client
        .get(format!("{}/books/{}", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", admin))
        .send()
        .await
        .unwrap();
    let book: Value = response.json().await.unwrap();
    assert_eq!(book["available"], 0);
}

#[tokio::test]
#[ignore]
async fn test_loan_limit_reached() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let (_token, member_id) = register_student(&client, "limit@test.local").await;

    // Default policy: max 3 issued books per member
    for i in 0..3 {
        let book_id = create_book(&client, &admin, &format!("Limit Book {}", i), 1).await;
        let response = client
            .post(format!("{}/loans/issue", BASE_URL))
            .header("Authorization", format!("Bearer {}", admin))
            .json(&json!({ "member_id": member_id, "book_id": book_id }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 201);
    }

    let book_id = create_book(&client, &admin, "One Book Too Many", 1).await;
    let response = client
        .post(format!("{}/loans/issue", BASE_URL))
        .header("Authorization", format!("Bearer {}", admin))
        .json(&json!({ "member_id": member_id, "book_id": book_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 422);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "MaxLoansReached");
}

#[tokio::test]
#[ignore]
async fn test_duplicate_loan_rejected() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let (_token, member_id) = register_student(&client, "duplicate@test.local").await;

    let book_id = create_book(&client, &admin, "Duplicate Book", 5).await;

    let response = client
        .post(format!("{}/loans/issue", BASE_URL))
        .header("Authorization", format!("Bearer {}", admin))
        .json(&json!({ "member_id": member_id, "book_id": book_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);

    // Same member, same book: refused even though copies remain
    let response = client
        .post(format!("{}/loans/issue", BASE_URL))
        .header("Authorization", format!("Bearer {}", admin))
        .json(&json!({ "member_id": member_id, "book_id": book_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 422);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "DuplicateLoan");
}

#[tokio::test]
#[ignore]
async fn test_reject_requires_reason() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let (student, _member_id) = register_student(&client, "reject@test.local").await;

    let book_id = create_book(&client, &admin, "Rejected Book", 1).await;

    let response = client
        .post(format!("{}/loans/requests", BASE_URL))
        .header("Authorization", format!("Bearer {}", student))
        .json(&json!({ "book_id": book_id }))
        .send()
        .await
        .unwrap();
    let loan: Value = response.json().await.unwrap();
    let loan_id = loan["id"].as_i64().unwrap();

    // Empty reason fails validation, loan stays pending
    let response = client
        .post(format!("{}/loans/requests/{}/reject", BASE_URL, loan_id))
        .header("Authorization", format!("Bearer {}", admin))
        .json(&json!({ "reason": "   " }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    // With a reason it goes through
    let response = client
        .post(format!("{}/loans/requests/{}/reject", BASE_URL, loan_id))
        .header("Authorization", format!("Bearer {}", admin))
        .json(&json!({ "reason": "title reserved for course work" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let loan: Value = response.json().await.unwrap();
    assert_eq!(loan["status"], "rejected");

    // Rejection never touches stock
    let response = client
        .get(format!("{}/books/{}", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", admin))
        .send()
        .await
        .unwrap();
    let book: Value = response.json().await.unwrap();
    assert_eq!(book["available"], 1);
}

#[tokio::test]
#[ignore]
async fn test_cancel_only_while_pending() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let (student, _member_id) = register_student(&client, "cancel@test.local").await;

    let book_id = create_book(&client, &admin, "Cancelled Book", 1).await;

    let response = client
        .post(format!("{}/loans/requests", BASE_URL))
        .header("Authorization", format!("Bearer {}", student))
        .json(&json!({ "book_id": book_id }))
        .send()
        .await
        .unwrap();
    let loan: Value = response.json().await.unwrap();
    let loan_id = loan["id"].as_i64().unwrap();

    // Approve first, then try to cancel: wrong state
    let response = client
        .post(format!("{}/loans/requests/{}/approve", BASE_URL, loan_id))
        .header("Authorization", format!("Bearer {}", admin))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let response = client
        .post(format!("{}/loans/requests/{}/cancel", BASE_URL, loan_id))
        .header("Authorization", format!("Bearer {}", student))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 422);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "WrongLoanState");
}

#[tokio::test]
#[ignore]
async fn test_student_cannot_administer() {
    let client = Client::new();
    let (student, member_id) = register_student(&client, "norights@test.local").await;

    let response = client
        .post(format!("{}/books", BASE_URL))
        .header("Authorization", format!("Bearer {}", student))
        .json(&json!({ "title": "Nope", "author": "Nope", "quantity": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);

    let response = client
        .get(format!("{}/stats", BASE_URL))
        .header("Authorization", format!("Bearer {}", student))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);

    // But they may read their own loans
    let response = client
        .get(format!("{}/members/{}/loans", BASE_URL, member_id))
        .header("Authorization", format!("Bearer {}", student))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
#[ignore]
async fn test_policy_settings_roundtrip() {
    let client = Client::new();
    let admin = admin_token(&client).await;

    let response = client
        .get(format!("{}/settings", BASE_URL))
        .header("Authorization", format!("Bearer {}", admin))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let body: Value = response.json().await.unwrap();
    assert!(body["effective"]["max_books_per_member"].is_number());

    // Negative fine is refused
    let response = client
        .put(format!("{}/settings", BASE_URL))
        .header("Authorization", format!("Bearer {}", admin))
        .json(&json!({ "fine_per_day": "-1.00" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}
