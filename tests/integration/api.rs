//! HTTP API tests through the router, without a listening socket

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use tower::ServiceExt;

use libris_server::{
    api,
    models::{
        enums::Role,
        user::{Actor, UserClaims},
    },
};

use crate::common::{day, Library, SECRET};

fn token(actor: Actor) -> String {
    UserClaims::new(actor.user_id, "tester", actor.role, Utc::now(), 1)
        .create_token(SECRET)
        .unwrap()
}

async fn send(app: &Router, method: &str, uri: &str, actor: Option<Actor>, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(format!("/api/v1{}", uri));
    if let Some(actor) = actor {
        request = request.header(header::AUTHORIZATION, format!("Bearer {}", token(actor)));
    }
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn app(lib: &Library) -> Router {
    Router::new().nest("/api/v1", api::router(lib.state()))
}

#[tokio::test]
async fn health_needs_no_token() {
    let lib = Library::open().await;
    let app = app(&lib);

    let (status, body) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = send(&app, "GET", "/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn missing_or_forged_token_is_rejected() {
    let lib = Library::open().await;
    let app = app(&lib);

    let (status, _) = send(&app, "GET", "/books", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let forged = UserClaims::new(1, "mallory", Role::Admin, Utc::now(), 1)
        .create_token("not-the-secret")
        .unwrap();
    let request = Request::builder()
        .uri("/api/v1/books")
        .header(header::AUTHORIZATION, format!("Bearer {}", forged))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn lending_flow_over_http() {
    let mut lib = Library::open().await;
    let book = lib.book("The Book of the New Sun", 1).await;
    let (_, alice) = lib.member("alice").await;
    let (_, bob) = lib.member("bob").await;
    let desk = Some(lib.librarian);
    let app = app(&lib);

    let (status, issue) = send(&app, "POST", "/issues", Some(alice), Some(json!({ "book_id": book.id }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(issue["status"], "issued");
    assert_eq!(issue["due_date"], "2024-01-15");
    let issue_id = issue["id"].as_i64().unwrap();

    let (status, error) = send(&app, "POST", "/issues", Some(bob), Some(json!({ "book_id": book.id }))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error["error"], "NoCopiesAvailable");

    let (status, reservation) =
        send(&app, "POST", "/reservations", Some(bob), Some(json!({ "book_id": book.id }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(reservation["status"], "active");

    lib.clock.set(day(20).and_hms_opt(12, 0, 0).unwrap().and_utc());
    let (status, outcome) = send(&app, "POST", &format!("/issues/{}/return", issue_id), desk, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["issue"]["status"], "returned");
    let amount: Decimal = outcome["fine"]["amount"].as_str().unwrap().parse().unwrap();
    assert_eq!(amount, dec!(10));
    assert_eq!(outcome["promotion"]["issue"]["user_id"], bob.user_id);

    let (status, error) = send(&app, "POST", &format!("/issues/{}/return", issue_id), desk, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error["error"], "AlreadyReturned");

    let fine_id = outcome["fine"]["id"].as_i64().unwrap();
    let (status, _) = send(&app, "POST", &format!("/fines/{}/pay", fine_id), Some(alice), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, fine) = send(&app, "POST", &format!("/fines/{}/pay", fine_id), desk, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fine["is_paid"], true);
    assert_eq!(fine["paid_date"], "2024-01-20");

    let (status, mine) = send(&app, "GET", "/me/bookings", Some(bob), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine["issues"].as_array().unwrap().len(), 1);
    assert!(mine["reservations"].as_array().unwrap().is_empty());

    let (status, trail) = send(&app, "GET", &format!("/history?issue_id={}", issue_id), desk, None).await;
    assert_eq!(status, StatusCode::OK);
    let actions: Vec<&str> = trail
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["action"].as_str().unwrap())
        .collect();
    assert_eq!(actions, vec!["issued", "overdue", "returned", "fine_paid"]);
}

#[tokio::test]
async fn overdue_sweep_is_staff_only_and_idempotent() {
    let mut lib = Library::open().await;
    let book = lib.book("Lanark", 1).await;
    let (_, alice) = lib.member("alice").await;
    let desk = Some(lib.librarian);
    let app = app(&lib);

    send(&app, "POST", "/issues", Some(alice), Some(json!({ "book_id": book.id }))).await;

    let sweep = json!({ "today": "2024-01-20" });
    let (status, _) = send(&app, "POST", "/issues/overdue-sweep", Some(alice), Some(sweep.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, first) = send(&app, "POST", "/issues/overdue-sweep", desk, Some(sweep.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first.as_array().unwrap().len(), 1);
    assert_eq!(first[0]["status"], "overdue");

    let (_, second) = send(&app, "POST", "/issues/overdue-sweep", desk, Some(sweep)).await;
    assert!(second.as_array().unwrap().is_empty());

    let (_, stats) = send(&app, "GET", "/stats", desk, None).await;
    assert_eq!(stats["overdue_issues"], 1);
    assert_eq!(stats["open_issues"], 1);
}

#[tokio::test]
async fn catalog_and_user_administration() {
    let lib = Library::open().await;
    let admin = Some(lib.admin);
    let desk = Some(lib.librarian);
    let app = app(&lib);

    let (status, _) = send(
        &app,
        "POST",
        "/users",
        desk,
        Some(json!({ "username": "carol", "role": "member" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, carol) = send(
        &app,
        "POST",
        "/users",
        admin,
        Some(json!({ "username": "carol", "email": "carol@example.org" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(carol["role"], "member");

    let (status, error) = send(&app, "POST", "/users", admin, Some(json!({ "username": "carol" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error["error"], "Duplicate");

    let (status, author) = send(&app, "POST", "/authors", desk, Some(json!({ "name": "Alasdair Gray" }))).await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, categories) = send(&app, "GET", "/categories", desk, None).await;
    let category_id = categories[0]["id"].as_i64().unwrap();

    let (status, book) = send(
        &app,
        "POST",
        "/books",
        desk,
        Some(json!({
            "isbn": "9780862415327",
            "title": "Poor Things",
            "category_id": category_id,
            "author_ids": [author["id"]],
            "total_copies": 2
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(book["available_copies"], 2);

    let (status, error) = send(
        &app,
        "POST",
        "/books",
        desk,
        Some(json!({ "isbn": "12", "title": "", "category_id": category_id, "total_copies": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"], "BadValue");

    let (status, found) = send(&app, "GET", "/books?title=poor&available=true", desk, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found.as_array().unwrap().len(), 1);

    let (status, _) = send(&app, "GET", "/books/999", desk, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
