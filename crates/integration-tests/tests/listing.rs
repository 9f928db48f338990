//! Integration tests for the app listing and health checks.

use reqwest::StatusCode;
use webapps_gallery_integration_tests::{PASSWORD, TestContext, card_count, location};

// =============================================================================
// Teaser
// =============================================================================

#[tokio::test]
async fn test_anonymous_sees_three_newest_apps() {
    let ctx = TestContext::new().await;
    for name in ["Oldest", "Older", "Middle", "Newer", "Newest"] {
        ctx.backend.add_app(name);
    }

    let response = ctx.get("/").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.unwrap();

    assert_eq!(card_count(&body), 3);
    assert!(body.contains("Newest"));
    assert!(body.contains("Newer"));
    assert!(body.contains("Middle"));
    assert!(!body.contains("Oldest"));
    assert!(body.contains("href=\"/auth?mode=signup\""));
    assert!(!body.contains("href=\"/admin\""));
}

#[tokio::test]
async fn test_teaser_shows_fewer_apps_when_catalog_is_small() {
    let ctx = TestContext::new().await;
    ctx.backend.add_app("Solo");
    ctx.backend.add_app("Duo");

    let body = ctx.page("/").await;
    assert_eq!(card_count(&body), 2);
}

#[tokio::test]
async fn test_empty_catalog() {
    let ctx = TestContext::new().await;

    let body = ctx.page("/").await;
    assert_eq!(card_count(&body), 0);
    assert!(body.contains("No apps yet."));
}

#[tokio::test]
async fn test_cards_open_apps_in_new_tab() {
    let ctx = TestContext::new().await;
    let app = ctx.backend.add_app("Sketchpad");

    let body = ctx.page("/").await;
    assert!(body.contains(&format!("href=\"{}\"", app.link)));
    assert!(body.contains("target=\"_blank\""));
    assert!(body.contains("rel=\"noopener noreferrer\""));
    assert!(body.contains(&format!("src=\"{}\"", app.image)));
}

// =============================================================================
// Full catalog
// =============================================================================

#[tokio::test]
async fn test_approved_user_sees_every_app() {
    let ctx = TestContext::new().await;
    for i in 0..5 {
        ctx.backend.add_app(&format!("App {i}"));
    }
    ctx.backend.add_user("ada@example.com", PASSWORD, true, false);

    let response = ctx.sign_in("ada@example.com").await;
    assert_eq!(location(&response), "/?notice=signed_in");

    let body = ctx.page("/?notice=signed_in").await;
    assert_eq!(card_count(&body), 5);
    assert!(body.contains("5 apps available"));
    assert!(body.contains("Signed in successfully."));
    assert!(body.contains("ada@example.com"));
    // Not an admin
    assert!(!body.contains("href=\"/admin\""));
}

#[tokio::test]
async fn test_admin_sees_admin_link() {
    let ctx = TestContext::new().await;
    ctx.sign_in_admin().await;

    let body = ctx.page("/").await;
    assert!(body.contains("href=\"/admin\""));
}

#[tokio::test]
async fn test_pending_user_is_sent_to_auth() {
    let ctx = TestContext::new().await;
    ctx.backend.add_user("pending@example.com", PASSWORD, false, false);
    ctx.sign_in("pending@example.com").await;

    let response = ctx.get("/").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/auth");
}

#[tokio::test]
async fn test_backend_outage_shows_error_instead_of_apps() {
    let ctx = TestContext::new().await;
    ctx.backend.add_app("Hidden");
    ctx.backend.set_offline(true);

    let response = ctx.get("/").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.unwrap();
    assert_eq!(card_count(&body), 0);
    assert!(body.contains("notice-error"));
}

// =============================================================================
// Health and headers
// =============================================================================

#[tokio::test]
async fn test_health_endpoints() {
    let ctx = TestContext::new().await;

    let response = ctx.get("/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "ok");

    assert_eq!(ctx.get("/health/ready").await.status(), StatusCode::OK);

    ctx.backend.set_offline(true);
    assert_eq!(
        ctx.get("/health/ready").await.status(),
        StatusCode::SERVICE_UNAVAILABLE
    );
    // Liveness does not depend on the backend
    assert_eq!(ctx.get("/health").await.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_security_headers_and_request_id() {
    let ctx = TestContext::new().await;

    let response = ctx.get("/").await;
    let headers = response.headers();
    assert!(headers.contains_key("content-security-policy"));
    assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
    assert!(headers.contains_key("x-request-id"));
}
