//! Integration tests for sign-in, sign-up, approval and sign-out.
//!
//! Credential posts are rate limited (burst of 5 per client), so each test
//! keeps its own sign-in and sign-up posts under that.

use reqwest::StatusCode;
use webapps_gallery_integration_tests::{PASSWORD, TestContext, card_count, location};

// =============================================================================
// Auth page
// =============================================================================

#[tokio::test]
async fn test_auth_page_modes() {
    let ctx = TestContext::new().await;

    let body = ctx.page("/auth").await;
    assert!(body.contains("action=\"/auth/login\""));
    assert!(body.contains("href=\"/auth?mode=signup\""));

    let body = ctx.page("/auth?mode=signup").await;
    assert!(body.contains("action=\"/auth/signup\""));
    assert!(body.contains("Create account"));
}

#[tokio::test]
async fn test_approved_user_is_sent_away_from_auth() {
    let ctx = TestContext::new().await;
    ctx.backend.add_user("ada@example.com", PASSWORD, true, false);
    ctx.sign_in("ada@example.com").await;

    let response = ctx.get("/auth").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
}

// =============================================================================
// Sign-up
// =============================================================================

#[tokio::test]
async fn test_sign_up_creates_pending_account() {
    let ctx = TestContext::new().await;

    let response = ctx
        .post_form(
            "/auth/signup",
            &[("email", " New.User@Example.com "), ("password", PASSWORD)],
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/auth?notice=account_created");

    let profile = ctx.backend.profile_by_email("new.user@example.com").unwrap();
    assert!(!profile.is_approved);
    assert!(!profile.is_admin);

    let body = ctx.page("/auth?notice=account_created").await;
    assert!(body.contains("Awaiting approval"));
    assert!(body.contains("new.user@example.com"));
    assert!(body.contains("Wait for an administrator to approve it."));
    assert!(body.contains("action=\"/auth/refresh\""));
}

#[tokio::test]
async fn test_sign_up_with_existing_email_fails() {
    let ctx = TestContext::new().await;
    ctx.backend.add_user("taken@example.com", PASSWORD, false, false);

    let response = ctx
        .post_form(
            "/auth/signup",
            &[("email", "taken@example.com"), ("password", PASSWORD)],
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = response.text().await.unwrap();
    assert!(body.contains("User already registered"));
    // Form stays in sign-up mode with the email filled in
    assert!(body.contains("action=\"/auth/signup\""));
    assert!(body.contains("value=\"taken@example.com\""));
}

#[tokio::test]
async fn test_sign_up_with_weak_password_shows_backend_message() {
    let ctx = TestContext::new().await;

    let response = ctx
        .post_form(
            "/auth/signup",
            &[("email", "ada@example.com"), ("password", "123")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = response.text().await.unwrap();
    assert!(body.contains("Password should be at least 6 characters."));
    assert!(ctx.backend.profile_by_email("ada@example.com").is_none());
}

#[tokio::test]
async fn test_sign_up_requiring_confirmation() {
    let ctx = TestContext::new().await;
    ctx.backend.set_confirm_email(true);

    let response = ctx
        .post_form(
            "/auth/signup",
            &[("email", "ada@example.com"), ("password", PASSWORD)],
        )
        .await;
    assert_eq!(location(&response), "/auth?notice=confirm_email");

    // No session yet: the sign-in form is shown with the reminder
    let body = ctx.page("/auth?notice=confirm_email").await;
    assert!(body.contains("action=\"/auth/login\""));
    assert!(body.contains("Confirm your email address"));

    let response = ctx.sign_in("ada@example.com").await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.text().await.unwrap().contains("Email not confirmed"));
}

// =============================================================================
// Sign-in
// =============================================================================

#[tokio::test]
async fn test_sign_in_with_wrong_password() {
    let ctx = TestContext::new().await;
    ctx.backend.add_user("ada@example.com", PASSWORD, true, false);

    let response = ctx
        .post_form(
            "/auth/login",
            &[("email", "ada@example.com"), ("password", "wrong-password")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = response.text().await.unwrap();
    assert!(body.contains("Invalid login credentials"));
    assert!(body.contains("value=\"ada@example.com\""));

    // Still anonymous
    let body = ctx.page("/").await;
    assert!(body.contains("href=\"/auth?mode=signup\""));
}

#[tokio::test]
async fn test_sign_in_validates_locally() {
    let ctx = TestContext::new().await;

    let response = ctx
        .post_form("/auth/login", &[("email", "not-an-email"), ("password", PASSWORD)])
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = ctx
        .post_form("/auth/login", &[("email", "ada@example.com"), ("password", "")])
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.text().await.unwrap().contains("Password is required"));
}

#[tokio::test]
async fn test_pending_sign_in_lands_on_pending_screen() {
    let ctx = TestContext::new().await;
    ctx.backend.add_user("pending@example.com", PASSWORD, false, false);

    let response = ctx.sign_in("pending@example.com").await;
    assert_eq!(location(&response), "/auth?notice=signed_in");

    let body = ctx.page("/auth").await;
    assert!(body.contains("Awaiting approval"));
    assert!(body.contains("pending@example.com"));
}

#[tokio::test]
async fn test_unapproved_admin_is_pending() {
    let ctx = TestContext::new().await;
    ctx.backend.add_user("boss@example.com", PASSWORD, false, true);

    let response = ctx.sign_in("boss@example.com").await;
    assert_eq!(location(&response), "/auth?notice=signed_in");

    let body = ctx.page("/auth").await;
    assert!(body.contains("Awaiting approval"));

    let response = ctx.get("/admin").await;
    assert_eq!(location(&response), "/auth");
}

// =============================================================================
// Approval
// =============================================================================

#[tokio::test]
async fn test_status_check_after_approval() {
    let ctx = TestContext::new().await;
    let id = ctx.backend.add_user("pending@example.com", PASSWORD, false, false);
    ctx.sign_in("pending@example.com").await;

    let response = ctx.post_form("/auth/refresh", &[]).await;
    assert_eq!(location(&response), "/auth?notice=still_pending");
    let body = ctx.page("/auth?notice=still_pending").await;
    assert!(body.contains("still awaiting approval"));

    ctx.backend.set_approval(id, true);

    let response = ctx.post_form("/auth/refresh", &[]).await;
    assert_eq!(location(&response), "/?notice=signed_in");
}

#[tokio::test]
async fn test_approval_applies_on_next_page_load() {
    let ctx = TestContext::new().await;
    ctx.backend.add_app("Visible");
    let id = ctx.backend.add_user("pending@example.com", PASSWORD, false, false);
    ctx.sign_in("pending@example.com").await;
    assert_eq!(location(&ctx.get("/").await), "/auth");

    ctx.backend.set_approval(id, true);

    let response = ctx.get("/").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(card_count(&response.text().await.unwrap()), 1);

    // Revoking approval takes effect the same way
    ctx.backend.set_approval(id, false);
    assert_eq!(location(&ctx.get("/").await), "/auth");
}

#[tokio::test]
async fn test_status_check_without_session() {
    let ctx = TestContext::new().await;

    let response = ctx.post_form("/auth/refresh", &[]).await;
    assert_eq!(location(&response), "/auth");
}

// =============================================================================
// Tokens and sign-out
// =============================================================================

#[tokio::test]
async fn test_expired_token_is_refreshed() {
    let ctx = TestContext::new().await;
    ctx.backend.set_token_lifetime(0);
    ctx.backend.add_user("ada@example.com", PASSWORD, true, false);
    ctx.sign_in("ada@example.com").await;

    let response = ctx.get("/").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.text().await.unwrap().contains("ada@example.com"));
    assert!(ctx.backend.refresh_count() >= 1);
}

#[tokio::test]
async fn test_sign_out() {
    let ctx = TestContext::new().await;
    let id = ctx.backend.add_user("ada@example.com", PASSWORD, true, true);
    ctx.sign_in("ada@example.com").await;
    assert_eq!(ctx.backend.active_tokens(id), 1);

    let response = ctx.post_form("/auth/logout", &[]).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/?notice=signed_out");
    assert_eq!(ctx.backend.active_tokens(id), 0);

    let body = ctx.page("/?notice=signed_out").await;
    assert!(body.contains("You have been signed out."));
    assert!(body.contains("href=\"/auth?mode=signup\""));

    assert_eq!(location(&ctx.get("/admin").await), "/auth");
}

#[tokio::test]
async fn test_sessions_are_per_browser() {
    let ctx = TestContext::new().await;
    ctx.backend.add_user("ada@example.com", PASSWORD, true, true);
    ctx.sign_in("ada@example.com").await;

    let other = ctx.new_browser();
    let response = other.get(ctx.url("/admin")).send().await.unwrap();
    assert_eq!(location(&response), "/auth");
}

// =============================================================================
// Backend outages
// =============================================================================

#[tokio::test]
async fn test_outage_during_token_refresh_keeps_session() {
    let ctx = TestContext::new().await;
    ctx.backend.set_token_lifetime(0);
    ctx.backend.add_app("Sketchpad");
    ctx.backend.add_user("ada@example.com", PASSWORD, true, false);
    ctx.sign_in("ada@example.com").await;

    ctx.backend.set_offline(true);
    let response = ctx.get("/").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.unwrap();
    assert!(body.contains("ada@example.com"));
    assert!(body.contains("notice-error"));
    assert!(!body.contains("href=\"/auth?mode=signup\""));

    ctx.backend.set_offline(false);
    let body = ctx.page("/").await;
    assert!(body.contains("ada@example.com"));
    assert!(body.contains("1 app available"));
    assert_eq!(card_count(&body), 1);
    assert!(ctx.backend.refresh_count() >= 1);
}

#[tokio::test]
async fn test_outage_while_signed_in_shows_error() {
    let ctx = TestContext::new().await;
    ctx.backend.add_app("Sketchpad");
    ctx.backend.add_user("ada@example.com", PASSWORD, true, false);
    ctx.sign_in("ada@example.com").await;

    ctx.backend.set_offline(true);
    let response = ctx.get("/").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.unwrap();
    assert!(body.contains("ada@example.com"));
    assert!(body.contains("notice-error"));
    assert_eq!(card_count(&body), 0);
    // Neither the teaser nor the sign-in form
    assert!(!body.contains("Want to see everything?"));
    assert!(!body.contains("action=\"/auth/login\""));
}

#[tokio::test]
async fn test_profile_fetch_failure_uses_last_known_profile() {
    let ctx = TestContext::new().await;
    for i in 0..4 {
        ctx.backend.add_app(&format!("App {i}"));
    }
    ctx.backend.add_user("ada@example.com", PASSWORD, true, false);
    ctx.sign_in("ada@example.com").await;

    ctx.backend.set_table_offline("profiles", true);
    let response = ctx.get("/").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.unwrap();
    assert_eq!(card_count(&body), 4);
    assert!(body.contains("4 apps available"));
}

#[tokio::test]
async fn test_status_check_during_outage_keeps_session() {
    let ctx = TestContext::new().await;
    ctx.backend.add_user("pending@example.com", PASSWORD, false, false);
    ctx.sign_in("pending@example.com").await;

    ctx.backend.set_offline(true);
    let response = ctx.post_form("/auth/refresh", &[]).await;
    assert_eq!(location(&response), "/auth?notice=status_check_failed");

    ctx.backend.set_offline(false);
    let body = ctx.page("/auth").await;
    assert!(body.contains("Awaiting approval"));
    assert!(body.contains("pending@example.com"));
}

#[tokio::test]
async fn test_credential_posts_are_rate_limited() {
    let ctx = TestContext::new().await;

    let mut statuses = Vec::new();
    for _ in 0..6 {
        let response = ctx
            .post_form(
                "/auth/login",
                &[("email", "ada@example.com"), ("password", "guess")],
            )
            .await;
        statuses.push(response.status());
    }

    assert!(statuses.iter().take(5).all(|s| *s == StatusCode::UNPROCESSABLE_ENTITY));
    assert_eq!(statuses.last(), Some(&StatusCode::TOO_MANY_REQUESTS));

    // The form page itself is not limited
    assert_eq!(ctx.get("/auth").await.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_spoofed_forwarding_headers_do_not_bypass_rate_limit() {
    let ctx = TestContext::new().await;

    let mut statuses = Vec::new();
    for i in 0..6 {
        let spoofed = format!("203.0.113.{i}");
        let response = ctx
            .client
            .post(ctx.url("/auth/login"))
            .header("x-forwarded-for", &spoofed)
            .header("x-real-ip", &spoofed)
            .form(&[("email", "ada@example.com"), ("password", "guess")])
            .send()
            .await
            .unwrap();
        statuses.push(response.status());
    }

    assert_eq!(statuses.last(), Some(&StatusCode::TOO_MANY_REQUESTS));
}
