/// Integration tests for the Huddle API
///
/// These tests drive the full router against an in-memory store:
/// - Bearer authentication (missing, invalid, expired)
/// - Registration and login
/// - Follow / unfollow and RSVP through HTTP, including error codes
/// - Privacy filtering on profiles and guest lists
/// - Activity recording and email verification

mod common;

use axum::http::{header, Method, StatusCode};
use chrono::{Duration, Utc};
use common::{TestContext, JWT_SECRET};
use huddle_shared::{
    auth::{
        jwt::{create_token, issue_token, Claims, TokenType},
        verification::{pending_for, MAX_CODE_ATTEMPTS},
    },
    models::user::{UpdateUser, UserLocation},
    store::Store,
};
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn test_health_is_public() {
    let ctx = TestContext::new();

    let res = ctx.request(Method::GET, "/health", None, None).await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["status"], "healthy");
    assert_eq!(res.body["database"], "connected");
    assert_eq!(res.body["version"], huddle_shared::VERSION);
}

#[tokio::test]
async fn test_missing_bearer_is_401() {
    let ctx = TestContext::new();

    let res = ctx.request(Method::GET, "/v1/me", None, None).await;

    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body["error"], "unauthorized");
}

#[tokio::test]
async fn test_invalid_bearer_is_403() {
    let ctx = TestContext::new();

    let res = ctx.get("/v1/me", "not.a.jwt").await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(res.body["error"], "invalid_token");

    let user = ctx.user("ada@example.com").await;
    let foreign = issue_token(
        user.id,
        TokenType::Access,
        "some-other-secret-that-is-32-bytes-long",
    )
    .unwrap();
    let res = ctx.get("/v1/me", &foreign).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(res.body["error"], "invalid_token");
}

#[tokio::test]
async fn test_expired_bearer_is_403_token_expired() {
    let ctx = TestContext::new();
    let user = ctx.user("ada@example.com").await;

    let claims = Claims::with_expiration(user.id, TokenType::Access, Duration::seconds(-60));
    let expired = create_token(&claims, JWT_SECRET).unwrap();

    let res = ctx.get("/v1/me", &expired).await;

    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(res.body["error"], "token_expired");
}

#[tokio::test]
async fn test_refresh_token_is_not_an_access_token() {
    let ctx = TestContext::new();
    let user = ctx.user("ada@example.com").await;
    let refresh = issue_token(user.id, TokenType::Refresh, JWT_SECRET).unwrap();

    let res = ctx.get("/v1/me", &refresh).await;

    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(res.body["error"], "invalid_token");
}

#[tokio::test]
async fn test_register_then_login() {
    let ctx = TestContext::new();
    let credentials = json!({ "email": "ada@example.com", "password": "SecureP@ss123" });

    let res = ctx
        .request(Method::POST, "/v1/auth/register", None, Some(credentials.clone()))
        .await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["user"]["email"], "ada@example.com");
    assert_eq!(res.body["user"]["email_verified"], false);
    assert!(res.body["user"].get("password_hash").is_none());
    let access = res.body["access_token"].as_str().unwrap().to_string();

    let me = ctx.get("/v1/me", &access).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["email"], "ada@example.com");

    let res = ctx
        .request(Method::POST, "/v1/auth/login", None, Some(credentials.clone()))
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert!(res.body["user"]["last_login_at"].is_string());

    let refresh = res.body["refresh_token"].as_str().unwrap();
    let res = ctx
        .request(
            Method::POST,
            "/v1/auth/refresh",
            None,
            Some(json!({ "refresh_token": refresh })),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert!(res.body["access_token"].is_string());

    let res = ctx
        .request(Method::POST, "/v1/auth/register", None, Some(credentials))
        .await;
    assert_eq!(res.status, StatusCode::CONFLICT);
    assert_eq!(res.body["error"], "conflict");
}

#[tokio::test]
async fn test_login_with_wrong_password_is_401() {
    let ctx = TestContext::new();
    ctx.request(
        Method::POST,
        "/v1/auth/register",
        None,
        Some(json!({ "email": "ada@example.com", "password": "SecureP@ss123" })),
    )
    .await;

    let res = ctx
        .request(
            Method::POST,
            "/v1/auth/login",
            None,
            Some(json!({ "email": "ada@example.com", "password": "WrongP@ss123" })),
        )
        .await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    let res = ctx
        .request(
            Method::POST,
            "/v1/auth/login",
            None,
            Some(json!({ "email": "nobody@example.com", "password": "WrongP@ss123" })),
        )
        .await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_rejects_weak_password() {
    let ctx = TestContext::new();

    let res = ctx
        .request(
            Method::POST,
            "/v1/auth/register",
            None,
            Some(json!({ "email": "ada@example.com", "password": "password" })),
        )
        .await;

    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(res.body["error"], "validation_error");
    assert_eq!(res.body["details"][0]["field"], "password");
}

#[tokio::test]
async fn test_malformed_json_body_is_400() {
    let ctx = TestContext::new();

    let res = ctx
        .request(
            Method::POST,
            "/v1/auth/login",
            None,
            Some(json!({ "email": "ada@example.com" })),
        )
        .await;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["error"], "bad_request");
}

#[tokio::test]
async fn test_follow_unfollow_round_trip() {
    let ctx = TestContext::new();
    let ada = ctx.user("ada@example.com").await;
    let bob = ctx.user("bob@example.com").await;
    let token = ctx.token(&ada);

    let res = ctx.post(&format!("/v1/users/{}/follow", bob.id), &token, json!({})).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["changed"], true);

    let res = ctx.get(&format!("/v1/users/{}", bob.id), &token).await;
    assert_eq!(res.body["is_following"], true);
    assert_eq!(res.body["followers"], 1);

    let res = ctx.get("/v1/profile/following", &token).await;
    assert_eq!(res.body.as_array().unwrap().len(), 1);
    assert_eq!(res.body[0]["id"], bob.id.to_string());

    let res = ctx.get("/v1/profile/followers", &ctx.token(&bob)).await;
    assert_eq!(res.body[0]["id"], ada.id.to_string());

    let res = ctx.post(&format!("/v1/users/{}/follow", bob.id), &token, json!({})).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["changed"], false);

    let res = ctx.post(&format!("/v1/users/{}/unfollow", bob.id), &token, json!({})).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["changed"], true);

    let res = ctx.post(&format!("/v1/users/{}/unfollow", bob.id), &token, json!({})).await;
    assert_eq!(res.body["changed"], false);

    let ada = ctx.store.find_user(ada.id).await.unwrap().unwrap();
    let bob = ctx.store.find_user(bob.id).await.unwrap().unwrap();
    assert!(ada.following.is_empty());
    assert!(bob.followers.is_empty());
}

#[tokio::test]
async fn test_follow_errors() {
    let ctx = TestContext::new();
    let ada = ctx.user("ada@example.com").await;
    let token = ctx.token(&ada);

    let res = ctx.post(&format!("/v1/users/{}/follow", ada.id), &token, json!({})).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["error"], "self_relation");

    let res = ctx.post(&format!("/v1/users/{}/unfollow", ada.id), &token, json!({})).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["error"], "self_relation");

    let res = ctx
        .post(&format!("/v1/users/{}/follow", Uuid::new_v4()), &token, json!({}))
        .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.body["error"], "not_found");

    let res = ctx.post("/v1/users/not-a-uuid/follow", &token, json!({})).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["error"], "bad_request");
}

#[tokio::test]
async fn test_rsvp_twice_is_duplicate_relation() {
    let ctx = TestContext::new();
    let ada = ctx.user("ada@example.com").await;
    let event = ctx.event(&ada, "Rooftop Jazz").await;
    let token = ctx.token(&ada);
    let uri = format!("/v1/events/{}/rsvp", event.id);

    let res = ctx.post(&uri, &token, json!({})).await;
    assert_eq!(res.status, StatusCode::OK);

    let res = ctx.post(&uri, &token, json!({})).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["error"], "duplicate_relation");

    let res = ctx.get(&format!("/v1/events/{}", event.id), &token).await;
    assert_eq!(res.body["attendee_count"], 1);
    assert_eq!(res.body["has_rsvped"], true);

    let res = ctx.get("/v1/profile/attending", &token).await;
    assert_eq!(res.body.as_array().unwrap().len(), 1);
    assert_eq!(res.body[0]["id"], event.id.to_string());

    let res = ctx.post(&format!("/v1/events/{}/rsvp", Uuid::new_v4()), &token, json!({})).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_activities_recorded_after_follow_and_rsvp() {
    let ctx = TestContext::new();
    let ada = ctx.user("ada@example.com").await;
    let bob = ctx.user("bob@example.com").await;
    let event = ctx.event(&bob, "Rooftop Jazz").await;
    let token = ctx.token(&ada);

    ctx.post(&format!("/v1/users/{}/follow", bob.id), &token, json!({})).await;
    ctx.post(&format!("/v1/events/{}/rsvp", event.id), &token, json!({})).await;

    let res = ctx
        .get(&format!("/v1/activities?user_id={}", ada.id), &token)
        .await;
    assert_eq!(res.status, StatusCode::OK);
    let kinds: Vec<_> = res
        .body
        .as_array()
        .unwrap()
        .iter()
        .map(|activity| activity["kind"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(kinds, vec!["rsvp", "follow"]);
    assert_eq!(res.body[0]["event_type"], "music");

    let me = ctx.get("/v1/me", &token).await;
    assert_eq!(me.body["activities"].as_array().unwrap().len(), 2);
    assert_eq!(me.body["following"], 1);
}

#[tokio::test]
async fn test_create_activity_uses_caller() {
    let ctx = TestContext::new();
    let ada = ctx.user("ada@example.com").await;

    let res = ctx
        .post(
            "/v1/activities",
            &ctx.token(&ada),
            json!({ "kind": "checked_in", "event_type": "music" }),
        )
        .await;

    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["user_id"], ada.id.to_string());
    assert_eq!(res.body["kind"], "checked_in");
}

#[tokio::test]
async fn test_create_activity_with_unknown_event_is_404() {
    let ctx = TestContext::new();
    let ada = ctx.user("ada@example.com").await;
    let token = ctx.token(&ada);

    let res = ctx
        .post(
            "/v1/activities",
            &token,
            json!({ "kind": "rsvp", "event_id": Uuid::new_v4() }),
        )
        .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.body["error"], "not_found");

    let res = ctx.get("/v1/activities", &token).await;
    assert!(res.body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_create_profile_marks_complete() {
    let ctx = TestContext::new();
    let ada = ctx.user("ada@example.com").await;
    let token = ctx.token(&ada);

    let res = ctx.get("/v1/profile", &token).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["profile_complete"], false);

    let res = ctx
        .post(
            "/v1/profile",
            &token,
            json!({
                "first_name": "Ada",
                "last_name": "Lovelace",
                "birthday": "1815-12-10",
                "location": { "city": "London", "state": null, "country": "UK" },
                "profile": "Analyst"
            }),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["user"]["profile_complete"], true);
    assert_eq!(res.body["user"]["first_name"], "Ada");
    assert_eq!(res.body["user"]["location"]["city"], "London");
    for field in ["password_hash", "sign_up_ip", "verification"] {
        assert!(res.body["user"].get(field).is_none(), "{} leaked", field);
    }

    let res = ctx.get("/v1/profile", &token).await;
    assert_eq!(res.body["profile_complete"], true);
    assert_eq!(res.body["birthday"], "1815-12-10");
    assert!(res.body.get("password_hash").is_none());
}

#[tokio::test]
async fn test_create_profile_keeps_omitted_location() {
    let ctx = TestContext::new();
    let ada = ctx.user("ada@example.com").await;

    ctx.store
        .update_user(
            ada.id,
            UpdateUser {
                location: Some(UserLocation {
                    city: Some("Austin".to_string()),
                    state: Some("TX".to_string()),
                    country: Some("US".to_string()),
                }),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let res = ctx
        .post(
            "/v1/profile",
            &ctx.token(&ada),
            json!({ "first_name": "Ada", "last_name": "Lovelace" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);

    let stored = ctx.store.find_user(ada.id).await.unwrap().unwrap();
    assert_eq!(stored.location.city.as_deref(), Some("Austin"));
    assert_eq!(stored.location.country.as_deref(), Some("US"));
    assert_eq!(stored.first_name.as_deref(), Some("Ada"));
}

#[tokio::test]
async fn test_change_password() {
    let ctx = TestContext::new();
    let res = ctx
        .request(
            Method::POST,
            "/v1/auth/register",
            None,
            Some(json!({ "email": "ada@example.com", "password": "SecureP@ss123" })),
        )
        .await;
    let token = res.body["access_token"].as_str().unwrap().to_string();
    let change = |current: &str, new: &str| {
        json!({ "current_password": current, "new_password": new })
    };

    let res = ctx
        .request(
            Method::PUT,
            "/v1/profile/settings/security",
            Some(&token),
            Some(change("WrongP@ss123", "N3wP@ssword!")),
        )
        .await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    let res = ctx
        .request(
            Method::PUT,
            "/v1/profile/settings/security",
            Some(&token),
            Some(change("SecureP@ss123", "weakpass")),
        )
        .await;
    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(res.body["error"], "validation_error");

    let res = ctx
        .request(
            Method::PUT,
            "/v1/profile/settings/security",
            Some(&token),
            Some(change("SecureP@ss123", "N3wP@ssword!")),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);

    let login = |password: &str| json!({ "email": "ada@example.com", "password": password });
    let res = ctx
        .request(Method::POST, "/v1/auth/login", None, Some(login("SecureP@ss123")))
        .await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    let res = ctx
        .request(Method::POST, "/v1/auth/login", None, Some(login("N3wP@ssword!")))
        .await;
    assert_eq!(res.status, StatusCode::OK);
}

#[tokio::test]
async fn test_create_event_validates_schedule() {
    let ctx = TestContext::new();
    let ada = ctx.user("ada@example.com").await;
    let token = ctx.token(&ada);
    let start = Utc::now() + Duration::days(1);

    let mut body = json!({
        "event_name": "Rooftop Jazz",
        "short_description": "Live trio",
        "location_name": "The Deck",
        "venue_location": "12 Harbor St",
        "start_time": start,
        "end_time": start - Duration::hours(1),
        "event_category": "music",
        "location": { "city": "Austin", "state": "TX", "country": "US" }
    });

    let res = ctx.post("/v1/events", &token, body.clone()).await;
    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(res.body["details"][0]["field"], "end_time");

    body["end_time"] = json!(start + Duration::hours(3));
    let res = ctx.post("/v1/events", &token, body).await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["created_by"], ada.id.to_string());

    let res = ctx.get("/v1/events", &token).await;
    assert_eq!(res.body.as_array().unwrap().len(), 1);
    assert_eq!(res.body[0]["has_rsvped"], false);
}

#[tokio::test]
async fn test_create_event_reports_nested_fields() {
    let ctx = TestContext::new();
    let ada = ctx.user("ada@example.com").await;
    let start = Utc::now() + Duration::days(1);

    let res = ctx
        .post(
            "/v1/events",
            &ctx.token(&ada),
            json!({
                "event_name": "Rooftop Jazz",
                "short_description": "Live trio",
                "location_name": "The Deck",
                "venue_location": "12 Harbor St",
                "start_time": start,
                "end_time": start + Duration::hours(2),
                "event_category": "music",
                "location": { "city": "", "state": "TX", "country": "US" }
            }),
        )
        .await;

    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(res.body["details"][0]["field"], "location.city");
}

#[tokio::test]
async fn test_hidden_guests_left_out_of_guest_list() {
    let ctx = TestContext::new();
    let ada = ctx.user("ada@example.com").await;
    let bob = ctx.user("bob@example.com").await;
    let event = ctx.event(&ada, "Rooftop Jazz").await;
    let bob_token = ctx.token(&bob);

    let res = ctx
        .request(
            Method::PUT,
            "/v1/profile/settings/privacy",
            Some(&bob_token),
            Some(json!({ "hide_from_guest_lists": true })),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);

    ctx.post(&format!("/v1/events/{}/rsvp", event.id), &bob_token, json!({})).await;

    let res = ctx.get(&format!("/v1/events/{}", event.id), &ctx.token(&ada)).await;
    assert_eq!(res.body["attendee_count"], 1);
    assert!(res.body["attendees"].as_array().unwrap().is_empty());

    let res = ctx.get(&format!("/v1/events/{}", event.id), &bob_token).await;
    assert_eq!(res.body["attendees"][0]["id"], bob.id.to_string());
}

#[tokio::test]
async fn test_private_profile_hides_details() {
    let ctx = TestContext::new();
    let ada = ctx.user("ada@example.com").await;
    let bob = ctx.user("bob@example.com").await;

    ctx.store
        .update_user(
            bob.id,
            UpdateUser {
                profile: Some("Trumpet player".to_string()),
                public_profile: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let res = ctx.get(&format!("/v1/users/{}", bob.id), &ctx.token(&ada)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert!(res.body.get("profile").is_none());
    assert!(res.body.get("attending").is_none());

    let res = ctx.get(&format!("/v1/users/{}", bob.id), &ctx.token(&bob)).await;
    assert_eq!(res.body["profile"], "Trumpet player");
}

#[tokio::test]
async fn test_members_excludes_caller() {
    let ctx = TestContext::new();
    let ada = ctx.user("ada@example.com").await;
    let bob = ctx.user("bob@example.com").await;

    let res = ctx.get("/v1/members", &ctx.token(&ada)).await;

    let members = res.body.as_array().unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0]["id"], bob.id.to_string());
}

#[tokio::test]
async fn test_verify_code_flow() {
    let ctx = TestContext::new();
    let ada = ctx.user("ada@example.com").await;

    ctx.store
        .update_user(
            ada.id,
            UpdateUser {
                verification: Some(Some(pending_for("123456", Utc::now()))),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let verify = |code: &'static str| {
        json!({ "email": "ada@example.com", "code": code })
    };

    let res = ctx
        .request(Method::POST, "/v1/auth/verify-code", None, Some(verify("654321")))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = ctx
        .request(Method::POST, "/v1/auth/verify-code", None, Some(verify("123456")))
        .await;
    assert_eq!(res.status, StatusCode::OK);

    let user = ctx.store.find_user(ada.id).await.unwrap().unwrap();
    assert!(user.email_verified);
    assert!(user.verification.is_none());

    let res = ctx
        .request(Method::POST, "/v1/auth/verify-code", None, Some(verify("123456")))
        .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_verify_code_discarded_after_repeated_failures() {
    let ctx = TestContext::new();
    let ada = ctx.user("ada@example.com").await;

    ctx.store
        .update_user(
            ada.id,
            UpdateUser {
                verification: Some(Some(pending_for("123456", Utc::now()))),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let verify = |code: &'static str| {
        json!({ "email": "ada@example.com", "code": code })
    };

    for _ in 1..MAX_CODE_ATTEMPTS {
        let res = ctx
            .request(Method::POST, "/v1/auth/verify-code", None, Some(verify("000000")))
            .await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
    }
    let user = ctx.store.find_user(ada.id).await.unwrap().unwrap();
    assert_eq!(user.verification.unwrap().attempts, MAX_CODE_ATTEMPTS - 1);

    let res = ctx
        .request(Method::POST, "/v1/auth/verify-code", None, Some(verify("000000")))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert!(res.body["message"].as_str().unwrap().contains("Too many"));

    let user = ctx.store.find_user(ada.id).await.unwrap().unwrap();
    assert!(user.verification.is_none());
    assert!(!user.email_verified);

    // The right code no longer works once discarded
    let res = ctx
        .request(Method::POST, "/v1/auth/verify-code", None, Some(verify("123456")))
        .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_verify_email_stores_pending_code() {
    let ctx = TestContext::new();
    let ada = ctx.user("ada@example.com").await;

    let res = ctx
        .request(
            Method::POST,
            "/v1/auth/verify-email",
            None,
            Some(json!({ "email": "ada@example.com" })),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);

    let user = ctx.store.find_user(ada.id).await.unwrap().unwrap();
    assert!(user.verification.is_some());

    let res = ctx
        .request(
            Method::POST,
            "/v1/auth/verify-email",
            None,
            Some(json!({ "email": "nobody@example.com" })),
        )
        .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_forgot_password_does_not_reveal_accounts() {
    let ctx = TestContext::new();
    ctx.user("ada@example.com").await;

    for email in ["ada@example.com", "nobody@example.com"] {
        let res = ctx
            .request(
                Method::POST,
                "/v1/auth/forgot-password",
                None,
                Some(json!({ "email": email })),
            )
            .await;
        assert_eq!(res.status, StatusCode::OK);
    }
}

#[tokio::test]
async fn test_reset_password_with_token() {
    let ctx = TestContext::new();
    let ada = ctx.user("ada@example.com").await;
    let token = issue_token(ada.id, TokenType::PasswordReset, JWT_SECRET).unwrap();

    let res = ctx
        .request(
            Method::POST,
            "/v1/auth/reset-password",
            None,
            Some(json!({ "token": token, "new_password": "N3wP@ssword!" })),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);

    let res = ctx
        .request(
            Method::POST,
            "/v1/auth/login",
            None,
            Some(json!({ "email": "ada@example.com", "password": "N3wP@ssword!" })),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);

    let access = ctx.token(&ada);
    let res = ctx
        .request(
            Method::POST,
            "/v1/auth/reset-password",
            None,
            Some(json!({ "token": access, "new_password": "N3wP@ssword!" })),
        )
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_general_settings_email_conflict() {
    let ctx = TestContext::new();
    let ada = ctx.user("ada@example.com").await;
    ctx.user("bob@example.com").await;

    let res = ctx
        .request(
            Method::PUT,
            "/v1/profile/settings/general",
            Some(&ctx.token(&ada)),
            Some(json!({ "email": "bob@example.com", "phone": "555-0100" })),
        )
        .await;

    assert_eq!(res.status, StatusCode::CONFLICT);
    assert_eq!(res.body["error"], "conflict");
}

#[tokio::test]
async fn test_cors_preflight_allowed() {
    let ctx = TestContext::new();

    let request = axum::http::Request::builder()
        .method(Method::OPTIONS)
        .uri("/v1/events")
        .header(header::ORIGIN, "http://localhost:3000")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
        .body(axum::body::Body::empty())
        .unwrap();

    let response = tower::ServiceExt::oneshot(ctx.app.clone(), request)
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
}
