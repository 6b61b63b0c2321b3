//! Route-level authorization. Every request here is settled by the auth
//! middleware or by body validation, so no database is needed.

mod common;

use anyhow::Result;
use axum::http::StatusCode;
use chrono::Utc;
use serde_json::json;

use common::{offline_app, token_for, TestRequest};
use jobly_api::auth::{Claims, JwtKeys};

fn assert_unauthorized(status: StatusCode, body: &serde_json::Value) {
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Unauthorized user");
    assert_eq!(body["status"], 401);
}

#[tokio::test]
async fn root_is_public() -> Result<()> {
    let (app, _) = offline_app()?;

    let (status, body) = TestRequest::get("/").send(&app).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Jobly API");
    Ok(())
}

#[tokio::test]
async fn unknown_route_is_not_found() -> Result<()> {
    let (app, _) = offline_app()?;

    let (status, body) = TestRequest::get("/no-such-thing").send(&app).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Not Found");
    Ok(())
}

#[tokio::test]
async fn anonymous_reads_are_rejected() -> Result<()> {
    let (app, _) = offline_app()?;

    for uri in ["/companies", "/companies/apple", "/jobs", "/jobs/1"] {
        let (status, body) = TestRequest::get(uri).send(&app).await?;
        assert_unauthorized(status, &body);
    }
    Ok(())
}

#[tokio::test]
async fn bad_tokens_degrade_to_anonymous() -> Result<()> {
    let (app, state) = offline_app()?;

    let other = JwtKeys::new(b"some-other-secret", 1)?;
    let foreign = other.sign(&jobly_api::auth::AuthUser { username: "alice".into(), is_admin: true })?;

    let now = Utc::now().timestamp();
    let expired = state.keys.sign_claims(&Claims {
        username: "alice".into(),
        is_admin: true,
        iat: now - 7200,
        exp: now - 3600,
    })?;

    for token in ["garbage", foreign.as_str(), expired.as_str()] {
        let (status, body) = TestRequest::get("/companies").bearer(token).send(&app).await?;
        assert_unauthorized(status, &body);
    }
    Ok(())
}

#[tokio::test]
async fn writes_require_admin() -> Result<()> {
    let (app, state) = offline_app()?;
    let user = token_for(&state, "alice", false);

    let requests = [
        TestRequest::post("/companies").json(json!({"handle": "new", "name": "New"})),
        TestRequest::patch("/companies/apple").json(json!({"name": "Apple"})),
        TestRequest::delete("/companies/apple"),
        TestRequest::post("/jobs").json(json!({"title": "dev", "company_handle": "apple"})),
        TestRequest::patch("/jobs/1").json(json!({"title": "lead"})),
        TestRequest::delete("/jobs/1"),
    ];

    for request in requests {
        let (status, body) = request.bearer(&user).send(&app).await?;
        assert_unauthorized(status, &body);
    }

    for request in [TestRequest::delete("/companies/apple"), TestRequest::patch("/jobs/1").json(json!({}))] {
        let (status, body) = request.send(&app).await?;
        assert_unauthorized(status, &body);
    }
    Ok(())
}

#[tokio::test]
async fn admin_passes_write_guard() -> Result<()> {
    let (app, state) = offline_app()?;
    let admin = token_for(&state, "root", true);

    // Rejected by validation, which only runs once the guard lets the request through
    let (status, body) = TestRequest::post("/companies")
        .bearer(&admin)
        .json(json!({"handle": "bad handle", "name": "", "description": "x"}))
        .send(&app)
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], 400);

    let (status, _) = TestRequest::patch("/jobs/1").bearer(&admin).json(json!({})).send(&app).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = TestRequest::post("/companies")
        .bearer(&admin)
        .raw_json("{not json")
        .send(&app)
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_JSON");
    Ok(())
}

#[tokio::test]
async fn users_only_change_themselves() -> Result<()> {
    let (app, state) = offline_app()?;
    let alice = token_for(&state, "alice", false);
    let bob = token_for(&state, "bob", false);
    let bob_admin = token_for(&state, "bob", true);

    for token in [&bob, &bob_admin] {
        let (status, body) = TestRequest::patch("/users/alice")
            .bearer(token)
            .json(json!({"first_name": "Mallory"}))
            .send(&app)
            .await?;
        assert_unauthorized(status, &body);

        let (status, body) = TestRequest::delete("/users/alice").bearer(token).send(&app).await?;
        assert_unauthorized(status, &body);
    }

    let (status, body) = TestRequest::delete("/users/alice").send(&app).await?;
    assert_unauthorized(status, &body);

    let (status, body) = TestRequest::patch("/users/alice").bearer(&alice).json(json!({})).send(&app).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "No fields to update");
    Ok(())
}

#[tokio::test]
async fn token_accepted_from_query_and_body() -> Result<()> {
    let (app, state) = offline_app()?;
    let alice = token_for(&state, "alice", false);
    let admin = token_for(&state, "root", true);

    // Past the login guard, the malformed id is the only thing left to reject
    let (status, _) = TestRequest::get(format!("/jobs/not-a-number?_token={}", alice)).send(&app).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = TestRequest::patch("/users/alice")
        .json(json!({"_token": alice}))
        .send(&app)
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "No fields to update");

    let (status, _) = TestRequest::post("/companies")
        .json(json!({"_token": admin, "handle": "bad handle", "name": "", "description": "x"}))
        .send(&app)
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = TestRequest::post("/companies")
        .json(json!({"_token": alice, "handle": "new", "name": "New", "description": "x"}))
        .send(&app)
        .await?;
    assert_unauthorized(status, &body);
    Ok(())
}

#[tokio::test]
async fn oversized_body_is_rejected() -> Result<()> {
    let (app, _) = offline_app()?;

    let padding = "x".repeat(128 * 1024);
    let (status, body) = TestRequest::post("/companies")
        .json(json!({"description": padding}))
        .send(&app)
        .await?;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["status"], 413);
    Ok(())
}

#[tokio::test]
async fn malformed_filters_get_json_errors() -> Result<()> {
    let (app, state) = offline_app()?;
    let alice = token_for(&state, "alice", false);

    for uri in ["/companies?min_employees=abc", "/jobs?min_salary=lots", "/jobs?min_equity=half"] {
        let (status, body) = TestRequest::get(uri).bearer(&alice).send(&app).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "BAD_REQUEST");
        assert_eq!(body["status"], 400);
        assert!(body["message"].is_string());
    }
    Ok(())
}
