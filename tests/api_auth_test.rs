use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use sqlx::sqlite::SqlitePoolOptions;
use tower::ServiceExt;
use uuid::Uuid;

use tollgate::{
    api::create_app,
    auth::AuthService,
    cache::{CacheService, MemoryCache},
    config::Settings,
    domain::{Role, UserPatch},
    payments::StubProvider,
    repository::{
        SqlitePaymentRepository, SqliteTariffRepository, SqliteUserRepository, UserRepository,
    },
    service::ServiceContext,
};

async fn test_app() -> anyhow::Result<(Router, Arc<SqliteUserRepository>)> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let settings = Arc::new(Settings::default());
    let cache = Arc::new(CacheService::new(Arc::new(MemoryCache::new()), "test"));
    let auth_service = Arc::new(AuthService::new("test-secret", "tollgate", 1));
    let user_repo = Arc::new(SqliteUserRepository::new(pool.clone()));

    let service_context = Arc::new(ServiceContext::new(
        user_repo.clone(),
        Arc::new(SqliteTariffRepository::new(pool.clone())),
        Arc::new(SqlitePaymentRepository::new(pool)),
        Arc::new(StubProvider::default()),
        auth_service,
        cache,
        settings.clone(),
    ));

    Ok((create_app(service_context, settings), user_repo))
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
    token: Option<&str>,
) -> anyhow::Result<(StatusCode, serde_json::Value)> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }

    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))?,
        None => builder.body(Body::empty())?,
    };

    let response = app.clone().oneshot(request).await?;
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes)?
    };

    Ok((status, json))
}

async fn register_and_login(app: &Router, email: &str) -> anyhow::Result<(Uuid, String)> {
    let (status, user) = send(
        app,
        "POST",
        "/auth/register",
        Some(serde_json::json!({ "email": email, "password": "password123" })),
        None,
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);

    let id = Uuid::parse_str(user["id"].as_str().unwrap())?;

    let (status, login) = send(
        app,
        "POST",
        "/auth/login",
        Some(serde_json::json!({ "email": email, "password": "password123" })),
        None,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);

    Ok((id, login["access_token"].as_str().unwrap().to_string()))
}

#[tokio::test]
async fn test_health_endpoint() -> anyhow::Result<()> {
    let (app, _) = test_app().await?;

    let (status, body) = send(&app, "GET", "/health", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    Ok(())
}

#[tokio::test]
async fn test_register_login_me_flow() -> anyhow::Result<()> {
    let (app, _) = test_app().await?;

    let (status, user) = send(
        &app,
        "POST",
        "/auth/register",
        Some(serde_json::json!({ "email": "new@example.com", "password": "password123" })),
        None,
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(user["email"], "new@example.com");
    assert_eq!(user["roles"], serde_json::json!(["user"]));
    // The hash must never appear in a response
    assert!(user.get("password_hash").is_none());

    // Same email again
    let (status, _) = send(
        &app,
        "POST",
        "/auth/register",
        Some(serde_json::json!({ "email": "new@example.com", "password": "password123" })),
        None,
    )
    .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    // Wrong password
    let (status, _) = send(
        &app,
        "POST",
        "/auth/login",
        Some(serde_json::json!({ "email": "new@example.com", "password": "wrong-password" })),
        None,
    )
    .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Correct login
    let (status, login) = send(
        &app,
        "POST",
        "/auth/login",
        Some(serde_json::json!({ "email": "new@example.com", "password": "password123" })),
        None,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    let token = login["access_token"].as_str().unwrap();
    assert!(!token.is_empty());
    assert_eq!(login["user"]["email"], "new@example.com");

    // The token gets us to /auth/me
    let (status, me) = send(&app, "GET", "/auth/me", None, Some(token)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "new@example.com");

    // No token, or a bad one, does not
    let (status, _) = send(&app, "GET", "/auth/me", None, None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send(&app, "GET", "/auth/me", None, Some("not-a-jwt")).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    Ok(())
}

#[tokio::test]
async fn test_invalid_register_payload_is_unprocessable() -> anyhow::Result<()> {
    let (app, _) = test_app().await?;

    let (status, body) = send(
        &app,
        "POST",
        "/auth/register",
        Some(serde_json::json!({ "email": "not-an-email", "password": "password123" })),
        None,
    )
    .await?;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].is_string());

    let (status, _) = send(
        &app,
        "POST",
        "/auth/register",
        Some(serde_json::json!({ "email": "ok@example.com", "password": "short" })),
        None,
    )
    .await?;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    Ok(())
}

#[tokio::test]
async fn test_admin_routes_are_guarded() -> anyhow::Result<()> {
    let (app, user_repo) = test_app().await?;
    let (user_id, token) = register_and_login(&app, "subscriber@example.com").await?;

    // Anonymous
    let (status, _) = send(&app, "GET", "/admin/stats", None, None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Authenticated but not an admin
    let (status, body) = send(&app, "GET", "/admin/stats", None, Some(&token)).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Forbidden");

    // Promote and retry with the same token; roles are read from the
    // database, not the token
    user_repo
        .update(
            user_id,
            UserPatch {
                roles: Some(vec![Role::User, Role::Admin]),
                ..Default::default()
            },
        )
        .await?;

    let (status, stats) = send(&app, "GET", "/admin/stats", None, Some(&token)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total_users"], 1);
    assert_eq!(stats["total_payments"], 0);

    // Admin payment listing requires a target user
    let (status, _) = send(&app, "GET", "/admin/payments", None, Some(&token)).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let uri = format!("/admin/payments?user_id={}", user_id);
    let (status, payments) = send(&app, "GET", &uri, None, Some(&token)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payments, serde_json::json!([]));

    // The expiry sweep reports how many intents it closed
    let (status, swept) = send(
        &app,
        "POST",
        "/admin/payments/expired-check",
        None,
        Some(&token),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(swept["expired"], 0);

    Ok(())
}

#[tokio::test]
async fn test_tariff_endpoints() -> anyhow::Result<()> {
    let (app, user_repo) = test_app().await?;
    let (admin_id, admin_token) = register_and_login(&app, "admin@example.com").await?;
    user_repo
        .update(
            admin_id,
            UserPatch {
                roles: Some(vec![Role::User, Role::Admin]),
                ..Default::default()
            },
        )
        .await?;

    // Nothing on sale yet
    let (status, active) = send(&app, "GET", "/api/tariffs/active", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(active, serde_json::json!([]));

    // Plan creation is an admin operation
    let plan_body = serde_json::json!({
        "code": "basic",
        "name": "Basic",
        "features": ["Unlimited traffic"],
        "price_monthly_cents": 1999,
        "available_billing_periods": ["MONTH"],
        "type": "BASIC",
        "status": "ACTIVE",
        "limits": { "devices_count": 3 }
    });

    let (status, _) = send(&app, "POST", "/admin/tariffs", Some(plan_body.clone()), None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, plan) = send(
        &app,
        "POST",
        "/admin/tariffs",
        Some(plan_body),
        Some(&admin_token),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(plan["code"], "basic");
    assert_eq!(plan["type"], "BASIC");
    let plan_id = plan["id"].as_str().unwrap().to_string();

    // Now it is visible publicly
    let (status, active) = send(&app, "GET", "/api/tariffs/active", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(active.as_array().unwrap().len(), 1);

    let uri = format!("/api/tariffs/{}", plan_id);
    let (status, fetched) = send(&app, "GET", &uri, None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["id"], plan["id"]);

    // 45 days round up to two months
    let uri = format!("/api/tariffs/{}/price?duration_days=45", plan_id);
    let (status, quote) = send(&app, "GET", &uri, None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(quote["final_price_cents"], 3998);
    assert_eq!(quote["billing_period"], "MONTH");

    // Unknown plans are a 404
    let uri = format!("/api/tariffs/{}", Uuid::new_v4());
    let (status, _) = send(&app, "GET", &uri, None, None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn test_payment_flow_over_http() -> anyhow::Result<()> {
    let (app, _) = test_app().await?;
    let (_, token) = register_and_login(&app, "payer@example.com").await?;

    // Payments are never anonymous
    let (status, _) = send(&app, "GET", "/api/payments", None, None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, intent) = send(
        &app,
        "POST",
        "/api/payments/intents",
        Some(serde_json::json!({ "amount_cents": 1000, "description": "One month" })),
        Some(&token),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(intent["status"], "CREATED");
    assert_eq!(intent["currency"], "USD");

    let (status, payment) = send(
        &app,
        "POST",
        "/api/payments/process",
        Some(serde_json::json!({
            "payment_intent_id": intent["id"],
            "payment_method": "CREDIT_CARD"
        })),
        Some(&token),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payment["status"], "COMPLETED");
    assert_eq!(payment["amount_cents"], 1000);

    let (status, listed) = send(&app, "GET", "/api/payments", None, Some(&token)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["total"], 1);
    assert_eq!(listed["payments"][0]["id"], payment["id"]);

    Ok(())
}
