use std::sync::Arc;

use chrono::{Duration, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tollgate::{
    cache::{CacheService, MemoryCache},
    domain::{
        CreatePaymentIntentRequest, NewUser, PaymentFilter, PaymentIntentStatus, PaymentMethod,
        PaymentStatus, ProcessPaymentRequest, RefundRequest, Role, User,
    },
    error::AppError,
    payments::StubProvider,
    repository::{SqlitePaymentRepository, SqliteUserRepository, UserRepository},
    service::payment_service::PaymentService,
};

async fn setup() -> anyhow::Result<(PaymentService, Arc<SqliteUserRepository>, SqlitePool)> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let user_repo = Arc::new(SqliteUserRepository::new(pool.clone()));
    let payment_repo = Arc::new(SqlitePaymentRepository::new(pool.clone()));
    let cache = Arc::new(CacheService::new(Arc::new(MemoryCache::new()), "test"));

    let service = PaymentService::new(
        payment_repo,
        user_repo.clone(),
        Arc::new(StubProvider::default()),
        cache,
    );

    Ok((service, user_repo, pool))
}

async fn create_user(repo: &SqliteUserRepository, email: &str) -> anyhow::Result<User> {
    Ok(repo
        .create(NewUser {
            email: email.to_string(),
            password_hash: "hash".to_string(),
            roles: vec![Role::User],
        })
        .await?)
}

fn intent_request(amount_cents: i64) -> CreatePaymentIntentRequest {
    CreatePaymentIntentRequest {
        subscription_id: None,
        tariff_plan_id: None,
        amount_cents,
        currency: None,
        preferred_payment_methods: None,
        description: Some("Test charge".to_string()),
        return_url: None,
    }
}

fn process_request(intent_id: uuid::Uuid) -> ProcessPaymentRequest {
    ProcessPaymentRequest {
        payment_intent_id: intent_id,
        payment_method: PaymentMethod::CreditCard,
        payment_data: serde_json::Value::Null,
    }
}

#[tokio::test]
async fn test_intent_lifecycle() -> anyhow::Result<()> {
    let (service, users, _pool) = setup().await?;
    let user = create_user(&users, "payer@example.com").await?;

    let before = Utc::now();
    let intent = service.create_intent(user.id, intent_request(2500)).await?;

    assert_eq!(intent.status, PaymentIntentStatus::Created);
    assert_eq!(intent.amount_cents, 2500);
    assert_eq!(intent.currency, "USD");
    assert!(intent.payment_url.is_some());
    assert_eq!(intent.metadata["ip_address"], "127.0.0.1");
    // A fresh intent lives for 24 hours
    assert!(intent.expires_at > before + Duration::hours(23));
    assert!(intent.expires_at < before + Duration::hours(25));

    let fetched = service.get_intent(user.id, intent.id).await?;
    assert_eq!(fetched.id, intent.id);

    let listed = service.list_intents(user.id).await?;
    assert_eq!(listed.len(), 1);

    let cancelled = service.cancel_intent(user.id, intent.id).await?;
    assert_eq!(cancelled.status, PaymentIntentStatus::Cancelled);

    // A settled intent cannot be cancelled again
    let err = service.cancel_intent(user.id, intent.id).await.unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    Ok(())
}

#[tokio::test]
async fn test_foreign_intent_reads_as_missing() -> anyhow::Result<()> {
    let (service, users, _pool) = setup().await?;
    let owner = create_user(&users, "owner@example.com").await?;
    let other = create_user(&users, "other@example.com").await?;

    let intent = service.create_intent(owner.id, intent_request(1000)).await?;

    let err = service.get_intent(other.id, intent.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let err = service.cancel_intent(other.id, intent.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    Ok(())
}

#[tokio::test]
async fn test_create_intent_requires_user() -> anyhow::Result<()> {
    let (service, _users, _pool) = setup().await?;

    let err = service
        .create_intent(uuid::Uuid::new_v4(), intent_request(1000))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    Ok(())
}

#[tokio::test]
async fn test_process_happy_path() -> anyhow::Result<()> {
    let (service, users, _pool) = setup().await?;
    let user = create_user(&users, "payer@example.com").await?;

    let intent = service.create_intent(user.id, intent_request(2500)).await?;
    let payment = service.process(user.id, process_request(intent.id)).await?;

    assert_eq!(payment.status, PaymentStatus::Completed);
    assert_eq!(payment.amount_cents, 2500);
    assert_eq!(payment.payment_method, Some(PaymentMethod::CreditCard));
    assert!(payment.external_id.as_deref().unwrap().starts_with("ext-"));
    assert!(payment.invoice_url.is_some());
    assert!(payment.receipt_url.is_some());
    assert_eq!(
        payment.metadata["payment_intent_id"],
        serde_json::json!(intent.id)
    );

    // The intent is settled
    let settled = service.get_intent(user.id, intent.id).await?;
    assert_eq!(settled.status, PaymentIntentStatus::Completed);

    // Settled intents cannot be paid twice
    let err = service
        .process(user.id, process_request(intent.id))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    Ok(())
}

#[tokio::test]
async fn test_process_rejects_wrong_owner() -> anyhow::Result<()> {
    let (service, users, _pool) = setup().await?;
    let owner = create_user(&users, "owner@example.com").await?;
    let other = create_user(&users, "other@example.com").await?;

    let intent = service.create_intent(owner.id, intent_request(1000)).await?;

    let err = service
        .process(other.id, process_request(intent.id))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    Ok(())
}

#[tokio::test]
async fn test_process_expired_intent() -> anyhow::Result<()> {
    let (service, users, pool) = setup().await?;
    let user = create_user(&users, "late@example.com").await?;

    let intent = service.create_intent(user.id, intent_request(1000)).await?;

    // Backdate the deadline
    sqlx::query("UPDATE payment_intents SET expires_at = ? WHERE id = ?")
        .bind((Utc::now() - Duration::hours(1)).naive_utc())
        .bind(intent.id.to_string())
        .execute(&pool)
        .await?;

    let err = service
        .process(user.id, process_request(intent.id))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let expired = service.get_intent(user.id, intent.id).await?;
    assert_eq!(expired.status, PaymentIntentStatus::Expired);

    Ok(())
}

#[tokio::test]
async fn test_refund_full_and_partial() -> anyhow::Result<()> {
    let (service, users, _pool) = setup().await?;
    let user = create_user(&users, "payer@example.com").await?;

    // Partial refund
    let intent = service.create_intent(user.id, intent_request(2000)).await?;
    let payment = service.process(user.id, process_request(intent.id)).await?;

    let outcome = service
        .refund(
            user.id,
            false,
            RefundRequest {
                payment_id: payment.id,
                amount_cents: Some(500),
                reason: Some("Goodwill".to_string()),
                full_refund: false,
            },
        )
        .await?;

    assert!(outcome.successful);
    assert_eq!(outcome.amount_cents, 500);
    assert_eq!(outcome.payment_status, PaymentStatus::PartiallyRefunded);
    assert!(outcome.refund_id.starts_with("ref-"));

    // Only completed payments can be refunded, so a second refund fails
    let err = service
        .refund(
            user.id,
            false,
            RefundRequest {
                payment_id: payment.id,
                amount_cents: Some(100),
                reason: None,
                full_refund: false,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    // Full refund
    let intent = service.create_intent(user.id, intent_request(3000)).await?;
    let payment = service.process(user.id, process_request(intent.id)).await?;

    let outcome = service
        .refund(
            user.id,
            false,
            RefundRequest {
                payment_id: payment.id,
                amount_cents: None,
                reason: None,
                full_refund: true,
            },
        )
        .await?;

    assert_eq!(outcome.amount_cents, 3000);
    assert_eq!(outcome.payment_status, PaymentStatus::Refunded);

    Ok(())
}

#[tokio::test]
async fn test_refund_amount_is_capped() -> anyhow::Result<()> {
    let (service, users, _pool) = setup().await?;
    let user = create_user(&users, "payer@example.com").await?;

    let intent = service.create_intent(user.id, intent_request(1000)).await?;
    let payment = service.process(user.id, process_request(intent.id)).await?;

    let err = service
        .refund(
            user.id,
            false,
            RefundRequest {
                payment_id: payment.id,
                amount_cents: Some(1001),
                reason: None,
                full_refund: false,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let err = service
        .refund(
            user.id,
            false,
            RefundRequest {
                payment_id: payment.id,
                amount_cents: Some(0),
                reason: None,
                full_refund: false,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    Ok(())
}

#[tokio::test]
async fn test_refund_authorization() -> anyhow::Result<()> {
    let (service, users, _pool) = setup().await?;
    let owner = create_user(&users, "owner@example.com").await?;
    let other = create_user(&users, "other@example.com").await?;

    let intent = service.create_intent(owner.id, intent_request(1000)).await?;
    let payment = service.process(owner.id, process_request(intent.id)).await?;

    let request = RefundRequest {
        payment_id: payment.id,
        amount_cents: None,
        reason: None,
        full_refund: true,
    };

    // Another user cannot refund it
    let err = service
        .refund(other.id, false, request.clone())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    // An admin can
    let outcome = service.refund(other.id, true, request).await?;
    assert_eq!(outcome.payment_status, PaymentStatus::Refunded);

    Ok(())
}

#[tokio::test]
async fn test_expire_stale_intents_sweep() -> anyhow::Result<()> {
    let (service, users, pool) = setup().await?;
    let user = create_user(&users, "payer@example.com").await?;

    let stale = service.create_intent(user.id, intent_request(1000)).await?;
    let fresh = service.create_intent(user.id, intent_request(2000)).await?;

    sqlx::query("UPDATE payment_intents SET expires_at = ? WHERE id = ?")
        .bind((Utc::now() - Duration::hours(1)).naive_utc())
        .bind(stale.id.to_string())
        .execute(&pool)
        .await?;

    let swept = service.expire_stale_intents().await?;
    assert_eq!(swept, 1);

    assert_eq!(
        service.get_intent(user.id, stale.id).await?.status,
        PaymentIntentStatus::Expired
    );
    assert_eq!(
        service.get_intent(user.id, fresh.id).await?.status,
        PaymentIntentStatus::Created
    );

    // Nothing left to sweep
    assert_eq!(service.expire_stale_intents().await?, 0);

    Ok(())
}

#[tokio::test]
async fn test_unfiltered_payment_list_is_cached_and_invalidated() -> anyhow::Result<()> {
    let (service, users, _pool) = setup().await?;
    let user = create_user(&users, "payer@example.com").await?;

    // Prime the cache while empty
    let payments = service.list_payments(user.id, &PaymentFilter::default()).await?;
    assert!(payments.is_empty());

    // Processing a payment must drop the cached listing
    let intent = service.create_intent(user.id, intent_request(1000)).await?;
    service.process(user.id, process_request(intent.id)).await?;

    let payments = service.list_payments(user.id, &PaymentFilter::default()).await?;
    assert_eq!(payments.len(), 1);

    // Filtered listings bypass the cache
    let filter = PaymentFilter {
        statuses: Some(vec![PaymentStatus::Refunded]),
        ..Default::default()
    };
    let refunded = service.list_payments(user.id, &filter).await?;
    assert!(refunded.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_get_payment_authorization() -> anyhow::Result<()> {
    let (service, users, _pool) = setup().await?;
    let owner = create_user(&users, "owner@example.com").await?;
    let other = create_user(&users, "other@example.com").await?;

    let intent = service.create_intent(owner.id, intent_request(1000)).await?;
    let payment = service.process(owner.id, process_request(intent.id)).await?;

    let err = service
        .get_payment(other.id, false, payment.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    let fetched = service.get_payment(other.id, true, payment.id).await?;
    assert_eq!(fetched.id, payment.id);

    Ok(())
}
