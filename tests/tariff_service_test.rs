use std::sync::Arc;

use sqlx::sqlite::SqlitePoolOptions;
use tollgate::{
    cache::{CacheService, MemoryCache},
    domain::{
        BillingPeriod, CreateTariffRequest, CreateTemporaryTariffRequest, TariffLimits,
        TariffStatus, TariffType, UpdateTariffRequest,
    },
    error::AppError,
    repository::SqliteTariffRepository,
    service::tariff_service::TariffService,
};

async fn setup() -> anyhow::Result<TariffService> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let cache = Arc::new(CacheService::new(Arc::new(MemoryCache::new()), "test"));
    Ok(TariffService::new(
        Arc::new(SqliteTariffRepository::new(pool)),
        cache,
    ))
}

// Active plan priced for every standard billing period:
// 100/day, 3000/month, 8000/quarter, 20000/year.
fn plan_request(code: &str) -> CreateTariffRequest {
    CreateTariffRequest {
        code: code.to_string(),
        name: format!("Plan {}", code),
        description: None,
        features: vec!["Unlimited traffic".to_string()],
        price_daily_cents: Some(100),
        price_monthly_cents: Some(3000),
        price_quarterly_cents: Some(8000),
        price_annually_cents: Some(20000),
        available_billing_periods: vec![
            BillingPeriod::Day,
            BillingPeriod::Week,
            BillingPeriod::Month,
            BillingPeriod::Quarter,
            BillingPeriod::Year,
        ],
        custom_period_enabled: false,
        custom_period_min_days: None,
        custom_period_max_days: None,
        custom_period_daily_price_cents: None,
        plan_type: TariffType::Basic,
        status: Some(TariffStatus::Active),
        limits: TariffLimits {
            devices_count: 3,
            bandwidth_mbps: None,
            data_limit_gb: None,
        },
    }
}

#[tokio::test]
async fn test_price_ladder_picks_shortest_covering_period() -> anyhow::Result<()> {
    let service = setup().await?;
    let plan = service.create(plan_request("ladder")).await?;

    // Up to a week: billed per day
    let quote = service.calculate_price(plan.id, 6).await?;
    assert_eq!(quote.billing_period, BillingPeriod::Day);
    assert_eq!(quote.final_price_cents, 600);
    assert!(!quote.has_discount);

    // 8..=30 days: billed per started week
    let quote = service.calculate_price(plan.id, 8).await?;
    assert_eq!(quote.billing_period, BillingPeriod::Week);
    assert_eq!(quote.final_price_cents, 1400);

    // 31..=90 days: billed per started month
    let quote = service.calculate_price(plan.id, 45).await?;
    assert_eq!(quote.billing_period, BillingPeriod::Month);
    assert_eq!(quote.final_price_cents, 6000);
    assert_eq!(quote.original_price_cents, quote.final_price_cents);

    Ok(())
}

#[tokio::test]
async fn test_long_durations_report_monthly_savings() -> anyhow::Result<()> {
    let service = setup().await?;
    let plan = service.create(plan_request("savings")).await?;

    // 180 days: 2 quarters at 8000 vs 6 months at 3000
    let quote = service.calculate_price(plan.id, 180).await?;
    assert_eq!(quote.billing_period, BillingPeriod::Quarter);
    assert_eq!(quote.final_price_cents, 16000);
    assert_eq!(quote.original_price_cents, 16000);
    assert!(quote.has_discount);
    assert_eq!(quote.discount_percent, Some(11));

    // 400 days: 2 years at 20000 vs 14 months at 3000
    let quote = service.calculate_price(plan.id, 400).await?;
    assert_eq!(quote.billing_period, BillingPeriod::Year);
    assert_eq!(quote.final_price_cents, 40000);
    assert!(quote.has_discount);
    assert_eq!(quote.discount_percent, Some(5));

    // A quarterly rate that beats nothing reports no discount
    let mut pricey = plan_request("pricey");
    pricey.price_quarterly_cents = Some(9000);
    let pricey = service.create(pricey).await?;

    let quote = service.calculate_price(pricey.id, 91).await?;
    assert_eq!(quote.billing_period, BillingPeriod::Quarter);
    assert_eq!(quote.final_price_cents, 18000);
    assert!(!quote.has_discount);
    assert_eq!(quote.discount_percent, None);

    Ok(())
}

#[tokio::test]
async fn test_custom_period_pricing() -> anyhow::Result<()> {
    let service = setup().await?;

    let mut request = plan_request("custom");
    request.price_daily_cents = None;
    request.price_monthly_cents = None;
    request.price_quarterly_cents = None;
    request.price_annually_cents = None;
    request.available_billing_periods = vec![BillingPeriod::Custom];
    request.custom_period_enabled = true;
    request.custom_period_min_days = Some(3);
    request.custom_period_max_days = Some(10);
    request.custom_period_daily_price_cents = Some(150);
    let plan = service.create(request).await?;

    // Inside the window: per-day custom rate
    let quote = service.calculate_price(plan.id, 5).await?;
    assert_eq!(quote.billing_period, BillingPeriod::Custom);
    assert_eq!(quote.final_price_cents, 750);
    assert!(!quote.has_discount);

    // Outside the window nothing else covers the duration
    let err = service.calculate_price(plan.id, 2).await.unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    let err = service.calculate_price(plan.id, 11).await.unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    Ok(())
}

#[tokio::test]
async fn test_price_requires_active_plan() -> anyhow::Result<()> {
    let service = setup().await?;

    let mut request = plan_request("draft");
    request.status = Some(TariffStatus::Draft);
    let plan = service.create(request).await?;

    let err = service.calculate_price(plan.id, 10).await.unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    Ok(())
}

#[tokio::test]
async fn test_price_duration_bounds() -> anyhow::Result<()> {
    let service = setup().await?;
    let plan = service.create(plan_request("bounds")).await?;

    let err = service.calculate_price(plan.id, 0).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let err = service.calculate_price(plan.id, 1826).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    Ok(())
}

#[tokio::test]
async fn test_duplicate_code_is_conflict() -> anyhow::Result<()> {
    let service = setup().await?;

    service.create(plan_request("dup")).await?;
    let err = service.create(plan_request("dup")).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    Ok(())
}

#[tokio::test]
async fn test_custom_period_settings_are_validated() -> anyhow::Result<()> {
    let service = setup().await?;

    // Enabled without the required settings
    let mut request = plan_request("incomplete");
    request.custom_period_enabled = true;
    let err = service.create(request).await.unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    // Inverted range
    let mut request = plan_request("inverted");
    request.custom_period_enabled = true;
    request.custom_period_min_days = Some(30);
    request.custom_period_max_days = Some(10);
    request.custom_period_daily_price_cents = Some(100);
    let err = service.create(request).await.unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    Ok(())
}

#[tokio::test]
async fn test_temporary_plan_shape() -> anyhow::Result<()> {
    let service = setup().await?;

    let plan = service
        .create_temporary(CreateTemporaryTariffRequest {
            name: "Holiday special".to_string(),
            duration_days: 30,
            price_cents: 1500,
            features: vec!["Unlimited traffic".to_string()],
            limits: TariffLimits {
                devices_count: 1,
                bandwidth_mbps: None,
                data_limit_gb: None,
            },
        })
        .await?;

    assert!(plan.code.starts_with("TEMP-"));
    assert_eq!(plan.plan_type, TariffType::Temporary);
    assert_eq!(plan.status, TariffStatus::Active);
    assert!(plan.custom_period_enabled);
    assert_eq!(plan.custom_period_min_days, Some(30));
    assert_eq!(plan.custom_period_max_days, Some(30));
    assert_eq!(plan.custom_period_daily_price_cents, Some(50));
    assert_eq!(plan.price_daily_cents, Some(50));
    assert_eq!(plan.available_billing_periods, vec![BillingPeriod::Custom]);

    // The quoted total matches the requested price
    let quote = service.calculate_price(plan.id, 30).await?;
    assert_eq!(quote.billing_period, BillingPeriod::Custom);
    assert_eq!(quote.final_price_cents, 1500);

    // Only the exact duration is purchasable
    let err = service.calculate_price(plan.id, 29).await.unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    Ok(())
}

#[tokio::test]
async fn test_compare_unions_features() -> anyhow::Result<()> {
    let service = setup().await?;

    let mut first = plan_request("first");
    first.features = vec!["Traffic".to_string(), "Kill switch".to_string()];
    let first = service.create(first).await?;

    let mut second = plan_request("second");
    second.features = vec!["Kill switch".to_string(), "Dedicated IP".to_string()];
    let second = service.create(second).await?;

    let comparison = service.compare(&[first.id, second.id]).await?;
    assert_eq!(comparison.plans.len(), 2);
    assert_eq!(comparison.plans[0].id, first.id);
    assert_eq!(
        comparison.all_features,
        vec![
            "Traffic".to_string(),
            "Kill switch".to_string(),
            "Dedicated IP".to_string()
        ]
    );

    // Fewer than two plans is rejected
    let err = service.compare(&[first.id]).await.unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    // Unknown ids are reported as missing
    let err = service
        .compare(&[first.id, uuid::Uuid::new_v4()])
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    Ok(())
}

#[tokio::test]
async fn test_active_cache_invalidated_on_status_change() -> anyhow::Result<()> {
    let service = setup().await?;
    let plan = service.create(plan_request("cached")).await?;

    // Prime the cache
    let active = service.active().await?;
    assert_eq!(active.len(), 1);

    service.change_status(plan.id, TariffStatus::Archived).await?;

    // Archiving must be visible immediately
    let active = service.active().await?;
    assert!(active.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_list_pagination_guards() -> anyhow::Result<()> {
    let service = setup().await?;
    let filter = Default::default();

    let err = service.list(&filter, -1, 10).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let err = service.list(&filter, 0, 0).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let err = service.list(&filter, 0, 101).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    Ok(())
}

#[tokio::test]
async fn test_update_merges_fields() -> anyhow::Result<()> {
    let service = setup().await?;
    let plan = service.create(plan_request("merge")).await?;

    let updated = service
        .update(
            plan.id,
            UpdateTariffRequest {
                name: Some("Renamed".to_string()),
                price_monthly_cents: Some(3500),
                custom_period_enabled: Some(true),
                custom_period_min_days: Some(5),
                custom_period_max_days: Some(20),
                custom_period_daily_price_cents: Some(120),
                ..Default::default()
            },
        )
        .await?;

    assert_eq!(updated.name, "Renamed");
    assert_eq!(updated.price_monthly_cents, Some(3500));
    // Untouched fields survive
    assert_eq!(updated.price_daily_cents, Some(100));
    assert_eq!(updated.code, "merge");
    assert!(updated.custom_period_enabled);
    assert_eq!(updated.custom_period_min_days, Some(5));

    // Renaming onto an existing code is rejected
    service.create(plan_request("taken")).await?;
    let err = service
        .update(
            plan.id,
            UpdateTariffRequest {
                code: Some("taken".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    Ok(())
}
