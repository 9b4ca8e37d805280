use std::sync::Arc;

use sqlx::sqlite::SqlitePoolOptions;

use tollgate::{
    auth::AuthService,
    cache::{CacheService, MemoryCache},
    config::Settings,
    domain::{
        BillingPeriod, CreatePaymentIntentRequest, CreateTariffRequest, PaymentMethod,
        ProcessPaymentRequest, RegisterRequest, Role, TariffLimits, TariffStatus, TariffType,
        UserPatch,
    },
    payments::StubProvider,
    repository::{
        SqlitePaymentRepository, SqliteTariffRepository, SqliteUserRepository, UserRepository,
    },
    service::ServiceContext,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    println!("🌱 Starting database seeding...");

    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:tollgate.db".to_string());

    let db_pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    println!("📋 Running migrations...");
    sqlx::migrate!("./migrations").run(&db_pool).await?;

    // Seed through the services so hashing, validation and caching rules
    // apply exactly as they do at runtime.
    let settings = Arc::new(Settings::default());
    let cache = Arc::new(CacheService::new(
        Arc::new(MemoryCache::new()),
        settings.cache.key_prefix.clone(),
    ));
    let auth_service = Arc::new(AuthService::new(
        &settings.auth.jwt_secret,
        settings.auth.jwt_issuer.clone(),
        settings.auth.jwt_expiry_hours,
    ));

    let user_repo = Arc::new(SqliteUserRepository::new(db_pool.clone()));
    let services = ServiceContext::new(
        user_repo.clone(),
        Arc::new(SqliteTariffRepository::new(db_pool.clone())),
        Arc::new(SqlitePaymentRepository::new(db_pool.clone())),
        Arc::new(StubProvider::default()),
        auth_service,
        cache,
        settings,
    );

    // Seed users
    println!("👥 Creating users...");

    let admin = services
        .users
        .register(RegisterRequest {
            email: "admin@tollgate.local".to_string(),
            password: "admin123!".to_string(),
        })
        .await?;

    user_repo
        .update(
            admin.id,
            UserPatch {
                roles: Some(vec![Role::User, Role::Admin]),
                ..Default::default()
            },
        )
        .await?;

    println!("  ✅ Created admin user (admin@tollgate.local / admin123!)");

    let alice = services
        .users
        .register(RegisterRequest {
            email: "alice@example.com".to_string(),
            password: "password123".to_string(),
        })
        .await?;

    services
        .users
        .register(RegisterRequest {
            email: "bob@example.com".to_string(),
            password: "password123".to_string(),
        })
        .await?;

    println!("  ✅ Created 2 test users");

    // Seed tariff plans
    println!("📦 Creating tariff plans...");

    let basic = services
        .tariffs
        .create(CreateTariffRequest {
            code: "basic".to_string(),
            name: "Basic".to_string(),
            description: Some("Entry plan for everyday browsing".to_string()),
            features: vec![
                "Unlimited traffic".to_string(),
                "3 server locations".to_string(),
                "Standard support".to_string(),
            ],
            price_daily_cents: Some(99),
            price_monthly_cents: Some(499),
            price_quarterly_cents: Some(1299),
            price_annually_cents: Some(3999),
            available_billing_periods: vec![
                BillingPeriod::Day,
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
                bandwidth_mbps: Some(100),
                data_limit_gb: None,
            },
        })
        .await?;

    services
        .tariffs
        .create(CreateTariffRequest {
            code: "premium".to_string(),
            name: "Premium".to_string(),
            description: Some("Faster servers and flexible durations".to_string()),
            features: vec![
                "Unlimited traffic".to_string(),
                "40 server locations".to_string(),
                "Streaming optimized".to_string(),
                "Priority support".to_string(),
            ],
            price_daily_cents: Some(199),
            price_monthly_cents: Some(999),
            price_quarterly_cents: Some(2699),
            price_annually_cents: Some(8999),
            available_billing_periods: vec![
                BillingPeriod::Day,
                BillingPeriod::Week,
                BillingPeriod::Month,
                BillingPeriod::Quarter,
                BillingPeriod::Year,
            ],
            custom_period_enabled: true,
            custom_period_min_days: Some(3),
            custom_period_max_days: Some(60),
            custom_period_daily_price_cents: Some(149),
            plan_type: TariffType::Premium,
            status: Some(TariffStatus::Active),
            limits: TariffLimits {
                devices_count: 5,
                bandwidth_mbps: Some(500),
                data_limit_gb: None,
            },
        })
        .await?;

    services
        .tariffs
        .create(CreateTariffRequest {
            code: "business".to_string(),
            name: "Business".to_string(),
            description: Some("Team accounts with dedicated capacity".to_string()),
            features: vec![
                "Unlimited traffic".to_string(),
                "All server locations".to_string(),
                "Dedicated IP".to_string(),
                "24/7 support".to_string(),
            ],
            price_daily_cents: None,
            price_monthly_cents: Some(2999),
            price_quarterly_cents: Some(7999),
            price_annually_cents: Some(24999),
            available_billing_periods: vec![
                BillingPeriod::Month,
                BillingPeriod::Quarter,
                BillingPeriod::Year,
            ],
            custom_period_enabled: false,
            custom_period_min_days: None,
            custom_period_max_days: None,
            custom_period_daily_price_cents: None,
            plan_type: TariffType::Business,
            status: Some(TariffStatus::Active),
            limits: TariffLimits {
                devices_count: 20,
                bandwidth_mbps: None,
                data_limit_gb: None,
            },
        })
        .await?;

    println!("  ✅ Created 3 tariff plans");

    // Seed a worked payment
    println!("💳 Creating a sample payment...");

    let intent = services
        .payments
        .create_intent(
            alice.id,
            CreatePaymentIntentRequest {
                subscription_id: None,
                tariff_plan_id: Some(basic.id),
                amount_cents: 499,
                currency: None,
                preferred_payment_methods: Some(vec![
                    PaymentMethod::CreditCard,
                    PaymentMethod::Paypal,
                ]),
                description: Some("Basic plan, one month".to_string()),
                return_url: None,
            },
        )
        .await?;

    let payment = services
        .payments
        .process(
            alice.id,
            ProcessPaymentRequest {
                payment_intent_id: intent.id,
                payment_method: PaymentMethod::CreditCard,
                payment_data: serde_json::json!({ "card_last4": "4242" }),
            },
        )
        .await?;

    println!("  ✅ Recorded payment {} for alice", payment.id);

    println!("\n✨ Database seeding complete!");
    println!("\n📝 Test credentials:");
    println!("  Admin: admin@tollgate.local / admin123!");
    println!("  Users: alice@example.com, bob@example.com");
    println!("  Password for all test users: password123");

    Ok(())
}
