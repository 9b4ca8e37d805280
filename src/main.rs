use std::sync::Arc;
use sqlx::sqlite::SqlitePoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tollgate::{
    api,
    auth::AuthService,
    cache::{CacheBackend, CacheService, MemoryCache, RedisCache},
    config::Settings,
    payments::StubProvider,
    repository::{SqlitePaymentRepository, SqliteTariffRepository, SqliteUserRepository},
    service::ServiceContext,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tollgate=debug,tower_http=debug,axum=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let settings = Settings::new().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config: {}. Using defaults.", e);
        Settings::default()
    });

    tracing::info!(
        "Starting Tollgate server on {}:{}",
        settings.server.host,
        settings.server.port
    );

    // Initialize database
    let db_pool = SqlitePoolOptions::new()
        .max_connections(settings.database.max_connections)
        .connect(&settings.database.url)
        .await?;

    // Run migrations
    sqlx::migrate!("./migrations").run(&db_pool).await?;

    // Pick the cache backend
    let backend: Arc<dyn CacheBackend> = if settings.cache.enabled {
        match RedisCache::connect(&settings.cache.url).await {
            Ok(redis) => {
                tracing::info!("Connected to Redis at {}", settings.cache.url);
                Arc::new(redis)
            }
            Err(e) => {
                tracing::warn!(
                    "Redis unavailable ({}). Falling back to in-process cache.",
                    e
                );
                Arc::new(MemoryCache::new())
            }
        }
    } else {
        tracing::info!("Cache disabled; using in-process cache");
        Arc::new(MemoryCache::new())
    };
    let cache = Arc::new(CacheService::new(
        backend,
        settings.cache.key_prefix.clone(),
    ));

    // Initialize auth service
    let auth_service = Arc::new(AuthService::new(
        &settings.auth.jwt_secret,
        settings.auth.jwt_issuer.clone(),
        settings.auth.jwt_expiry_hours,
    ));

    // Initialize repositories
    let user_repo = Arc::new(SqliteUserRepository::new(db_pool.clone()));
    let tariff_repo = Arc::new(SqliteTariffRepository::new(db_pool.clone()));
    let payment_repo = Arc::new(SqlitePaymentRepository::new(db_pool.clone()));

    // Payment gateway (stubbed; swap for a real client in production)
    let provider = Arc::new(StubProvider::default());

    let settings = Arc::new(settings);

    // Create service context
    let service_context = Arc::new(ServiceContext::new(
        user_repo,
        tariff_repo,
        payment_repo,
        provider,
        auth_service,
        cache,
        settings.clone(),
    ));

    let app = api::create_app(service_context, settings.clone());

    let listener = tokio::net::TcpListener::bind(format!(
        "{}:{}",
        settings.server.host, settings.server.port
    ))
    .await?;

    tracing::info!(
        "Server listening on http://{}:{}",
        settings.server.host,
        settings.server.port
    );

    axum::serve(listener, app).await?;

    Ok(())
}
