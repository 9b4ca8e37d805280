use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{BillingPeriod, TariffFilter, TariffLimits, TariffPlan, TariffStatus, TariffType},
    error::{AppError, Result},
    repository::TariffRepository,
};

const TARIFF_COLUMNS: &str = "id, code, name, description, features, price_daily_cents, \
     price_monthly_cents, price_quarterly_cents, price_annually_cents, \
     available_billing_periods, custom_period_enabled, custom_period_min_days, \
     custom_period_max_days, custom_period_daily_price_cents, plan_type, status, \
     limits, created_at, updated_at";

// Database row struct that matches SQLite schema. Collection-valued
// fields (features, billing periods, limits) are stored as JSON text.
#[derive(FromRow)]
struct TariffPlanRow {
    id: String,
    code: String,
    name: String,
    description: Option<String>,
    features: String,
    price_daily_cents: Option<i64>,
    price_monthly_cents: Option<i64>,
    price_quarterly_cents: Option<i64>,
    price_annually_cents: Option<i64>,
    available_billing_periods: String,
    custom_period_enabled: i32,
    custom_period_min_days: Option<i64>,
    custom_period_max_days: Option<i64>,
    custom_period_daily_price_cents: Option<i64>,
    plan_type: String,
    status: String,
    limits: String,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

pub struct SqliteTariffRepository {
    pool: SqlitePool,
}

impl SqliteTariffRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_plan(row: TariffPlanRow) -> Result<TariffPlan> {
        let features: Vec<String> = serde_json::from_str(&row.features)
            .map_err(|e| AppError::Database(format!("Invalid features column: {}", e)))?;
        let periods: Vec<BillingPeriod> = serde_json::from_str(&row.available_billing_periods)
            .map_err(|e| AppError::Database(format!("Invalid billing periods column: {}", e)))?;
        let limits: TariffLimits = serde_json::from_str(&row.limits)
            .map_err(|e| AppError::Database(format!("Invalid limits column: {}", e)))?;

        Ok(TariffPlan {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            code: row.code,
            name: row.name,
            description: row.description,
            features,
            price_daily_cents: row.price_daily_cents,
            price_monthly_cents: row.price_monthly_cents,
            price_quarterly_cents: row.price_quarterly_cents,
            price_annually_cents: row.price_annually_cents,
            available_billing_periods: periods,
            custom_period_enabled: row.custom_period_enabled != 0,
            custom_period_min_days: row.custom_period_min_days,
            custom_period_max_days: row.custom_period_max_days,
            custom_period_daily_price_cents: row.custom_period_daily_price_cents,
            plan_type: TariffType::from_str(&row.plan_type)
                .ok_or_else(|| AppError::Database(format!("Invalid tariff type: {}", row.plan_type)))?,
            status: TariffStatus::from_str(&row.status)
                .ok_or_else(|| AppError::Database(format!("Invalid tariff status: {}", row.status)))?,
            limits,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
        })
    }

    fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
        serde_json::to_string(value).map_err(|e| AppError::Database(e.to_string()))
    }

    // Appends WHERE clauses for every populated filter field. Billing
    // periods match by JSON substring, e.g. '%"MONTH"%'.
    fn push_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &TariffFilter) {
        qb.push(" WHERE 1 = 1");

        if let Some(types) = filter.types.as_deref().filter(|v| !v.is_empty()) {
            qb.push(" AND plan_type IN (");
            let mut args = qb.separated(", ");
            for t in types {
                args.push_bind(t.as_str());
            }
            qb.push(")");
        }

        if let Some(statuses) = filter.statuses.as_deref().filter(|v| !v.is_empty()) {
            qb.push(" AND status IN (");
            let mut args = qb.separated(", ");
            for s in statuses {
                args.push_bind(s.as_str());
            }
            qb.push(")");
        }

        if let Some(periods) = filter.billing_periods.as_deref().filter(|v| !v.is_empty()) {
            qb.push(" AND (");
            for (i, period) in periods.iter().enumerate() {
                if i > 0 {
                    qb.push(" OR ");
                }
                qb.push("available_billing_periods LIKE ");
                qb.push_bind(format!("%\"{}\"%", period.as_str()));
            }
            qb.push(")");
        }

        if let Some(enabled) = filter.custom_period_enabled {
            qb.push(" AND custom_period_enabled = ");
            qb.push_bind(if enabled { 1i32 } else { 0i32 });
        }

        if let Some(term) = filter.search.as_deref().filter(|t| !t.is_empty()) {
            let pattern = format!("%{}%", term.to_lowercase());
            qb.push(" AND (LOWER(name) LIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" OR LOWER(description) LIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" OR LOWER(code) LIKE ");
            qb.push_bind(pattern);
            qb.push(")");
        }
    }
}

#[async_trait]
impl TariffRepository for SqliteTariffRepository {
    async fn create(&self, plan: TariffPlan) -> Result<TariffPlan> {
        let features = Self::to_json(&plan.features)?;
        let periods = Self::to_json(&plan.available_billing_periods)?;
        let limits = Self::to_json(&plan.limits)?;

        sqlx::query(
            r#"
            INSERT INTO tariff_plans (
                id, code, name, description, features, price_daily_cents,
                price_monthly_cents, price_quarterly_cents, price_annually_cents,
                available_billing_periods, custom_period_enabled, custom_period_min_days,
                custom_period_max_days, custom_period_daily_price_cents, plan_type,
                status, limits, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(plan.id.to_string())
        .bind(&plan.code)
        .bind(&plan.name)
        .bind(&plan.description)
        .bind(&features)
        .bind(plan.price_daily_cents)
        .bind(plan.price_monthly_cents)
        .bind(plan.price_quarterly_cents)
        .bind(plan.price_annually_cents)
        .bind(&periods)
        .bind(if plan.custom_period_enabled { 1i32 } else { 0i32 })
        .bind(plan.custom_period_min_days)
        .bind(plan.custom_period_max_days)
        .bind(plan.custom_period_daily_price_cents)
        .bind(plan.plan_type.as_str())
        .bind(plan.status.as_str())
        .bind(&limits)
        .bind(plan.created_at.naive_utc())
        .bind(plan.updated_at.naive_utc())
        .execute(&self.pool)
        .await?;

        self.find_by_id(plan.id)
            .await?
            .ok_or_else(|| AppError::Database("Failed to retrieve created tariff plan".to_string()))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<TariffPlan>> {
        let sql = format!("SELECT {} FROM tariff_plans WHERE id = ?", TARIFF_COLUMNS);
        let row = sqlx::query_as::<_, TariffPlanRow>(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(r) => Ok(Some(Self::row_to_plan(r)?)),
            None => Ok(None),
        }
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<TariffPlan>> {
        let sql = format!("SELECT {} FROM tariff_plans WHERE code = ?", TARIFF_COLUMNS);
        let row = sqlx::query_as::<_, TariffPlanRow>(&sql)
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(r) => Ok(Some(Self::row_to_plan(r)?)),
            None => Ok(None),
        }
    }

    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<TariffPlan>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {} FROM tariff_plans WHERE id IN (",
            TARIFF_COLUMNS
        ));
        let mut args = qb.separated(", ");
        for id in ids {
            args.push_bind(id.to_string());
        }
        qb.push(")");

        let rows = qb
            .build_query_as::<TariffPlanRow>()
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Self::row_to_plan).collect()
    }

    async fn list(&self, filter: &TariffFilter, skip: i64, take: i64) -> Result<Vec<TariffPlan>> {
        let mut qb =
            QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM tariff_plans", TARIFF_COLUMNS));
        Self::push_filter(&mut qb, filter);
        qb.push(" ORDER BY created_at DESC LIMIT ");
        qb.push_bind(take);
        qb.push(" OFFSET ");
        qb.push_bind(skip);

        let rows = qb
            .build_query_as::<TariffPlanRow>()
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Self::row_to_plan).collect()
    }

    async fn list_active(&self) -> Result<Vec<TariffPlan>> {
        let sql = format!(
            "SELECT {} FROM tariff_plans WHERE status = ? ORDER BY plan_type ASC, price_monthly_cents ASC",
            TARIFF_COLUMNS
        );
        let rows = sqlx::query_as::<_, TariffPlanRow>(&sql)
            .bind(TariffStatus::Active.as_str())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Self::row_to_plan).collect()
    }

    async fn update(&self, plan: &TariffPlan) -> Result<TariffPlan> {
        let features = Self::to_json(&plan.features)?;
        let periods = Self::to_json(&plan.available_billing_periods)?;
        let limits = Self::to_json(&plan.limits)?;

        sqlx::query(
            r#"
            UPDATE tariff_plans
            SET code = ?,
                name = ?,
                description = ?,
                features = ?,
                price_daily_cents = ?,
                price_monthly_cents = ?,
                price_quarterly_cents = ?,
                price_annually_cents = ?,
                available_billing_periods = ?,
                custom_period_enabled = ?,
                custom_period_min_days = ?,
                custom_period_max_days = ?,
                custom_period_daily_price_cents = ?,
                plan_type = ?,
                status = ?,
                limits = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&plan.code)
        .bind(&plan.name)
        .bind(&plan.description)
        .bind(&features)
        .bind(plan.price_daily_cents)
        .bind(plan.price_monthly_cents)
        .bind(plan.price_quarterly_cents)
        .bind(plan.price_annually_cents)
        .bind(&periods)
        .bind(if plan.custom_period_enabled { 1i32 } else { 0i32 })
        .bind(plan.custom_period_min_days)
        .bind(plan.custom_period_max_days)
        .bind(plan.custom_period_daily_price_cents)
        .bind(plan.plan_type.as_str())
        .bind(plan.status.as_str())
        .bind(&limits)
        .bind(plan.updated_at.naive_utc())
        .bind(plan.id.to_string())
        .execute(&self.pool)
        .await?;

        self.find_by_id(plan.id)
            .await?
            .ok_or_else(|| AppError::Database("Failed to retrieve updated tariff plan".to_string()))
    }

    async fn set_status(&self, id: Uuid, status: TariffStatus) -> Result<TariffPlan> {
        sqlx::query("UPDATE tariff_plans SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(Utc::now().naive_utc())
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Tariff plan not found".to_string()))
    }

    async fn count(&self, filter: &TariffFilter) -> Result<i64> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM tariff_plans");
        Self::push_filter(&mut qb, filter);

        let count = qb.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        Ok(count)
    }
}
