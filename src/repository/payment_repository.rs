use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{
        BillingPeriod, Payment, PaymentFilter, PaymentIntent, PaymentIntentStatus, PaymentMethod,
        PaymentStatus,
    },
    error::{AppError, Result},
    repository::PaymentRepository,
};

const INTENT_COLUMNS: &str = "id, user_id, subscription_id, tariff_plan_id, amount_cents, \
     currency, status, available_payment_methods, description, expires_at, payment_url, \
     return_url, metadata, created_at, updated_at";

const PAYMENT_COLUMNS: &str = "id, user_id, subscription_id, tariff_plan_id, amount_cents, \
     currency, status, payment_method, period_type, period_days, external_id, invoice_url, \
     receipt_url, description, metadata, created_at, updated_at";

#[derive(FromRow)]
struct PaymentIntentRow {
    id: String,
    user_id: String,
    subscription_id: Option<String>,
    tariff_plan_id: Option<String>,
    amount_cents: i64,
    currency: String,
    status: String,
    available_payment_methods: Option<String>,
    description: Option<String>,
    expires_at: NaiveDateTime,
    payment_url: Option<String>,
    return_url: Option<String>,
    metadata: Option<String>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

#[derive(FromRow)]
struct PaymentRow {
    id: String,
    user_id: String,
    subscription_id: Option<String>,
    tariff_plan_id: Option<String>,
    amount_cents: i64,
    currency: String,
    status: String,
    payment_method: Option<String>,
    period_type: Option<String>,
    period_days: Option<i64>,
    external_id: Option<String>,
    invoice_url: Option<String>,
    receipt_url: Option<String>,
    description: Option<String>,
    metadata: Option<String>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

pub struct SqlitePaymentRepository {
    pool: SqlitePool,
}

impl SqlitePaymentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn parse_uuid(raw: &str) -> Result<Uuid> {
        Uuid::parse_str(raw).map_err(|e| AppError::Database(e.to_string()))
    }

    // A NULL metadata column reads as JSON null.
    fn parse_metadata(raw: Option<String>) -> Result<serde_json::Value> {
        match raw {
            Some(json) => serde_json::from_str(&json)
                .map_err(|e| AppError::Database(format!("Invalid metadata column: {}", e))),
            None => Ok(serde_json::Value::Null),
        }
    }

    fn metadata_to_json(metadata: &serde_json::Value) -> Result<Option<String>> {
        if metadata.is_null() {
            return Ok(None);
        }
        serde_json::to_string(metadata)
            .map(Some)
            .map_err(|e| AppError::Database(e.to_string()))
    }

    fn row_to_intent(row: PaymentIntentRow) -> Result<PaymentIntent> {
        let available_payment_methods: Option<Vec<PaymentMethod>> =
            match row.available_payment_methods {
                Some(json) => Some(serde_json::from_str(&json).map_err(|e| {
                    AppError::Database(format!("Invalid payment methods column: {}", e))
                })?),
                None => None,
            };

        Ok(PaymentIntent {
            id: Self::parse_uuid(&row.id)?,
            user_id: Self::parse_uuid(&row.user_id)?,
            subscription_id: row.subscription_id,
            tariff_plan_id: row
                .tariff_plan_id
                .as_deref()
                .map(Self::parse_uuid)
                .transpose()?,
            amount_cents: row.amount_cents,
            currency: row.currency,
            status: PaymentIntentStatus::from_str(&row.status).ok_or_else(|| {
                AppError::Database(format!("Invalid payment intent status: {}", row.status))
            })?,
            available_payment_methods,
            description: row.description,
            expires_at: DateTime::from_naive_utc_and_offset(row.expires_at, Utc),
            payment_url: row.payment_url,
            return_url: row.return_url,
            metadata: Self::parse_metadata(row.metadata)?,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
        })
    }

    fn row_to_payment(row: PaymentRow) -> Result<Payment> {
        Ok(Payment {
            id: Self::parse_uuid(&row.id)?,
            user_id: Self::parse_uuid(&row.user_id)?,
            subscription_id: row.subscription_id,
            tariff_plan_id: row
                .tariff_plan_id
                .as_deref()
                .map(Self::parse_uuid)
                .transpose()?,
            amount_cents: row.amount_cents,
            currency: row.currency,
            status: PaymentStatus::from_str(&row.status).ok_or_else(|| {
                AppError::Database(format!("Invalid payment status: {}", row.status))
            })?,
            payment_method: row
                .payment_method
                .as_deref()
                .map(|s| {
                    PaymentMethod::from_str(s).ok_or_else(|| {
                        AppError::Database(format!("Invalid payment method: {}", s))
                    })
                })
                .transpose()?,
            period_type: row
                .period_type
                .as_deref()
                .map(|s| {
                    BillingPeriod::from_str(s).ok_or_else(|| {
                        AppError::Database(format!("Invalid billing period: {}", s))
                    })
                })
                .transpose()?,
            period_days: row.period_days,
            external_id: row.external_id,
            invoice_url: row.invoice_url,
            receipt_url: row.receipt_url,
            description: row.description,
            metadata: Self::parse_metadata(row.metadata)?,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
        })
    }

    fn push_payment_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &PaymentFilter) {
        if let Some(statuses) = filter.statuses.as_deref().filter(|v| !v.is_empty()) {
            qb.push(" AND status IN (");
            let mut args = qb.separated(", ");
            for s in statuses {
                args.push_bind(s.as_str());
            }
            qb.push(")");
        }

        if let Some(methods) = filter.methods.as_deref().filter(|v| !v.is_empty()) {
            qb.push(" AND payment_method IN (");
            let mut args = qb.separated(", ");
            for m in methods {
                args.push_bind(m.as_str());
            }
            qb.push(")");
        }

        if let Some(subscription_id) = filter.subscription_id.as_deref() {
            qb.push(" AND subscription_id = ");
            qb.push_bind(subscription_id.to_string());
        }

        if let Some(tariff_plan_id) = filter.tariff_plan_id {
            qb.push(" AND tariff_plan_id = ");
            qb.push_bind(tariff_plan_id.to_string());
        }

        if let Some(from) = filter.date_from {
            qb.push(" AND created_at >= ");
            qb.push_bind(from.naive_utc());
        }

        if let Some(to) = filter.date_to {
            qb.push(" AND created_at <= ");
            qb.push_bind(to.naive_utc());
        }

        if let Some(term) = filter.search.as_deref().filter(|t| !t.is_empty()) {
            let pattern = format!("%{}%", term.to_lowercase());
            qb.push(" AND (LOWER(description) LIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" OR LOWER(external_id) LIKE ");
            qb.push_bind(pattern);
            qb.push(")");
        }
    }
}

#[async_trait]
impl PaymentRepository for SqlitePaymentRepository {
    async fn create_intent(&self, intent: PaymentIntent) -> Result<PaymentIntent> {
        let methods_json = intent
            .available_payment_methods
            .as_ref()
            .map(|m| serde_json::to_string(m))
            .transpose()
            .map_err(|e| AppError::Database(e.to_string()))?;
        let metadata_json = Self::metadata_to_json(&intent.metadata)?;

        sqlx::query(
            r#"
            INSERT INTO payment_intents (
                id, user_id, subscription_id, tariff_plan_id, amount_cents,
                currency, status, available_payment_methods, description,
                expires_at, payment_url, return_url, metadata, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(intent.id.to_string())
        .bind(intent.user_id.to_string())
        .bind(&intent.subscription_id)
        .bind(intent.tariff_plan_id.map(|id| id.to_string()))
        .bind(intent.amount_cents)
        .bind(&intent.currency)
        .bind(intent.status.as_str())
        .bind(&methods_json)
        .bind(&intent.description)
        .bind(intent.expires_at.naive_utc())
        .bind(&intent.payment_url)
        .bind(&intent.return_url)
        .bind(&metadata_json)
        .bind(intent.created_at.naive_utc())
        .bind(intent.updated_at.naive_utc())
        .execute(&self.pool)
        .await?;

        self.find_intent_by_id(intent.id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve created payment intent".to_string())
        })
    }

    async fn find_intent_by_id(&self, id: Uuid) -> Result<Option<PaymentIntent>> {
        let sql = format!("SELECT {} FROM payment_intents WHERE id = ?", INTENT_COLUMNS);
        let row = sqlx::query_as::<_, PaymentIntentRow>(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(r) => Ok(Some(Self::row_to_intent(r)?)),
            None => Ok(None),
        }
    }

    async fn list_intents_by_user(&self, user_id: Uuid) -> Result<Vec<PaymentIntent>> {
        let sql = format!(
            "SELECT {} FROM payment_intents WHERE user_id = ? ORDER BY created_at DESC",
            INTENT_COLUMNS
        );
        let rows = sqlx::query_as::<_, PaymentIntentRow>(&sql)
            .bind(user_id.to_string())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Self::row_to_intent).collect()
    }

    async fn update_intent_status(
        &self,
        id: Uuid,
        status: PaymentIntentStatus,
    ) -> Result<PaymentIntent> {
        sqlx::query("UPDATE payment_intents SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(Utc::now().naive_utc())
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        self.find_intent_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Payment intent not found".to_string()))
    }

    async fn expire_stale_intents(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE payment_intents
            SET status = ?, updated_at = ?
            WHERE status IN (?, ?) AND expires_at < ?
            "#,
        )
        .bind(PaymentIntentStatus::Expired.as_str())
        .bind(now.naive_utc())
        .bind(PaymentIntentStatus::Created.as_str())
        .bind(PaymentIntentStatus::RequiresPaymentMethod.as_str())
        .bind(now.naive_utc())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn create_payment(&self, payment: Payment) -> Result<Payment> {
        let metadata_json = Self::metadata_to_json(&payment.metadata)?;

        sqlx::query(
            r#"
            INSERT INTO payments (
                id, user_id, subscription_id, tariff_plan_id, amount_cents,
                currency, status, payment_method, period_type, period_days,
                external_id, invoice_url, receipt_url, description, metadata,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(payment.id.to_string())
        .bind(payment.user_id.to_string())
        .bind(&payment.subscription_id)
        .bind(payment.tariff_plan_id.map(|id| id.to_string()))
        .bind(payment.amount_cents)
        .bind(&payment.currency)
        .bind(payment.status.as_str())
        .bind(payment.payment_method.map(|m| m.as_str()))
        .bind(payment.period_type.map(|p| p.as_str()))
        .bind(payment.period_days)
        .bind(&payment.external_id)
        .bind(&payment.invoice_url)
        .bind(&payment.receipt_url)
        .bind(&payment.description)
        .bind(&metadata_json)
        .bind(payment.created_at.naive_utc())
        .bind(payment.updated_at.naive_utc())
        .execute(&self.pool)
        .await?;

        self.find_payment_by_id(payment.id)
            .await?
            .ok_or_else(|| AppError::Database("Failed to retrieve created payment".to_string()))
    }

    async fn find_payment_by_id(&self, id: Uuid) -> Result<Option<Payment>> {
        let sql = format!("SELECT {} FROM payments WHERE id = ?", PAYMENT_COLUMNS);
        let row = sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(r) => Ok(Some(Self::row_to_payment(r)?)),
            None => Ok(None),
        }
    }

    async fn list_payments(&self, user_id: Uuid, filter: &PaymentFilter) -> Result<Vec<Payment>> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {} FROM payments WHERE user_id = ",
            PAYMENT_COLUMNS
        ));
        qb.push_bind(user_id.to_string());
        Self::push_payment_filter(&mut qb, filter);
        qb.push(" ORDER BY created_at DESC");

        let rows = qb
            .build_query_as::<PaymentRow>()
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Self::row_to_payment).collect()
    }

    async fn update_payment(&self, payment: &Payment) -> Result<Payment> {
        let metadata_json = Self::metadata_to_json(&payment.metadata)?;

        sqlx::query(
            r#"
            UPDATE payments
            SET status = ?,
                payment_method = ?,
                external_id = ?,
                invoice_url = ?,
                receipt_url = ?,
                description = ?,
                metadata = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(payment.status.as_str())
        .bind(payment.payment_method.map(|m| m.as_str()))
        .bind(&payment.external_id)
        .bind(&payment.invoice_url)
        .bind(&payment.receipt_url)
        .bind(&payment.description)
        .bind(&metadata_json)
        .bind(Utc::now().naive_utc())
        .bind(payment.id.to_string())
        .execute(&self.pool)
        .await?;

        self.find_payment_by_id(payment.id)
            .await?
            .ok_or_else(|| AppError::Database("Failed to retrieve updated payment".to_string()))
    }

    async fn count_payments(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM payments")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn completed_revenue_cents(&self) -> Result<i64> {
        let total = sqlx::query_scalar::<_, Option<i64>>(
            "SELECT SUM(amount_cents) FROM payments WHERE status = ?",
        )
        .bind(PaymentStatus::Completed.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(total.unwrap_or(0))
    }

    async fn count_open_intents(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM payment_intents WHERE status NOT IN (?, ?, ?)",
        )
        .bind(PaymentIntentStatus::Completed.as_str())
        .bind(PaymentIntentStatus::Cancelled.as_str())
        .bind(PaymentIntentStatus::Expired.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}
