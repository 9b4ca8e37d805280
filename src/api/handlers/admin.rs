use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::{
    api::{handlers::payments::PaymentFilterParams, state::AppState},
    domain::{Payment, TariffFilter, TariffStatus},
    error::{AppError, Result},
};

#[derive(Debug, Serialize)]
pub struct AdminStats {
    pub total_users: i64,
    pub total_tariff_plans: i64,
    pub active_tariff_plans: i64,
    pub total_payments: i64,
    pub completed_revenue_cents: i64,
    pub open_payment_intents: i64,
}

pub async fn stats(State(state): State<AppState>) -> Result<Json<AdminStats>> {
    let services = &state.service_context;

    let active_filter = TariffFilter {
        statuses: Some(vec![TariffStatus::Active]),
        ..Default::default()
    };

    Ok(Json(AdminStats {
        total_users: services.users.count().await?,
        total_tariff_plans: services.tariffs.count(&TariffFilter::default()).await?,
        active_tariff_plans: services.tariffs.count(&active_filter).await?,
        total_payments: services.payments.count_payments().await?,
        completed_revenue_cents: services.payments.completed_revenue_cents().await?,
        open_payment_intents: services.payments.open_intent_count().await?,
    }))
}

#[derive(Debug, Deserialize)]
pub struct TargetUserParams {
    pub user_id: Option<Uuid>,
}

/// Admin view of any user's payment history.
pub async fn payments(
    State(state): State<AppState>,
    Query(target): Query<TargetUserParams>,
    Query(params): Query<PaymentFilterParams>,
) -> Result<Json<Vec<Payment>>> {
    let user_id = target.user_id.ok_or_else(|| {
        AppError::BadRequest("user_id query parameter is required".to_string())
    })?;

    let filter = params.to_filter()?;
    let payments = state
        .service_context
        .payments
        .list_payments(user_id, &filter)
        .await?;

    Ok(Json(payments))
}

pub async fn check_expired(State(state): State<AppState>) -> Result<Json<serde_json::Value>> {
    let expired = state.service_context.payments.expire_stale_intents().await?;
    Ok(Json(json!({ "expired": expired })))
}
