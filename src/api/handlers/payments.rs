use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    api::{handlers::parse_csv, middleware::auth::CurrentUser, state::AppState},
    domain::{
        CreatePaymentIntentRequest, Payment, PaymentFilter, PaymentIntent, PaymentMethod,
        PaymentStatus, ProcessPaymentRequest, RefundOutcome, RefundRequest,
    },
    error::Result,
};

#[derive(Debug, Default, Deserialize)]
pub struct PaymentFilterParams {
    pub statuses: Option<String>,
    pub methods: Option<String>,
    pub subscription_id: Option<String>,
    pub tariff_plan_id: Option<Uuid>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub search: Option<String>,
}

impl PaymentFilterParams {
    pub(crate) fn to_filter(&self) -> Result<PaymentFilter> {
        Ok(PaymentFilter {
            statuses: parse_csv(
                self.statuses.as_deref(),
                PaymentStatus::from_str,
                "payment status",
            )?,
            methods: parse_csv(
                self.methods.as_deref(),
                PaymentMethod::from_str,
                "payment method",
            )?,
            subscription_id: self.subscription_id.clone(),
            tariff_plan_id: self.tariff_plan_id,
            date_from: self.date_from,
            date_to: self.date_to,
            search: self
                .search
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub payments: Vec<Payment>,
    pub total: usize,
}

pub async fn create_intent(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(req): Json<CreatePaymentIntentRequest>,
) -> Result<(StatusCode, Json<PaymentIntent>)> {
    req.validate()?;

    let intent = state
        .service_context
        .payments
        .create_intent(current.user.id, req)
        .await?;

    Ok((StatusCode::CREATED, Json(intent)))
}

pub async fn list_intents(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<Vec<PaymentIntent>>> {
    let intents = state
        .service_context
        .payments
        .list_intents(current.user.id)
        .await?;
    Ok(Json(intents))
}

pub async fn get_intent(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<PaymentIntent>> {
    let intent = state
        .service_context
        .payments
        .get_intent(current.user.id, id)
        .await?;
    Ok(Json(intent))
}

pub async fn cancel_intent(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<PaymentIntent>> {
    let intent = state
        .service_context
        .payments
        .cancel_intent(current.user.id, id)
        .await?;
    Ok(Json(intent))
}

pub async fn process(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(req): Json<ProcessPaymentRequest>,
) -> Result<Json<Payment>> {
    req.validate()?;

    let payment = state
        .service_context
        .payments
        .process(current.user.id, req)
        .await?;
    Ok(Json(payment))
}

pub async fn refund(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(req): Json<RefundRequest>,
) -> Result<Json<RefundOutcome>> {
    req.validate()?;

    let outcome = state
        .service_context
        .payments
        .refund(current.user.id, current.is_admin(), req)
        .await?;
    Ok(Json(outcome))
}

pub async fn list(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(params): Query<PaymentFilterParams>,
) -> Result<Json<ListResponse>> {
    let filter = params.to_filter()?;
    let payments = state
        .service_context
        .payments
        .list_payments(current.user.id, &filter)
        .await?;

    Ok(Json(ListResponse {
        total: payments.len(),
        payments,
    }))
}

pub async fn get(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Payment>> {
    let payment = state
        .service_context
        .payments
        .get_payment(current.user.id, current.is_admin(), id)
        .await?;
    Ok(Json(payment))
}
