use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    api::{handlers::parse_csv, state::AppState},
    domain::{
        BillingPeriod, CreateTariffRequest, CreateTemporaryTariffRequest, PriceQuote,
        TariffComparison, TariffFilter, TariffPlan, TariffStatus, TariffType,
        UpdateTariffRequest,
    },
    error::{AppError, Result},
};

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_take")]
    pub take: i64,
    pub types: Option<String>,
    pub statuses: Option<String>,
    pub billing_periods: Option<String>,
    pub search: Option<String>,
    pub custom_period_enabled: Option<bool>,
}

fn default_take() -> i64 {
    10
}

impl ListParams {
    fn to_filter(&self) -> Result<TariffFilter> {
        Ok(TariffFilter {
            types: parse_csv(self.types.as_deref(), TariffType::from_str, "tariff type")?,
            statuses: parse_csv(
                self.statuses.as_deref(),
                TariffStatus::from_str,
                "tariff status",
            )?,
            billing_periods: parse_csv(
                self.billing_periods.as_deref(),
                BillingPeriod::from_str,
                "billing period",
            )?,
            search: self
                .search
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from),
            custom_period_enabled: self.custom_period_enabled,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub plans: Vec<TariffPlan>,
    pub total: i64,
}

#[derive(Debug, Deserialize)]
pub struct CompareParams {
    pub ids: String,
}

#[derive(Debug, Deserialize)]
pub struct PriceParams {
    pub duration_days: i64,
}

#[derive(Debug, Deserialize)]
pub struct ChangeStatusRequest {
    pub status: TariffStatus,
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResponse>> {
    let filter = params.to_filter()?;
    let plans = state
        .service_context
        .tariffs
        .list(&filter, params.skip, params.take)
        .await?;
    let total = state.service_context.tariffs.count(&filter).await?;

    Ok(Json(ListResponse { plans, total }))
}

pub async fn active(State(state): State<AppState>) -> Result<Json<Vec<TariffPlan>>> {
    let plans = state.service_context.tariffs.active().await?;
    Ok(Json(plans))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<TariffPlan>> {
    let plan = state.service_context.tariffs.get(id).await?;
    Ok(Json(plan))
}

pub async fn compare(
    State(state): State<AppState>,
    Query(params): Query<CompareParams>,
) -> Result<Json<TariffComparison>> {
    let mut ids = Vec::new();
    for part in params.ids.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let id = Uuid::parse_str(part)
            .map_err(|_| AppError::BadRequest(format!("Invalid tariff plan id: {}", part)))?;
        ids.push(id);
    }

    let comparison = state.service_context.tariffs.compare(&ids).await?;
    Ok(Json(comparison))
}

pub async fn price(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<PriceParams>,
) -> Result<Json<PriceQuote>> {
    let quote = state
        .service_context
        .tariffs
        .calculate_price(id, params.duration_days)
        .await?;
    Ok(Json(quote))
}

pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<CreateTariffRequest>,
) -> Result<(StatusCode, Json<TariffPlan>)> {
    req.validate()?;

    let plan = state.service_context.tariffs.create(req).await?;
    Ok((StatusCode::CREATED, Json(plan)))
}

pub async fn create_temporary(
    State(state): State<AppState>,
    Json(req): Json<CreateTemporaryTariffRequest>,
) -> Result<(StatusCode, Json<TariffPlan>)> {
    req.validate()?;

    let plan = state.service_context.tariffs.create_temporary(req).await?;
    Ok((StatusCode::CREATED, Json(plan)))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateTariffRequest>,
) -> Result<Json<TariffPlan>> {
    req.validate()?;

    let plan = state.service_context.tariffs.update(id, req).await?;
    Ok(Json(plan))
}

pub async fn change_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ChangeStatusRequest>,
) -> Result<Json<TariffPlan>> {
    let plan = state
        .service_context
        .tariffs
        .change_status(id, req.status)
        .await?;
    Ok(Json(plan))
}
