use std::sync::Arc;

use uuid::Uuid;

use crate::{
    cache::CacheService,
    domain::{
        BillingPeriod, CreateTariffRequest, CreateTemporaryTariffRequest, PriceQuote,
        TariffComparison, TariffFilter, TariffPlan, TariffStatus, TariffType,
        UpdateTariffRequest,
    },
    error::{AppError, Result},
    repository::TariffRepository,
};

const CACHE_TTL_SECS: u64 = 3600;
const LIST_CACHE_KEY: &str = "tariff_plans";
const ACTIVE_CACHE_KEY: &str = "tariff_plans:active";

const DEFAULT_PAGE_SIZE: i64 = 10;
const MAX_PAGE_SIZE: i64 = 100;
const MAX_PRICE_DURATION_DAYS: i64 = 1825;

pub struct TariffService {
    repo: Arc<dyn TariffRepository>,
    cache: Arc<CacheService>,
}

impl TariffService {
    pub fn new(repo: Arc<dyn TariffRepository>, cache: Arc<CacheService>) -> Self {
        Self { repo, cache }
    }

    pub async fn create(&self, request: CreateTariffRequest) -> Result<TariffPlan> {
        if self.repo.find_by_code(&request.code).await?.is_some() {
            tracing::warn!("Attempted to create tariff with existing code: {}", request.code);
            return Err(AppError::Conflict(format!(
                "Tariff plan with code \"{}\" already exists",
                request.code
            )));
        }

        Self::validate_custom_period(
            request.custom_period_enabled,
            request.custom_period_min_days,
            request.custom_period_max_days,
            request.custom_period_daily_price_cents,
        )?;

        let now = chrono::Utc::now();
        let plan = TariffPlan {
            id: Uuid::new_v4(),
            code: request.code,
            name: request.name,
            description: request.description,
            features: request.features,
            price_daily_cents: request.price_daily_cents,
            price_monthly_cents: request.price_monthly_cents,
            price_quarterly_cents: request.price_quarterly_cents,
            price_annually_cents: request.price_annually_cents,
            available_billing_periods: request.available_billing_periods,
            custom_period_enabled: request.custom_period_enabled,
            custom_period_min_days: request.custom_period_min_days,
            custom_period_max_days: request.custom_period_max_days,
            custom_period_daily_price_cents: request.custom_period_daily_price_cents,
            plan_type: request.plan_type,
            status: request.status.unwrap_or(TariffStatus::Draft),
            limits: request.limits,
            created_at: now,
            updated_at: now,
        };

        let plan = self.repo.create(plan).await?;
        self.invalidate_cache().await;
        tracing::info!("Tariff plan created: {} ({})", plan.name, plan.code);
        Ok(plan)
    }

    /// Builds a short-lived plan that can only be bought for exactly
    /// `duration_days`, priced by rounding the total to a daily rate.
    pub async fn create_temporary(
        &self,
        request: CreateTemporaryTariffRequest,
    ) -> Result<TariffPlan> {
        if request.duration_days <= 0 {
            return Err(AppError::Validation(
                "duration_days must be positive".to_string(),
            ));
        }

        let code = format!("TEMP-{}", &Uuid::new_v4().simple().to_string()[..8]);
        let daily = (request.price_cents + request.duration_days / 2) / request.duration_days;

        self.create(CreateTariffRequest {
            code,
            name: request.name,
            description: None,
            features: request.features,
            price_daily_cents: Some(daily),
            price_monthly_cents: None,
            price_quarterly_cents: None,
            price_annually_cents: None,
            available_billing_periods: vec![BillingPeriod::Custom],
            custom_period_enabled: true,
            custom_period_min_days: Some(request.duration_days),
            custom_period_max_days: Some(request.duration_days),
            custom_period_daily_price_cents: Some(daily),
            plan_type: TariffType::Temporary,
            status: Some(TariffStatus::Active),
            limits: request.limits,
        })
        .await
    }

    /// Lists plans; the unfiltered first page is served from cache.
    pub async fn list(
        &self,
        filter: &TariffFilter,
        skip: i64,
        take: i64,
    ) -> Result<Vec<TariffPlan>> {
        if skip < 0 {
            return Err(AppError::Validation("skip must not be negative".to_string()));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&take) {
            return Err(AppError::Validation(format!(
                "take must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }

        let is_default_query = filter.is_empty() && skip == 0 && take == DEFAULT_PAGE_SIZE;

        if is_default_query {
            if let Some(cached) = self.cache.get::<Vec<TariffPlan>>(LIST_CACHE_KEY).await {
                if !cached.is_empty() {
                    return Ok(cached);
                }
            }
        }

        let plans = self.repo.list(filter, skip, take).await?;

        if is_default_query {
            self.cache.set(LIST_CACHE_KEY, &plans, CACHE_TTL_SECS).await;
        }

        Ok(plans)
    }

    pub async fn active(&self) -> Result<Vec<TariffPlan>> {
        if let Some(cached) = self.cache.get::<Vec<TariffPlan>>(ACTIVE_CACHE_KEY).await {
            return Ok(cached);
        }

        let plans = self.repo.list_active().await?;
        self.cache.set(ACTIVE_CACHE_KEY, &plans, CACHE_TTL_SECS).await;

        Ok(plans)
    }

    pub async fn get(&self, id: Uuid) -> Result<TariffPlan> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Tariff plan with ID \"{}\" not found", id)))
    }

    pub async fn update(&self, id: Uuid, request: UpdateTariffRequest) -> Result<TariffPlan> {
        let current = self.get(id).await?;

        if let Some(code) = &request.code {
            if let Some(existing) = self.repo.find_by_code(code).await? {
                if existing.id != id {
                    return Err(AppError::Conflict(format!(
                        "Tariff plan with code \"{}\" already exists",
                        code
                    )));
                }
            }
        }

        let enabled = request
            .custom_period_enabled
            .unwrap_or(current.custom_period_enabled);
        let min_days = request.custom_period_min_days.or(current.custom_period_min_days);
        let max_days = request.custom_period_max_days.or(current.custom_period_max_days);
        let daily_price = request
            .custom_period_daily_price_cents
            .or(current.custom_period_daily_price_cents);

        if request.custom_period_enabled == Some(true) {
            Self::validate_custom_period(true, min_days, max_days, daily_price)?;
        }

        let mut plan = current;
        if let Some(code) = request.code {
            plan.code = code;
        }
        if let Some(name) = request.name {
            plan.name = name;
        }
        if let Some(description) = request.description {
            plan.description = Some(description);
        }
        if let Some(features) = request.features {
            plan.features = features;
        }
        if let Some(price) = request.price_daily_cents {
            plan.price_daily_cents = Some(price);
        }
        if let Some(price) = request.price_monthly_cents {
            plan.price_monthly_cents = Some(price);
        }
        if let Some(price) = request.price_quarterly_cents {
            plan.price_quarterly_cents = Some(price);
        }
        if let Some(price) = request.price_annually_cents {
            plan.price_annually_cents = Some(price);
        }
        if let Some(periods) = request.available_billing_periods {
            plan.available_billing_periods = periods;
        }
        plan.custom_period_enabled = enabled;
        plan.custom_period_min_days = min_days;
        plan.custom_period_max_days = max_days;
        plan.custom_period_daily_price_cents = daily_price;
        if let Some(plan_type) = request.plan_type {
            plan.plan_type = plan_type;
        }
        if let Some(limits) = request.limits {
            plan.limits = limits;
        }
        plan.updated_at = chrono::Utc::now();

        let plan = self.repo.update(&plan).await?;
        self.invalidate_cache().await;
        tracing::info!("Tariff plan updated: {} ({})", plan.name, plan.code);
        Ok(plan)
    }

    pub async fn change_status(&self, id: Uuid, status: TariffStatus) -> Result<TariffPlan> {
        self.get(id).await?;

        let plan = self.repo.set_status(id, status).await?;
        self.invalidate_cache().await;
        tracing::info!(
            "Tariff plan status changed to {}: {} ({})",
            status.as_str(),
            plan.name,
            plan.code
        );
        Ok(plan)
    }

    /// Side-by-side comparison; `all_features` is the union of the
    /// plans' feature lists in first-seen order.
    pub async fn compare(&self, ids: &[Uuid]) -> Result<TariffComparison> {
        if ids.len() < 2 {
            return Err(AppError::BadRequest(
                "At least two tariff plans must be provided for comparison".to_string(),
            ));
        }

        let fetched = self.repo.find_many(ids).await?;
        let mut plans = Vec::with_capacity(ids.len());
        for id in ids {
            let plan = fetched
                .iter()
                .find(|p| p.id == *id)
                .ok_or_else(|| {
                    AppError::NotFound(format!("Tariff plan with ID \"{}\" not found", id))
                })?
                .clone();
            plans.push(plan);
        }

        let mut all_features: Vec<String> = Vec::new();
        for plan in &plans {
            for feature in &plan.features {
                if !all_features.contains(feature) {
                    all_features.push(feature.clone());
                }
            }
        }

        Ok(TariffComparison { plans, all_features })
    }

    /// Quotes a price for `duration_days` of service. The first billing
    /// period that covers the duration wins: custom range, then daily,
    /// weekly, monthly, quarterly, annual. Quarterly and annual quotes
    /// also report the saving against paying month by month.
    pub async fn calculate_price(&self, plan_id: Uuid, duration_days: i64) -> Result<PriceQuote> {
        if !(1..=MAX_PRICE_DURATION_DAYS).contains(&duration_days) {
            return Err(AppError::Validation(format!(
                "duration_days must be between 1 and {}",
                MAX_PRICE_DURATION_DAYS
            )));
        }

        let plan = self.get(plan_id).await?;
        if plan.status != TariffStatus::Active {
            return Err(AppError::BadRequest(
                "Cannot calculate price for inactive tariff".to_string(),
            ));
        }

        let days = duration_days;
        let in_custom_range = plan.custom_period_enabled
            && days >= plan.custom_period_min_days.unwrap_or(1)
            && days <= plan.custom_period_max_days.unwrap_or(365);

        let (billing_period, price, monthly_compare) = if in_custom_range {
            let daily = plan.custom_period_daily_price_cents.unwrap_or(0);
            (BillingPeriod::Custom, days * daily, false)
        } else if days <= 7 && positive(plan.price_daily_cents).is_some() {
            (BillingPeriod::Day, days * plan.price_daily_cents.unwrap_or(0), false)
        } else if days <= 30
            && plan
                .available_billing_periods
                .contains(&BillingPeriod::Week)
        {
            let weeks = div_ceil(days, 7);
            (
                BillingPeriod::Week,
                weeks * plan.price_daily_cents.unwrap_or(0) * 7,
                false,
            )
        } else if days <= 90 && positive(plan.price_monthly_cents).is_some() {
            let months = div_ceil(days, 30);
            (
                BillingPeriod::Month,
                months * plan.price_monthly_cents.unwrap_or(0),
                false,
            )
        } else if days <= 365 && positive(plan.price_quarterly_cents).is_some() {
            let quarters = div_ceil(days, 90);
            (
                BillingPeriod::Quarter,
                quarters * plan.price_quarterly_cents.unwrap_or(0),
                true,
            )
        } else if positive(plan.price_annually_cents).is_some() {
            let years = div_ceil(days, 365);
            (
                BillingPeriod::Year,
                years * plan.price_annually_cents.unwrap_or(0),
                true,
            )
        } else {
            return Err(AppError::BadRequest(
                "Cannot calculate price for the given duration".to_string(),
            ));
        };

        let (has_discount, discount_percent) = if monthly_compare {
            match positive(plan.price_monthly_cents) {
                Some(monthly) => {
                    let monthly_equivalent = div_ceil(days, 30) * monthly;
                    if price < monthly_equivalent {
                        let percent = ((1.0 - price as f64 / monthly_equivalent as f64) * 100.0)
                            .round() as i64;
                        (true, Some(percent))
                    } else {
                        (false, None)
                    }
                }
                None => (false, None),
            }
        } else {
            (false, None)
        };

        Ok(PriceQuote {
            plan,
            duration_days,
            billing_period,
            original_price_cents: price,
            final_price_cents: price,
            has_discount,
            discount_percent,
        })
    }

    pub async fn count(&self, filter: &TariffFilter) -> Result<i64> {
        self.repo.count(filter).await
    }

    fn validate_custom_period(
        enabled: bool,
        min_days: Option<i64>,
        max_days: Option<i64>,
        daily_price: Option<i64>,
    ) -> Result<()> {
        if !enabled {
            return Ok(());
        }

        let (min, max) = match (min_days, max_days, daily_price) {
            (Some(min), Some(max), Some(price)) if min > 0 && max > 0 && price > 0 => (min, max),
            _ => {
                return Err(AppError::BadRequest(
                    "Custom period settings are required when custom period is enabled".to_string(),
                ))
            }
        };

        if min > max {
            return Err(AppError::BadRequest(
                "Minimum days must be less than or equal to maximum days".to_string(),
            ));
        }

        Ok(())
    }

    async fn invalidate_cache(&self) {
        self.cache.delete(LIST_CACHE_KEY).await;
        self.cache.delete(ACTIVE_CACHE_KEY).await;
    }
}

fn positive(value: Option<i64>) -> Option<i64> {
    value.filter(|v| *v > 0)
}

fn div_ceil(value: i64, divisor: i64) -> i64 {
    (value + divisor - 1) / divisor
}
