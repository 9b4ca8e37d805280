use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TariffType {
    #[default]
    Basic,
    Premium,
    Business,
    Temporary,
}

impl TariffType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TariffType::Basic => "BASIC",
            TariffType::Premium => "PREMIUM",
            TariffType::Business => "BUSINESS",
            TariffType::Temporary => "TEMPORARY",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "BASIC" => Some(TariffType::Basic),
            "PREMIUM" => Some(TariffType::Premium),
            "BUSINESS" => Some(TariffType::Business),
            "TEMPORARY" => Some(TariffType::Temporary),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TariffStatus {
    #[default]
    Draft,
    Active,
    Archived,
}

impl TariffStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TariffStatus::Draft => "DRAFT",
            TariffStatus::Active => "ACTIVE",
            TariffStatus::Archived => "ARCHIVED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "DRAFT" => Some(TariffStatus::Draft),
            "ACTIVE" => Some(TariffStatus::Active),
            "ARCHIVED" => Some(TariffStatus::Archived),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillingPeriod {
    Day,
    Week,
    Month,
    Quarter,
    Year,
    Custom,
}

impl BillingPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingPeriod::Day => "DAY",
            BillingPeriod::Week => "WEEK",
            BillingPeriod::Month => "MONTH",
            BillingPeriod::Quarter => "QUARTER",
            BillingPeriod::Year => "YEAR",
            BillingPeriod::Custom => "CUSTOM",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "DAY" => Some(BillingPeriod::Day),
            "WEEK" => Some(BillingPeriod::Week),
            "MONTH" => Some(BillingPeriod::Month),
            "QUARTER" => Some(BillingPeriod::Quarter),
            "YEAR" => Some(BillingPeriod::Year),
            "CUSTOM" => Some(BillingPeriod::Custom),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TariffLimits {
    #[validate(range(min = 1, message = "devices_count must be at least 1"))]
    pub devices_count: i64,
    #[validate(range(min = 1, message = "bandwidth_mbps must be at least 1"))]
    pub bandwidth_mbps: Option<i64>,
    #[validate(range(min = 1, message = "data_limit_gb must be at least 1"))]
    pub data_limit_gb: Option<i64>,
}

/// A sellable plan. Prices are integer cents; a missing price means the
/// plan cannot be billed for that period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TariffPlan {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub features: Vec<String>,
    pub price_daily_cents: Option<i64>,
    pub price_monthly_cents: Option<i64>,
    pub price_quarterly_cents: Option<i64>,
    pub price_annually_cents: Option<i64>,
    pub available_billing_periods: Vec<BillingPeriod>,
    pub custom_period_enabled: bool,
    pub custom_period_min_days: Option<i64>,
    pub custom_period_max_days: Option<i64>,
    pub custom_period_daily_price_cents: Option<i64>,
    #[serde(rename = "type")]
    pub plan_type: TariffType,
    pub status: TariffStatus,
    pub limits: TariffLimits,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTariffRequest {
    #[validate(length(min = 1, max = 64, message = "code is required"))]
    pub code: String,
    #[validate(length(min = 1, max = 128, message = "name is required"))]
    pub name: String,
    pub description: Option<String>,
    #[validate(length(min = 1, message = "At least one feature is required"))]
    pub features: Vec<String>,
    #[validate(range(min = 1))]
    pub price_daily_cents: Option<i64>,
    #[validate(range(min = 1))]
    pub price_monthly_cents: Option<i64>,
    #[validate(range(min = 1))]
    pub price_quarterly_cents: Option<i64>,
    #[validate(range(min = 1))]
    pub price_annually_cents: Option<i64>,
    #[serde(default)]
    pub available_billing_periods: Vec<BillingPeriod>,
    #[serde(default)]
    pub custom_period_enabled: bool,
    pub custom_period_min_days: Option<i64>,
    pub custom_period_max_days: Option<i64>,
    #[validate(range(min = 1))]
    pub custom_period_daily_price_cents: Option<i64>,
    #[serde(rename = "type", default)]
    pub plan_type: TariffType,
    pub status: Option<TariffStatus>,
    #[validate(nested)]
    pub limits: TariffLimits,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTemporaryTariffRequest {
    #[validate(length(min = 1, max = 128, message = "name is required"))]
    pub name: String,
    #[validate(range(min = 1, max = 90, message = "duration_days must be between 1 and 90"))]
    pub duration_days: i64,
    #[validate(range(min = 1, message = "price_cents must be positive"))]
    pub price_cents: i64,
    #[validate(length(min = 1, message = "At least one feature is required"))]
    pub features: Vec<String>,
    #[validate(nested)]
    pub limits: TariffLimits,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateTariffRequest {
    #[validate(length(min = 1, max = 64))]
    pub code: Option<String>,
    #[validate(length(min = 1, max = 128))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(length(min = 1))]
    pub features: Option<Vec<String>>,
    #[validate(range(min = 1))]
    pub price_daily_cents: Option<i64>,
    #[validate(range(min = 1))]
    pub price_monthly_cents: Option<i64>,
    #[validate(range(min = 1))]
    pub price_quarterly_cents: Option<i64>,
    #[validate(range(min = 1))]
    pub price_annually_cents: Option<i64>,
    pub available_billing_periods: Option<Vec<BillingPeriod>>,
    pub custom_period_enabled: Option<bool>,
    pub custom_period_min_days: Option<i64>,
    pub custom_period_max_days: Option<i64>,
    #[validate(range(min = 1))]
    pub custom_period_daily_price_cents: Option<i64>,
    #[serde(rename = "type")]
    pub plan_type: Option<TariffType>,
    #[validate(nested)]
    pub limits: Option<TariffLimits>,
}

#[derive(Debug, Clone, Default)]
pub struct TariffFilter {
    pub types: Option<Vec<TariffType>>,
    pub statuses: Option<Vec<TariffStatus>>,
    pub billing_periods: Option<Vec<BillingPeriod>>,
    pub search: Option<String>,
    pub custom_period_enabled: Option<bool>,
}

impl TariffFilter {
    pub fn is_empty(&self) -> bool {
        self.types.is_none()
            && self.statuses.is_none()
            && self.billing_periods.is_none()
            && self.search.is_none()
            && self.custom_period_enabled.is_none()
    }
}

/// Price for one plan over a concrete duration. The discount fields are
/// informational: they report savings against paying month by month.
#[derive(Debug, Clone, Serialize)]
pub struct PriceQuote {
    pub plan: TariffPlan,
    pub duration_days: i64,
    pub billing_period: BillingPeriod,
    pub original_price_cents: i64,
    pub final_price_cents: i64,
    pub has_discount: bool,
    pub discount_percent: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TariffComparison {
    pub plans: Vec<TariffPlan>,
    pub all_features: Vec<String>,
}
