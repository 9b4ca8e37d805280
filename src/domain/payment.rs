use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::tariff::BillingPeriod;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentIntentStatus {
    Created,
    Processing,
    RequiresConfirmation,
    RequiresPaymentMethod,
    RequiresAction,
    Completed,
    Cancelled,
    Expired,
}

impl PaymentIntentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentIntentStatus::Created => "CREATED",
            PaymentIntentStatus::Processing => "PROCESSING",
            PaymentIntentStatus::RequiresConfirmation => "REQUIRES_CONFIRMATION",
            PaymentIntentStatus::RequiresPaymentMethod => "REQUIRES_PAYMENT_METHOD",
            PaymentIntentStatus::RequiresAction => "REQUIRES_ACTION",
            PaymentIntentStatus::Completed => "COMPLETED",
            PaymentIntentStatus::Cancelled => "CANCELLED",
            PaymentIntentStatus::Expired => "EXPIRED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "CREATED" => Some(PaymentIntentStatus::Created),
            "PROCESSING" => Some(PaymentIntentStatus::Processing),
            "REQUIRES_CONFIRMATION" => Some(PaymentIntentStatus::RequiresConfirmation),
            "REQUIRES_PAYMENT_METHOD" => Some(PaymentIntentStatus::RequiresPaymentMethod),
            "REQUIRES_ACTION" => Some(PaymentIntentStatus::RequiresAction),
            "COMPLETED" => Some(PaymentIntentStatus::Completed),
            "CANCELLED" => Some(PaymentIntentStatus::Cancelled),
            "EXPIRED" => Some(PaymentIntentStatus::Expired),
            _ => None,
        }
    }

    /// An intent that can still move towards payment.
    pub fn is_open(&self) -> bool {
        matches!(
            self,
            PaymentIntentStatus::Created | PaymentIntentStatus::RequiresPaymentMethod
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Cancelled,
    Refunded,
    PartiallyRefunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Completed => "COMPLETED",
            PaymentStatus::Failed => "FAILED",
            PaymentStatus::Cancelled => "CANCELLED",
            PaymentStatus::Refunded => "REFUNDED",
            PaymentStatus::PartiallyRefunded => "PARTIALLY_REFUNDED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(PaymentStatus::Pending),
            "COMPLETED" => Some(PaymentStatus::Completed),
            "FAILED" => Some(PaymentStatus::Failed),
            "CANCELLED" => Some(PaymentStatus::Cancelled),
            "REFUNDED" => Some(PaymentStatus::Refunded),
            "PARTIALLY_REFUNDED" => Some(PaymentStatus::PartiallyRefunded),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    CreditCard,
    Paypal,
    Crypto,
    BankTransfer,
    ApplePay,
    GooglePay,
    Telegram,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::CreditCard => "CREDIT_CARD",
            PaymentMethod::Paypal => "PAYPAL",
            PaymentMethod::Crypto => "CRYPTO",
            PaymentMethod::BankTransfer => "BANK_TRANSFER",
            PaymentMethod::ApplePay => "APPLE_PAY",
            PaymentMethod::GooglePay => "GOOGLE_PAY",
            PaymentMethod::Telegram => "TELEGRAM",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "CREDIT_CARD" => Some(PaymentMethod::CreditCard),
            "PAYPAL" => Some(PaymentMethod::Paypal),
            "CRYPTO" => Some(PaymentMethod::Crypto),
            "BANK_TRANSFER" => Some(PaymentMethod::BankTransfer),
            "APPLE_PAY" => Some(PaymentMethod::ApplePay),
            "GOOGLE_PAY" => Some(PaymentMethod::GooglePay),
            "TELEGRAM" => Some(PaymentMethod::Telegram),
            _ => None,
        }
    }
}

/// A declared intention to pay, created before the gateway is involved.
/// Intents expire if they are not processed within their lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: Uuid,
    pub user_id: Uuid,
    pub subscription_id: Option<String>,
    pub tariff_plan_id: Option<Uuid>,
    pub amount_cents: i64,
    pub currency: String,
    pub status: PaymentIntentStatus,
    pub available_payment_methods: Option<Vec<PaymentMethod>>,
    pub description: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub payment_url: Option<String>,
    pub return_url: Option<String>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub subscription_id: Option<String>,
    pub tariff_plan_id: Option<Uuid>,
    pub amount_cents: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub payment_method: Option<PaymentMethod>,
    pub period_type: Option<BillingPeriod>,
    pub period_days: Option<i64>,
    pub external_id: Option<String>,
    pub invoice_url: Option<String>,
    pub receipt_url: Option<String>,
    pub description: Option<String>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePaymentIntentRequest {
    pub subscription_id: Option<String>,
    pub tariff_plan_id: Option<Uuid>,
    #[validate(range(min = 1, message = "amount_cents must be positive"))]
    pub amount_cents: i64,
    pub currency: Option<String>,
    #[validate(length(min = 1, message = "preferred_payment_methods must not be empty"))]
    pub preferred_payment_methods: Option<Vec<PaymentMethod>>,
    pub description: Option<String>,
    #[validate(url(message = "return_url must be a valid URL"))]
    pub return_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ProcessPaymentRequest {
    pub payment_intent_id: Uuid,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub payment_data: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RefundRequest {
    pub payment_id: Uuid,
    #[validate(range(min = 1, message = "amount_cents must be positive"))]
    pub amount_cents: Option<i64>,
    pub reason: Option<String>,
    #[serde(default)]
    pub full_refund: bool,
}

/// Outcome of a refund, echoing the gateway ticket.
#[derive(Debug, Clone, Serialize)]
pub struct RefundOutcome {
    pub refund_id: String,
    pub payment_id: Uuid,
    pub amount_cents: i64,
    pub currency: String,
    pub payment_status: PaymentStatus,
    pub successful: bool,
    pub refund_reason: Option<String>,
    pub receipt_url: String,
    pub processed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct PaymentFilter {
    pub statuses: Option<Vec<PaymentStatus>>,
    pub methods: Option<Vec<PaymentMethod>>,
    pub subscription_id: Option<String>,
    pub tariff_plan_id: Option<Uuid>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub search: Option<String>,
}

impl PaymentFilter {
    pub fn is_empty(&self) -> bool {
        self.statuses.is_none()
            && self.methods.is_none()
            && self.subscription_id.is_none()
            && self.tariff_plan_id.is_none()
            && self.date_from.is_none()
            && self.date_to.is_none()
            && self.search.is_none()
    }
}
