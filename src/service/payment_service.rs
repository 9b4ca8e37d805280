use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::{
    cache::CacheService,
    domain::{
        CreatePaymentIntentRequest, Payment, PaymentFilter, PaymentIntent, PaymentIntentStatus,
        PaymentStatus, ProcessPaymentRequest, RefundOutcome, RefundRequest,
    },
    error::{AppError, Result},
    payments::PaymentProvider,
    repository::{PaymentRepository, UserRepository},
};

const CACHE_TTL_SECS: u64 = 300;
const PAYMENT_CACHE_KEY: &str = "payment";
const INTENT_CACHE_KEY: &str = "payment_intent";
const INTENT_LIFETIME_HOURS: i64 = 24;

pub struct PaymentService {
    repo: Arc<dyn PaymentRepository>,
    users: Arc<dyn UserRepository>,
    provider: Arc<dyn PaymentProvider>,
    cache: Arc<CacheService>,
}

impl PaymentService {
    pub fn new(
        repo: Arc<dyn PaymentRepository>,
        users: Arc<dyn UserRepository>,
        provider: Arc<dyn PaymentProvider>,
        cache: Arc<CacheService>,
    ) -> Self {
        Self {
            repo,
            users,
            provider,
            cache,
        }
    }

    pub async fn create_intent(
        &self,
        user_id: Uuid,
        request: CreatePaymentIntentRequest,
    ) -> Result<PaymentIntent> {
        if self.users.find_by_id(user_id).await?.is_none() {
            return Err(AppError::NotFound("User not found".to_string()));
        }

        let id = Uuid::new_v4();
        let now = Utc::now();
        let intent = PaymentIntent {
            id,
            user_id,
            subscription_id: request.subscription_id,
            tariff_plan_id: request.tariff_plan_id,
            amount_cents: request.amount_cents,
            currency: request.currency.unwrap_or_else(|| "USD".to_string()),
            status: PaymentIntentStatus::Created,
            available_payment_methods: request.preferred_payment_methods,
            description: request.description,
            expires_at: now + Duration::hours(INTENT_LIFETIME_HOURS),
            payment_url: Some(self.provider.checkout_url(id)),
            return_url: request.return_url,
            metadata: json!({
                "created_at": now.to_rfc3339(),
                // Placeholder until the client address is plumbed through.
                "ip_address": "127.0.0.1",
            }),
            created_at: now,
            updated_at: now,
        };

        let intent = self.repo.create_intent(intent).await?;
        self.cache.delete(&self.intents_key(user_id)).await;
        tracing::info!("Payment intent created: {} for user {}", intent.id, user_id);
        Ok(intent)
    }

    pub async fn get_intent(&self, user_id: Uuid, id: Uuid) -> Result<PaymentIntent> {
        let intent = self
            .repo
            .find_intent_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Payment intent not found".to_string()))?;

        // Foreign intents read as missing rather than forbidden.
        if intent.user_id != user_id {
            return Err(AppError::NotFound("Payment intent not found".to_string()));
        }

        Ok(intent)
    }

    pub async fn list_intents(&self, user_id: Uuid) -> Result<Vec<PaymentIntent>> {
        let key = self.intents_key(user_id);
        if let Some(cached) = self.cache.get::<Vec<PaymentIntent>>(&key).await {
            return Ok(cached);
        }

        let intents = self.repo.list_intents_by_user(user_id).await?;
        self.cache.set(&key, &intents, CACHE_TTL_SECS).await;
        Ok(intents)
    }

    pub async fn cancel_intent(&self, user_id: Uuid, id: Uuid) -> Result<PaymentIntent> {
        let intent = self.get_intent(user_id, id).await?;

        if !intent.status.is_open() {
            return Err(AppError::BadRequest(format!(
                "Cannot cancel payment intent in status: {}",
                intent.status.as_str()
            )));
        }

        let intent = self
            .repo
            .update_intent_status(intent.id, PaymentIntentStatus::Cancelled)
            .await?;
        self.cache.delete(&self.intents_key(user_id)).await;
        tracing::info!("Payment intent cancelled: {}", intent.id);
        Ok(intent)
    }

    /// Settles an open intent through the gateway and records the
    /// resulting payment. An intent past its deadline is marked expired
    /// here rather than waiting for the background sweep.
    pub async fn process(&self, user_id: Uuid, request: ProcessPaymentRequest) -> Result<Payment> {
        let intent = self
            .repo
            .find_intent_by_id(request.payment_intent_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Payment intent not found".to_string()))?;

        if intent.user_id != user_id {
            return Err(AppError::BadRequest(
                "Payment intent does not belong to this user".to_string(),
            ));
        }

        if !intent.status.is_open() {
            return Err(AppError::BadRequest(format!(
                "Payment intent is in invalid state: {}",
                intent.status.as_str()
            )));
        }

        if intent.expires_at < Utc::now() {
            self.repo
                .update_intent_status(intent.id, PaymentIntentStatus::Expired)
                .await?;
            self.cache.delete(&self.intents_key(user_id)).await;
            return Err(AppError::BadRequest(
                "Payment intent has expired".to_string(),
            ));
        }

        let charge = self
            .provider
            .charge(intent.id, intent.amount_cents, &intent.currency)
            .await?;

        self.repo
            .update_intent_status(intent.id, PaymentIntentStatus::Completed)
            .await?;

        let now = Utc::now();
        let payment = Payment {
            id: Uuid::new_v4(),
            user_id,
            subscription_id: intent.subscription_id.clone(),
            tariff_plan_id: intent.tariff_plan_id,
            amount_cents: intent.amount_cents,
            currency: intent.currency.clone(),
            status: PaymentStatus::Completed,
            payment_method: Some(request.payment_method),
            period_type: None,
            period_days: None,
            external_id: Some(charge.external_id),
            invoice_url: Some(charge.invoice_url),
            receipt_url: Some(charge.receipt_url),
            description: intent.description.clone(),
            metadata: json!({
                "payment_intent_id": intent.id,
                "processed_at": now.to_rfc3339(),
                "payment_data": request.payment_data,
            }),
            created_at: now,
            updated_at: now,
        };

        let payment = match self.repo.create_payment(payment).await {
            Ok(payment) => payment,
            Err(e) => {
                tracing::error!("Failed to record payment for intent {}: {}", intent.id, e);
                // Return the intent to a retryable state.
                self.repo
                    .update_intent_status(intent.id, PaymentIntentStatus::RequiresPaymentMethod)
                    .await?;
                self.invalidate_cache(user_id).await;
                return Err(AppError::Payment("Failed to process payment".to_string()));
            }
        };

        self.invalidate_cache(user_id).await;
        tracing::info!(
            "Payment processed successfully: {} for intent {}",
            payment.id,
            intent.id
        );
        Ok(payment)
    }

    /// Refunds a completed payment, fully or in part. Admins may refund
    /// on behalf of any user; the amount can never exceed what was paid.
    pub async fn refund(
        &self,
        user_id: Uuid,
        is_admin: bool,
        request: RefundRequest,
    ) -> Result<RefundOutcome> {
        let payment = self
            .repo
            .find_payment_by_id(request.payment_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Payment not found".to_string()))?;

        if payment.user_id != user_id && !is_admin {
            return Err(AppError::BadRequest(
                "Payment does not belong to this user".to_string(),
            ));
        }

        if payment.status != PaymentStatus::Completed {
            return Err(AppError::BadRequest(format!(
                "Cannot refund payment with status: {}",
                payment.status.as_str()
            )));
        }

        let refund_amount = if request.full_refund {
            payment.amount_cents
        } else {
            request.amount_cents.unwrap_or(payment.amount_cents)
        };

        if refund_amount <= 0 || refund_amount > payment.amount_cents {
            return Err(AppError::BadRequest("Invalid refund amount".to_string()));
        }

        let new_status = if refund_amount == payment.amount_cents {
            PaymentStatus::Refunded
        } else {
            PaymentStatus::PartiallyRefunded
        };

        let ticket = self
            .provider
            .refund(
                payment.external_id.as_deref().unwrap_or_default(),
                refund_amount,
            )
            .await?;

        let now = Utc::now();
        let mut updated = payment.clone();
        updated.status = new_status;
        updated.metadata = merge_metadata(
            payment.metadata,
            json!({
                "refunded_at": now.to_rfc3339(),
                "refund_reason": request.reason.clone(),
                "refund_amount_cents": refund_amount,
            }),
        );
        let updated = self.repo.update_payment(&updated).await?;

        self.invalidate_cache(updated.user_id).await;
        tracing::info!("Payment refunded: {}, amount: {}", updated.id, refund_amount);

        Ok(RefundOutcome {
            refund_id: ticket.refund_id,
            payment_id: updated.id,
            amount_cents: refund_amount,
            currency: updated.currency,
            payment_status: updated.status,
            successful: true,
            refund_reason: request.reason,
            receipt_url: ticket.receipt_url,
            processed_at: now,
        })
    }

    /// Lists the user's payments; the unfiltered listing is served from
    /// cache.
    pub async fn list_payments(&self, user_id: Uuid, filter: &PaymentFilter) -> Result<Vec<Payment>> {
        let unfiltered = filter.is_empty();
        let key = self.payments_key(user_id);

        if unfiltered {
            if let Some(cached) = self.cache.get::<Vec<Payment>>(&key).await {
                return Ok(cached);
            }
        }

        let payments = self.repo.list_payments(user_id, filter).await?;

        if unfiltered {
            self.cache.set(&key, &payments, CACHE_TTL_SECS).await;
        }

        Ok(payments)
    }

    pub async fn get_payment(&self, user_id: Uuid, is_admin: bool, id: Uuid) -> Result<Payment> {
        let payment = self
            .repo
            .find_payment_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Payment not found".to_string()))?;

        if payment.user_id != user_id && !is_admin {
            return Err(AppError::Forbidden);
        }

        Ok(payment)
    }

    pub async fn expire_stale_intents(&self) -> Result<u64> {
        let expired = self.repo.expire_stale_intents(Utc::now()).await?;
        if expired > 0 {
            tracing::info!("Marked {} stale payment intents as expired", expired);
        }
        Ok(expired)
    }

    pub async fn count_payments(&self) -> Result<i64> {
        self.repo.count_payments().await
    }

    pub async fn completed_revenue_cents(&self) -> Result<i64> {
        self.repo.completed_revenue_cents().await
    }

    pub async fn open_intent_count(&self) -> Result<i64> {
        self.repo.count_open_intents().await
    }

    fn payments_key(&self, user_id: Uuid) -> String {
        self.cache.key(&[PAYMENT_CACHE_KEY, &user_id.to_string()])
    }

    fn intents_key(&self, user_id: Uuid) -> String {
        self.cache.key(&[INTENT_CACHE_KEY, &user_id.to_string()])
    }

    async fn invalidate_cache(&self, user_id: Uuid) {
        self.cache.delete(&self.payments_key(user_id)).await;
        self.cache.delete(&self.intents_key(user_id)).await;
    }
}

fn merge_metadata(base: serde_json::Value, extra: serde_json::Value) -> serde_json::Value {
    let mut map = match base {
        serde_json::Value::Object(map) => map,
        _ => serde_json::Map::new(),
    };
    if let serde_json::Value::Object(extra) = extra {
        for (key, value) in extra {
            map.insert(key, value);
        }
    }
    serde_json::Value::Object(map)
}
