use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::*;
use crate::error::Result;

pub mod payment_repository;
pub mod tariff_repository;
pub mod user_repository;

pub use payment_repository::SqlitePaymentRepository;
pub use tariff_repository::SqliteTariffRepository;
pub use user_repository::SqliteUserRepository;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: NewUser) -> Result<User>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<User>>;
    async fn update(&self, id: Uuid, patch: UserPatch) -> Result<User>;
    async fn delete(&self, id: Uuid) -> Result<()>;
    async fn count(&self) -> Result<i64>;
}

#[async_trait]
pub trait TariffRepository: Send + Sync {
    async fn create(&self, plan: TariffPlan) -> Result<TariffPlan>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<TariffPlan>>;
    async fn find_by_code(&self, code: &str) -> Result<Option<TariffPlan>>;
    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<TariffPlan>>;
    async fn list(&self, filter: &TariffFilter, skip: i64, take: i64) -> Result<Vec<TariffPlan>>;
    async fn list_active(&self) -> Result<Vec<TariffPlan>>;
    async fn update(&self, plan: &TariffPlan) -> Result<TariffPlan>;
    async fn set_status(&self, id: Uuid, status: TariffStatus) -> Result<TariffPlan>;
    async fn count(&self, filter: &TariffFilter) -> Result<i64>;
}

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn create_intent(&self, intent: PaymentIntent) -> Result<PaymentIntent>;
    async fn find_intent_by_id(&self, id: Uuid) -> Result<Option<PaymentIntent>>;
    async fn list_intents_by_user(&self, user_id: Uuid) -> Result<Vec<PaymentIntent>>;
    async fn update_intent_status(
        &self,
        id: Uuid,
        status: PaymentIntentStatus,
    ) -> Result<PaymentIntent>;
    /// Marks every open intent whose deadline has passed as expired and
    /// returns how many rows changed.
    async fn expire_stale_intents(&self, now: DateTime<Utc>) -> Result<u64>;

    async fn create_payment(&self, payment: Payment) -> Result<Payment>;
    async fn find_payment_by_id(&self, id: Uuid) -> Result<Option<Payment>>;
    async fn list_payments(&self, user_id: Uuid, filter: &PaymentFilter) -> Result<Vec<Payment>>;
    async fn update_payment(&self, payment: &Payment) -> Result<Payment>;
    async fn count_payments(&self) -> Result<i64>;
    async fn completed_revenue_cents(&self) -> Result<i64>;
    async fn count_open_intents(&self) -> Result<i64>;
}
