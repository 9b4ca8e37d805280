use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;

const STUB_GATEWAY_BASE: &str = "https://payment.example.com";

#[derive(Debug, Clone)]
pub struct ChargeOutcome {
    pub external_id: String,
    pub invoice_url: String,
    pub receipt_url: String,
}

#[derive(Debug, Clone)]
pub struct RefundTicket {
    pub refund_id: String,
    pub receipt_url: String,
}

/// Seam to the external payment gateway. The stub implementation stands
/// in until a real provider is wired up.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Hosted checkout page for a payment intent.
    fn checkout_url(&self, intent_id: Uuid) -> String;

    async fn charge(
        &self,
        intent_id: Uuid,
        amount_cents: i64,
        currency: &str,
    ) -> Result<ChargeOutcome>;

    async fn refund(&self, external_id: &str, amount_cents: i64) -> Result<RefundTicket>;
}

pub struct StubProvider {
    base_url: String,
}

impl StubProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

impl Default for StubProvider {
    fn default() -> Self {
        Self::new(STUB_GATEWAY_BASE)
    }
}

fn short_ref() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

#[async_trait]
impl PaymentProvider for StubProvider {
    fn checkout_url(&self, intent_id: Uuid) -> String {
        format!("{}/{}", self.base_url, intent_id)
    }

    async fn charge(
        &self,
        intent_id: Uuid,
        amount_cents: i64,
        currency: &str,
    ) -> Result<ChargeOutcome> {
        tracing::debug!(
            "Stub charge of {} {} for intent {}",
            amount_cents,
            currency,
            intent_id
        );
        Ok(ChargeOutcome {
            external_id: format!("ext-{}", short_ref()),
            invoice_url: format!("{}/invoice/{}", self.base_url, short_ref()),
            receipt_url: format!("{}/receipt/{}", self.base_url, short_ref()),
        })
    }

    async fn refund(&self, external_id: &str, amount_cents: i64) -> Result<RefundTicket> {
        tracing::debug!("Stub refund of {} cents against {}", amount_cents, external_id);
        Ok(RefundTicket {
            refund_id: format!("ref-{}", short_ref()),
            receipt_url: format!("{}/refund/{}", self.base_url, short_ref()),
        })
    }
}
