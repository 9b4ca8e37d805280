pub mod payment_service;
pub mod status_service;
pub mod tariff_service;
pub mod user_service;

use std::sync::Arc;

use crate::auth::AuthService;
use crate::cache::CacheService;
use crate::config::Settings;
use crate::payments::PaymentProvider;
use crate::repository::*;
use payment_service::PaymentService;
use status_service::StatusService;
use tariff_service::TariffService;
use user_service::UserService;

pub use status_service::VpnStatus;

pub struct ServiceContext {
    pub users: Arc<UserService>,
    pub tariffs: Arc<TariffService>,
    pub payments: Arc<PaymentService>,
    pub status: Arc<StatusService>,
    pub auth_service: Arc<AuthService>,
    pub user_repo: Arc<dyn UserRepository>,
}

impl ServiceContext {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        tariff_repo: Arc<dyn TariffRepository>,
        payment_repo: Arc<dyn PaymentRepository>,
        provider: Arc<dyn PaymentProvider>,
        auth_service: Arc<AuthService>,
        cache: Arc<CacheService>,
        settings: Arc<Settings>,
    ) -> Self {
        let users = Arc::new(UserService::new(user_repo.clone(), auth_service.clone()));
        let tariffs = Arc::new(TariffService::new(tariff_repo, cache.clone()));
        let payments = Arc::new(PaymentService::new(
            payment_repo,
            user_repo.clone(),
            provider,
            cache.clone(),
        ));
        let status = Arc::new(StatusService::new(cache, settings));

        Self {
            users,
            tariffs,
            payments,
            status,
            auth_service,
            user_repo,
        }
    }
}
