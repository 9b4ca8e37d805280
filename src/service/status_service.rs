use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{cache::CacheService, config::Settings, error::Result};

const VPN_STATUS_KEY: &str = "vpn_status";

/// Snapshot of the VPN host health as reported to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VpnStatus {
    pub host: String,
    pub message: String,
    pub checked_at: DateTime<Utc>,
}

pub struct StatusService {
    cache: Arc<CacheService>,
    settings: Arc<Settings>,
}

impl StatusService {
    pub fn new(cache: Arc<CacheService>, settings: Arc<Settings>) -> Self {
        Self { cache, settings }
    }

    /// Reports the VPN host status, refreshed at most once per cache TTL.
    pub async fn vpn_status(&self) -> Result<VpnStatus> {
        let host = self.settings.app.vpn_host.clone();
        let ttl = self.settings.cache.ttl_secs;

        self.cache
            .get_or_set(VPN_STATUS_KEY, ttl, || async move {
                let message = format!("VPN server at {} is running", host);
                Ok(VpnStatus {
                    host,
                    message,
                    checked_at: Utc::now(),
                })
            })
            .await
    }
}
