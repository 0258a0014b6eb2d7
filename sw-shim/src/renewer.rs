//! Push Subscription Renewer
//!
//! On `pushsubscriptionchange` the worker re-subscribes and reports the new
//! endpoint to the registrar. The registrar call is best-effort: its failure
//! is logged and the new subscription is kept.

use std::cell::RefCell;

use serde::{Deserialize, Serialize};

use crate::error::{NetworkError, RenewError};
use crate::platform::WorkerPlatform;
use crate::registrar::Registrar;

/// Push subscription options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscribeOptions {
    /// Whether every push must show a notification
    pub user_visible_only: bool,
    /// Application server key (VAPID public key)
    pub application_server_key: Option<Vec<u8>>,
}

impl Default for SubscribeOptions {
    fn default() -> Self {
        Self {
            user_visible_only: true,
            application_server_key: None,
        }
    }
}

/// Subscription handed back by the push service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushSubscription {
    pub endpoint: String,
    /// Expiration time (ms since epoch)
    pub expiration_time: Option<u64>,
}

/// Endpoint this worker believes is registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushSubscriptionRecord {
    pub endpoint: String,
    pub registrar_acknowledged: bool,
}

/// Outcome of one renewal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenewalReport {
    pub endpoint: String,
    pub registrar: Result<(), NetworkError>,
}

pub struct PushSubscriptionRenewer {
    registrar: Registrar,
    record: RefCell<Option<PushSubscriptionRecord>>,
}

impl PushSubscriptionRenewer {
    pub fn new(registrar: Registrar) -> Self {
        Self {
            registrar,
            record: RefCell::new(None),
        }
    }

    pub fn record(&self) -> Option<PushSubscriptionRecord> {
        self.record.borrow().clone()
    }

    /// Re-subscribe, then report the new endpoint.
    pub async fn renew(
        &self,
        platform: &dyn WorkerPlatform,
        options: &SubscribeOptions,
    ) -> Result<RenewalReport, RenewError> {
        let subscription = match platform.subscribe_push(options).await {
            Ok(subscription) => subscription,
            Err(e) => {
                log::error!("[SW Push] Re-subscribe failed: {}", e);
                return Err(RenewError::Subscribe(e));
            }
        };
        log::info!("[SW Push] Re-subscribed: {}", subscription.endpoint);

        *self.record.borrow_mut() = Some(PushSubscriptionRecord {
            endpoint: subscription.endpoint.clone(),
            registrar_acknowledged: false,
        });

        let registrar = self.registrar.register_endpoint(&subscription.endpoint).await;
        match &registrar {
            Ok(()) => {
                if let Some(record) = self.record.borrow_mut().as_mut() {
                    if record.endpoint == subscription.endpoint {
                        record.registrar_acknowledged = true;
                    }
                }
                log::info!("[SW Push] Registrar acknowledged {}", subscription.endpoint);
            }
            Err(e) => log::warn!(
                "[SW Push] Registrar update failed, keeping subscription {}: {}",
                subscription.endpoint,
                e
            ),
        }

        Ok(RenewalReport {
            endpoint: subscription.endpoint,
            registrar,
        })
    }
}
