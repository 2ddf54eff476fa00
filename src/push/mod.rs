mod web_push;

use crate::configuration::PushClientSettings;
use crate::dispatch::DispatchOptions;
use crate::models::PushSubscription;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

pub use web_push::WebPushClient;

/// What the push service said about one delivery attempt.
///
/// `EndpointGone` is the only status with a side effect — the subscription
/// gets pruned. Anything that is neither acceptance nor a confirmed-dead
/// endpoint is a rejection and treated as transient by the dispatcher.
#[derive(Debug)]
pub enum DeliveryStatus {
    Accepted,
    EndpointGone,
    Rejected { status: u16, detail: String },
}

#[async_trait]
pub trait PushTransport: Send + Sync {
    /// Attempts one signed, encrypted delivery to the subscription's
    /// endpoint. Returns `Err` only for failures on our side of the wire
    /// (invalid stored credentials, connection errors); a response from the
    /// push service, good or bad, is a `DeliveryStatus`.
    async fn deliver(
        &self,
        subscription: &PushSubscription,
        payload: &[u8],
    ) -> Result<DeliveryStatus, anyhow::Error>;
}

/// The process-wide handle to the outbound push machinery, constructed once
/// in `startup::build` and managed by rocket. `transport` is `None` when no
/// VAPID key pair is configured: notifications are still recorded, receipts
/// still work, dispatch is skipped.
pub struct PushGateway {
    transport: Option<Arc<dyn PushTransport>>,
    vapid_public_key: Option<String>,
    attempt_timeout: Duration,
    max_concurrency: usize,
    batch_deadline: Option<Duration>,
}

impl PushGateway {
    pub fn new(transport: Option<Arc<dyn PushTransport>>, settings: &PushClientSettings) -> Self {
        Self {
            transport,
            vapid_public_key: settings.vapid_public_key.clone(),
            attempt_timeout: settings.attempt_timeout(),
            max_concurrency: settings.max_concurrency,
            batch_deadline: settings.batch_deadline(),
        }
    }

    pub fn transport(&self) -> Option<Arc<dyn PushTransport>> {
        self.transport.clone()
    }

    /// The VAPID public key browsers need to create a subscription.
    pub fn vapid_public_key(&self) -> Option<&str> {
        self.vapid_public_key.as_deref()
    }

    pub fn dispatch_options(&self) -> DispatchOptions {
        DispatchOptions {
            attempt_timeout: self.attempt_timeout,
            max_concurrency: self.max_concurrency,
            batch_deadline: self.batch_deadline,
        }
    }
}
