use crate::models::{Notification, PushSubscription};
use crate::push::{DeliveryStatus, PushTransport};
use anyhow::Context;
use futures::stream::StreamExt;
use std::sync::Mutex;
use std::time::Duration;

pub struct DispatchOptions {
    pub attempt_timeout: Duration,
    pub max_concurrency: usize,
    pub batch_deadline: Option<Duration>,
}

/// Classified result of a single delivery attempt.
#[derive(Debug, PartialEq, Eq)]
enum AttemptOutcome {
    Delivered,
    EndpointGone,
    Transient,
}

/// What happened to one fan-out. Per-subscription failures live here as
/// counts and prune candidates — they are never errors.
#[derive(Debug, Default)]
pub struct DispatchReport {
    pub attempted: usize,
    pub delivered: usize,
    pub transient_failures: usize,
    /// Subscriptions whose endpoint the push service reported permanently
    /// gone; the caller removes these from the subscription store.
    pub gone_subscriptions: Vec<PushSubscription>,
}

/// The single payload serialized for every subscription in a batch: the
/// notification's public fields and nothing else. Credentials never leave
/// the subscription row.
pub fn build_payload(notification: &Notification) -> Result<Vec<u8>, serde_json::Error> {
    #[derive(serde::Serialize)]
    struct PushPayload<'a> {
        notification_id: &'a uuid::Uuid,
        title: &'a str,
        body: &'a str,
        url: &'a str,
        #[serde(skip_serializing_if = "Option::is_none")]
        icon: Option<&'a str>,
    }

    serde_json::to_vec(&PushPayload {
        notification_id: &notification.id,
        title: &notification.title,
        body: &notification.body,
        url: &notification.url,
        icon: notification.icon.as_deref(),
    })
}

/// Fans one notification out to a set of subscriptions.
///
/// Every attempt runs concurrently (bounded by `max_concurrency`) under its
/// own timeout, and the call returns only once all of them have resolved —
/// or once the optional batch deadline cuts the barrier off, in which case
/// the unresolved attempts count as transient failures. Individual failures
/// never fail the batch.
#[tracing::instrument(
    name = "Dispatch a notification",
    skip(transport, notification, subscriptions, options),
    fields(notification_id = %notification.id, subscriptions = subscriptions.len())
)]
pub async fn dispatch(
    transport: &dyn PushTransport,
    notification: &Notification,
    subscriptions: Vec<PushSubscription>,
    options: &DispatchOptions,
) -> Result<DispatchReport, anyhow::Error> {
    let payload = build_payload(notification).context("Failed to serialize the push payload.")?;
    let attempted = subscriptions.len();

    let outcomes: Mutex<Vec<(PushSubscription, AttemptOutcome)>> =
        Mutex::new(Vec::with_capacity(attempted));
    {
        let payload = payload.as_slice();
        let outcomes = &outcomes;
        let fan_out = futures::stream::iter(subscriptions).for_each_concurrent(
            options.max_concurrency.max(1),
            |subscription| async move {
                let outcome =
                    attempt_delivery(transport, &subscription, payload, options.attempt_timeout)
                        .await;
                outcomes.lock().unwrap().push((subscription, outcome));
            },
        );

        match options.batch_deadline {
            Some(deadline) => {
                if tokio::time::timeout(deadline, fan_out).await.is_err() {
                    tracing::warn!(
                        "Batch deadline elapsed before every delivery attempt resolved."
                    );
                }
            }
            None => fan_out.await,
        }
    }

    let mut report = DispatchReport {
        attempted,
        ..DispatchReport::default()
    };
    for (subscription, outcome) in outcomes.into_inner().unwrap() {
        match outcome {
            AttemptOutcome::Delivered => report.delivered += 1,
            AttemptOutcome::EndpointGone => report.gone_subscriptions.push(subscription),
            AttemptOutcome::Transient => report.transient_failures += 1,
        }
    }
    // Attempts the batch deadline cut off never recorded an outcome.
    let resolved =
        report.delivered + report.gone_subscriptions.len() + report.transient_failures;
    report.transient_failures += attempted - resolved;

    Ok(report)
}

async fn attempt_delivery(
    transport: &dyn PushTransport,
    subscription: &PushSubscription,
    payload: &[u8],
    attempt_timeout: Duration,
) -> AttemptOutcome {
    match tokio::time::timeout(attempt_timeout, transport.deliver(subscription, payload)).await {
        Ok(Ok(DeliveryStatus::Accepted)) => AttemptOutcome::Delivered,
        Ok(Ok(DeliveryStatus::EndpointGone)) => {
            tracing::info!(
                endpoint = %subscription.endpoint,
                "The push service reported the endpoint gone; the subscription will be pruned."
            );
            AttemptOutcome::EndpointGone
        }
        Ok(Ok(DeliveryStatus::Rejected { status, detail })) => {
            tracing::warn!(
                endpoint = %subscription.endpoint,
                status,
                detail = %detail,
                "Push delivery was rejected; leaving the subscription in place."
            );
            AttemptOutcome::Transient
        }
        Ok(Err(error)) => {
            tracing::warn!(
                endpoint = %subscription.endpoint,
                error.cause_chain = ?error,
                "Push delivery failed; leaving the subscription in place."
            );
            AttemptOutcome::Transient
        }
        Err(_) => {
            tracing::warn!(
                endpoint = %subscription.endpoint,
                "Push delivery timed out; leaving the subscription in place."
            );
            AttemptOutcome::Transient
        }
    }
}
