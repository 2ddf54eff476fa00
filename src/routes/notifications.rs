use crate::dispatch;
use crate::domain::NotificationTitle;
use crate::guards::AuthenticatedUser;
use crate::models::{NewNotification, Notification, PushSubscription};
use crate::push::PushGateway;
use crate::routes::error_chain_fmt;
use crate::startup::PushgateDbConn;
use crate::store;
use anyhow::Context;
use chrono::Utc;
use diesel::PgConnection;
use rocket::http::Status;
use rocket::response::Responder;
use rocket::serde::json::Json;
use rocket::{Request, Response, State};
use uuid::Uuid;

#[derive(serde::Deserialize)]
pub struct BodyData {
    title: String,
    body: String,
    url: String,
    icon: Option<String>,
    target_user_ids: Option<Vec<Uuid>>,
}

#[derive(serde::Serialize)]
pub struct PublishResponse {
    pub id: Uuid,
    pub delivery: DeliverySummary,
}

#[derive(serde::Serialize)]
pub struct DeliverySummary {
    pub status: &'static str,
    pub attempted: usize,
    pub delivered: usize,
    pub pruned: usize,
    pub failed: usize,
}

/// Persists a notification record, then fans it out to the matching
/// subscriptions: the explicit target set if one was given, every known
/// subscription otherwise. Delivery failures never fail the request; dead
/// endpoints reported by the push service are pruned before returning.
///
/// Publishing is open to any known user — operator roles live with the
/// identity provider, not here.
#[tracing::instrument(
    name = "Publish a notification",
    skip(body, conn, gateway, _publisher),
    fields(title = %body.title)
)]
#[post("/notifications", data = "<body>")]
pub async fn publish_notification(
    body: Json<BodyData>,
    conn: PushgateDbConn,
    gateway: &State<PushGateway>,
    _publisher: AuthenticatedUser,
) -> Result<Json<PublishResponse>, PublishError> {
    let body = body.into_inner();
    let title = NotificationTitle::parse(body.title).map_err(PublishError::ValidationError)?;
    if body.url.trim().is_empty() {
        return Err(PublishError::ValidationError(
            "A notification needs a deep link to open on click.".to_string(),
        ));
    }

    let notification = persist_notification(
        &conn,
        title,
        body.body,
        body.url,
        body.icon,
        body.target_user_ids,
    )
    .await
    .context("Failed to persist the notification record.")?;

    let transport = match gateway.transport() {
        Some(transport) => transport,
        None => {
            tracing::info!(
                notification_id = %notification.id,
                "The push transport is not configured; skipping dispatch."
            );
            return Ok(Json(PublishResponse {
                id: notification.id,
                delivery: DeliverySummary {
                    status: "not_configured",
                    attempted: 0,
                    delivered: 0,
                    pruned: 0,
                    failed: 0,
                },
            }));
        }
    };

    let subscriptions = fetch_target_subscriptions(&conn, &notification)
        .await
        .context("Failed to fetch the target subscriptions from the database.")?;

    let report = dispatch::dispatch(
        transport.as_ref(),
        &notification,
        subscriptions,
        &gateway.dispatch_options(),
    )
    .await
    .context("Failed to dispatch the notification.")?;

    let pruned = report.gone_subscriptions.len();
    prune_gone_subscriptions(&conn, report.gone_subscriptions).await;

    Ok(Json(PublishResponse {
        id: notification.id,
        delivery: DeliverySummary {
            status: "dispatched",
            attempted: report.attempted,
            delivered: report.delivered,
            pruned,
            failed: report.transient_failures,
        },
    }))
}

#[derive(thiserror::Error)]
pub enum PublishError {
    #[error("{0}")]
    ValidationError(String),
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl std::fmt::Debug for PublishError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl<'r> Responder<'r, 'static> for PublishError {
    fn respond_to(self, _request: &'r Request<'_>) -> rocket::response::Result<'static> {
        tracing::warn!("PublishError: {:?}", self);
        Response::build()
            .status(match self {
                PublishError::ValidationError(_) => Status::BadRequest,
                PublishError::UnexpectedError(_) => Status::InternalServerError,
            })
            .ok()
    }
}

#[tracing::instrument(name = "Saving the notification record", skip(conn, title, body, url, icon))]
async fn persist_notification(
    conn: &PushgateDbConn,
    title: NotificationTitle,
    body: String,
    url: String,
    icon: Option<String>,
    target_user_ids: Option<Vec<Uuid>>,
) -> Result<Notification, diesel::result::Error> {
    conn.run(move |c: &mut PgConnection| {
        let id = Uuid::new_v4();
        let now = Utc::now();
        store::notifications::create(
            c,
            &NewNotification {
                id: &id,
                title: title.as_ref(),
                body: &body,
                url: &url,
                icon: icon.as_deref(),
                target_user_ids,
                created_at: &now,
            },
        )
    })
    .await
}

#[tracing::instrument(name = "Fetching target subscriptions", skip(conn, notification))]
async fn fetch_target_subscriptions(
    conn: &PushgateDbConn,
    notification: &Notification,
) -> Result<Vec<PushSubscription>, diesel::result::Error> {
    let broadcast = notification.is_broadcast();
    let targets = notification.target_user_ids.clone().unwrap_or_default();
    conn.run(move |c: &mut PgConnection| {
        if broadcast {
            store::subscriptions::list_all(c)
        } else {
            store::subscriptions::list_for_users(c, &targets)
        }
    })
    .await
}

/// Deletes the subscriptions a dispatch reported permanently gone. Pruning
/// problems are logged, never surfaced: the notification itself was handled.
async fn prune_gone_subscriptions(conn: &PushgateDbConn, gone: Vec<PushSubscription>) {
    for subscription in gone {
        let endpoint = subscription.endpoint.clone();
        let result = conn
            .run(move |c: &mut PgConnection| {
                store::subscriptions::delete_by_key(c, &subscription.endpoint_key)
            })
            .await;
        match result {
            Ok(_) => tracing::info!(
                endpoint = %endpoint,
                "Pruned a push subscription whose endpoint is gone."
            ),
            Err(error) => tracing::warn!(
                endpoint = %endpoint,
                error.cause_chain = ?error,
                "Failed to prune a dead push subscription."
            ),
        }
    }
}
