use crate::guards::AuthenticatedUser;
use crate::models::Notification;
use crate::projection::{self, NotificationView};
use crate::startup::PushgateDbConn;
use crate::store;
use diesel::PgConnection;
use rocket::http::Status;
use rocket::response::Redirect;
use rocket::serde::json::Json;
use uuid::Uuid;

const DEFAULT_FEED_LIMIT: i64 = 20;
const MAX_FEED_LIMIT: i64 = 100;

/// The caller's notification feed: the most recent notifications joined
/// with their receipts. The feed is not filtered by delivery targeting —
/// only the caller's own soft deletes hide entries.
#[tracing::instrument(
    name = "Listing notifications for a user",
    skip(conn, user),
    fields(user_id = %user.user_id)
)]
#[get("/notifications?<limit>")]
pub async fn list_notifications(
    limit: Option<i64>,
    conn: PushgateDbConn,
    user: AuthenticatedUser,
) -> Result<Json<Vec<NotificationView>>, Status> {
    let limit = limit.unwrap_or(DEFAULT_FEED_LIMIT).clamp(1, MAX_FEED_LIMIT);
    let user_id = user.user_id;
    // Both reads run against one connection and the whole projection fails
    // together: a partial feed is worse than no feed.
    conn.run(
        move |c: &mut PgConnection| -> diesel::QueryResult<Vec<NotificationView>> {
            let notifications = store::notifications::list_recent(c, limit)?;
            let ids: Vec<Uuid> = notifications.iter().map(|n| n.id).collect();
            let receipts = store::receipts::for_user(c, &user_id, &ids)?;
            Ok(projection::project(notifications, receipts))
        },
    )
    .await
    .map(Json)
    .map_err(|error| {
        tracing::error!(error.cause_chain = ?error, "Failed to build the notification feed.");
        Status::InternalServerError
    })
}

#[derive(serde::Deserialize)]
pub struct MarkReadRequest {
    ids: Vec<Uuid>,
}

/// Marks a batch of notifications read for the caller, all or nothing.
/// Re-marking already-read entries changes nothing.
#[tracing::instrument(
    name = "Marking notifications read",
    skip(body, conn, user),
    fields(user_id = %user.user_id)
)]
#[post("/notifications/read", data = "<body>")]
pub async fn mark_notifications_read(
    body: Json<MarkReadRequest>,
    conn: PushgateDbConn,
    user: AuthenticatedUser,
) -> Result<(), Status> {
    let ids = body.into_inner().ids;
    let user_id = user.user_id;
    conn.run(move |c: &mut PgConnection| store::receipts::mark_many_read(c, &user_id, &ids))
        .await
        .map(|_| ())
        .map_err(|error| {
            tracing::error!(error.cause_chain = ?error, "Failed to mark notifications read.");
            Status::InternalServerError
        })
}

#[tracing::instrument(
    name = "Marking a notification clicked",
    skip(conn, user),
    fields(user_id = %user.user_id)
)]
#[post("/notifications/<id>/clicked")]
pub async fn mark_notification_clicked(
    id: &str,
    conn: PushgateDbConn,
    user: AuthenticatedUser,
) -> Result<(), Status> {
    let id = Uuid::parse_str(id).map_err(|_| Status::BadRequest)?;
    let user_id = user.user_id;
    conn.run(move |c: &mut PgConnection| store::receipts::mark_clicked(c, &user_id, &id))
        .await
        .map_err(|error| {
            tracing::error!(error.cause_chain = ?error, "Failed to mark a notification clicked.");
            Status::InternalServerError
        })
}

/// Soft delete: hides the notification from this caller's feed forever.
/// There is no undelete.
#[tracing::instrument(
    name = "Deleting a notification for a user",
    skip(conn, user),
    fields(user_id = %user.user_id)
)]
#[delete("/notifications/<id>")]
pub async fn delete_notification(
    id: &str,
    conn: PushgateDbConn,
    user: AuthenticatedUser,
) -> Result<(), Status> {
    let id = Uuid::parse_str(id).map_err(|_| Status::BadRequest)?;
    let user_id = user.user_id;
    conn.run(move |c: &mut PgConnection| store::receipts::mark_deleted(c, &user_id, &id))
        .await
        .map_err(|error| {
            tracing::error!(error.cause_chain = ?error, "Failed to delete a notification.");
            Status::InternalServerError
        })
}

/// The tap-through path: a device notification carries this link with the
/// notification id as a hint. Opening it consumes the hint — the click is
/// recorded — and redirects to the notification's own deep link, whether or
/// not the feed was ever listed.
#[tracing::instrument(
    name = "Opening a notification deep link",
    skip(conn, user),
    fields(user_id = %user.user_id)
)]
#[get("/notifications/open?<notification_id>")]
pub async fn open_notification(
    notification_id: Option<&str>,
    conn: PushgateDbConn,
    user: AuthenticatedUser,
) -> Result<Redirect, Status> {
    let id = match notification_id {
        Some(raw) => Uuid::parse_str(raw).map_err(|_| Status::BadRequest)?,
        None => return Err(Status::BadRequest),
    };
    let user_id = user.user_id;
    let notification = conn
        .run(
            move |c: &mut PgConnection| -> diesel::QueryResult<Option<Notification>> {
                let notification = store::notifications::find(c, &id)?;
                if notification.is_some() {
                    store::receipts::mark_clicked(c, &user_id, &id)?;
                }
                Ok(notification)
            },
        )
        .await
        .map_err(|error| {
            tracing::error!(error.cause_chain = ?error, "Failed to open a notification.");
            Status::InternalServerError
        })?;

    match notification {
        Some(notification) => Ok(Redirect::to(notification.url)),
        None => Err(Status::NotFound),
    }
}
