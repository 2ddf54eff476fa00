use crate::models::{NewNotification, Notification};
use crate::schema::notifications::dsl::*;
use diesel::prelude::*;

/// Persists a new notification record and returns it as stored. A storage
/// failure propagates: the caller must never report success for a record
/// that was not written.
#[tracing::instrument(name = "Persist a notification record", skip(conn, notification))]
pub fn create(conn: &PgConnection, notification: &NewNotification) -> QueryResult<Notification> {
    diesel::insert_into(notifications)
        .values(notification)
        .get_result(conn)
}

/// The most recently created notifications, newest first.
pub fn list_recent(conn: &PgConnection, count: i64) -> QueryResult<Vec<Notification>> {
    notifications
        .order(created_at.desc())
        .limit(count)
        .load::<Notification>(conn)
}

pub fn find(conn: &PgConnection, lookup_id: &uuid::Uuid) -> QueryResult<Option<Notification>> {
    notifications
        .find(lookup_id)
        .first::<Notification>(conn)
        .optional()
}
