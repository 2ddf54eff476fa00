use crate::models::NotificationReceipt;
use crate::schema::notification_receipts::dsl::*;
use chrono::Utc;
use diesel::prelude::*;
use diesel::sql_types::{Nullable, Timestamptz};
use uuid::Uuid;

sql_function!(fn coalesce(x: Nullable<Timestamptz>, y: Nullable<Timestamptz>) -> Nullable<Timestamptz>);

// Every write in this module is a merge: create the receipt if absent,
// otherwise only ever raise flags. COALESCE(stored, new) keeps the first
// timestamp, so repeating a mark changes nothing and concurrent marks for
// the same key converge regardless of interleaving.

#[tracing::instrument(name = "Mark a notification read", skip(conn))]
pub fn mark_read(conn: &PgConnection, user: &Uuid, notification: &Uuid) -> QueryResult<()> {
    let now = Utc::now();
    diesel::insert_into(notification_receipts)
        .values((
            user_id.eq(user),
            notification_id.eq(notification),
            is_read.eq(true),
            read_at.eq(Some(now)),
        ))
        .on_conflict((user_id, notification_id))
        .do_update()
        .set((is_read.eq(true), read_at.eq(coalesce(read_at, Some(now)))))
        .execute(conn)
        .map(|_| ())
}

#[tracing::instrument(name = "Mark a notification clicked", skip(conn))]
pub fn mark_clicked(conn: &PgConnection, user: &Uuid, notification: &Uuid) -> QueryResult<()> {
    let now = Utc::now();
    diesel::insert_into(notification_receipts)
        .values((
            user_id.eq(user),
            notification_id.eq(notification),
            is_clicked.eq(true),
            clicked_at.eq(Some(now)),
        ))
        .on_conflict((user_id, notification_id))
        .do_update()
        .set((
            is_clicked.eq(true),
            clicked_at.eq(coalesce(clicked_at, Some(now))),
        ))
        .execute(conn)
        .map(|_| ())
}

/// Soft delete: the notification disappears from this user's feed and there
/// is no undelete anywhere in the system.
#[tracing::instrument(name = "Mark a notification deleted", skip(conn))]
pub fn mark_deleted(conn: &PgConnection, user: &Uuid, notification: &Uuid) -> QueryResult<()> {
    diesel::insert_into(notification_receipts)
        .values((
            user_id.eq(user),
            notification_id.eq(notification),
            is_deleted.eq(true),
        ))
        .on_conflict((user_id, notification_id))
        .do_update()
        .set(is_deleted.eq(true))
        .execute(conn)
        .map(|_| ())
}

/// Batch read-marking as one unit of work: either every id is marked or the
/// transaction rolls back and the error reaches the caller.
#[tracing::instrument(name = "Mark many notifications read", skip(conn, ids))]
pub fn mark_many_read(conn: &PgConnection, user: &Uuid, ids: &[Uuid]) -> QueryResult<usize> {
    conn.transaction(|| {
        for notification in ids {
            mark_read(conn, user, notification)?;
        }
        Ok(ids.len())
    })
}

/// The receipts of one user for exactly the given notification ids — a
/// single bounded lookup, not one query per notification.
pub fn for_user(
    conn: &PgConnection,
    user: &Uuid,
    ids: &[Uuid],
) -> QueryResult<Vec<NotificationReceipt>> {
    notification_receipts
        .filter(user_id.eq(user))
        .filter(notification_id.eq_any(ids))
        .load::<NotificationReceipt>(conn)
}
