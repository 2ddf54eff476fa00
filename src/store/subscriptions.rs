use crate::models::{NewPushSubscription, PushSubscription};
use crate::schema::push_subscriptions::dsl::*;
use diesel::pg::upsert::excluded;
use diesel::prelude::*;

/// Registers a subscription, replacing any previous registration of the
/// same endpoint wholesale (credentials and owner included). Re-registering
/// is not an error; the last write wins.
#[tracing::instrument(name = "Upsert a push subscription", skip(conn, subscription))]
pub fn upsert(conn: &PgConnection, subscription: &NewPushSubscription) -> QueryResult<()> {
    diesel::insert_into(push_subscriptions)
        .values(subscription)
        .on_conflict(endpoint_key)
        .do_update()
        .set((
            endpoint.eq(excluded(endpoint)),
            public_key.eq(excluded(public_key)),
            auth_secret.eq(excluded(auth_secret)),
            user_id.eq(excluded(user_id)),
            registered_at.eq(excluded(registered_at)),
        ))
        .execute(conn)
        .map(|_| ())
}

/// Deletes by derived endpoint key. Zero affected rows is still a success:
/// unregistering an endpoint that is already gone is a no-op, which is what
/// makes concurrent pruning safe.
#[tracing::instrument(name = "Delete a push subscription", skip(conn))]
pub fn delete_by_key(conn: &PgConnection, key: &str) -> QueryResult<usize> {
    diesel::delete(push_subscriptions.filter(endpoint_key.eq(key))).execute(conn)
}

pub fn list_all(conn: &PgConnection) -> QueryResult<Vec<PushSubscription>> {
    push_subscriptions.load::<PushSubscription>(conn)
}

/// Subscriptions owned by any of the given users; used for targeted sends
/// so the delivery engine only ever sees matching subscriptions.
pub fn list_for_users(
    conn: &PgConnection,
    owners: &[uuid::Uuid],
) -> QueryResult<Vec<PushSubscription>> {
    push_subscriptions
        .filter(user_id.eq_any(owners))
        .load::<PushSubscription>(conn)
}
