use crate::schema::push_subscriptions;
use chrono::offset::Utc;
use chrono::DateTime;

#[derive(Queryable, Clone, Debug)]
pub struct PushSubscription {
    pub endpoint_key: String,
    pub endpoint: String,
    pub public_key: String,
    pub auth_secret: String,
    pub user_id: uuid::Uuid,
    pub registered_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[table_name = "push_subscriptions"]
pub struct NewPushSubscription<'a> {
    pub endpoint_key: &'a str,
    pub endpoint: &'a str,
    pub public_key: &'a str,
    pub auth_secret: &'a str,
    pub user_id: &'a uuid::Uuid,
    pub registered_at: &'a DateTime<Utc>,
}
