use crate::schema::notifications;
use chrono::offset::Utc;
use chrono::DateTime;

/// A stored notification record. Immutable once created; an empty or absent
/// target list means broadcast.
#[derive(Queryable, Clone, Debug)]
pub struct Notification {
    pub id: uuid::Uuid,
    pub title: String,
    pub body: String,
    pub url: String,
    pub icon: Option<String>,
    pub target_user_ids: Option<Vec<uuid::Uuid>>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn is_broadcast(&self) -> bool {
        match &self.target_user_ids {
            None => true,
            Some(targets) => targets.is_empty(),
        }
    }
}

#[derive(Insertable)]
#[table_name = "notifications"]
pub struct NewNotification<'a> {
    pub id: &'a uuid::Uuid,
    pub title: &'a str,
    pub body: &'a str,
    pub url: &'a str,
    pub icon: Option<&'a str>,
    pub target_user_ids: Option<Vec<uuid::Uuid>>,
    pub created_at: &'a DateTime<Utc>,
}
