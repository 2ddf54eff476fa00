use chrono::offset::Utc;
use chrono::DateTime;

/// Per-user interaction state for one notification.
///
/// Flags are monotonic: once raised they stay raised, and the first
/// timestamp wins. A missing row means unread, unclicked, not deleted.
#[derive(Queryable, Clone, Debug)]
pub struct NotificationReceipt {
    pub user_id: uuid::Uuid,
    pub notification_id: uuid::Uuid,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub is_clicked: bool,
    pub clicked_at: Option<DateTime<Utc>>,
    pub is_deleted: bool,
}
