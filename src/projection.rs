use crate::models::{Notification, NotificationReceipt};
use chrono::offset::Utc;
use chrono::DateTime;
use std::collections::HashMap;
use uuid::Uuid;

/// One feed entry: a notification joined with the caller's receipt state.
#[derive(Debug, serde::Serialize)]
pub struct NotificationView {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub created_at: DateTime<Utc>,
    pub is_read: bool,
    pub is_clicked: bool,
}

/// Merges recent notifications with one user's receipts.
///
/// Flags default to false when no receipt exists, soft-deleted entries are
/// dropped, and the input (recency) order is preserved. Targeting does not
/// affect visibility here: a notification a user was never targeted for
/// still shows up, unread — only soft delete filters the feed.
pub fn project(
    notifications: Vec<Notification>,
    receipts: Vec<NotificationReceipt>,
) -> Vec<NotificationView> {
    let receipts: HashMap<Uuid, NotificationReceipt> = receipts
        .into_iter()
        .map(|receipt| (receipt.notification_id, receipt))
        .collect();

    notifications
        .into_iter()
        .filter_map(|notification| {
            let receipt = receipts.get(&notification.id);
            if receipt.map(|r| r.is_deleted).unwrap_or(false) {
                return None;
            }
            Some(NotificationView {
                id: notification.id,
                title: notification.title,
                body: notification.body,
                url: notification.url,
                icon: notification.icon,
                created_at: notification.created_at,
                is_read: receipt.map(|r| r.is_read).unwrap_or(false),
                is_clicked: receipt.map(|r| r.is_clicked).unwrap_or(false),
            })
        })
        .collect()
}
