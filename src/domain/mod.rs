mod client_keys;
mod notification_title;
mod push_endpoint;

pub use client_keys::ClientKeys;
pub use notification_title::NotificationTitle;
pub use push_endpoint::PushEndpoint;
