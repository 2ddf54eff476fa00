mod notification;
mod push_subscription;
mod receipt;
mod user;

pub use notification::*;
pub use push_subscription::*;
pub use receipt::*;
pub use user::*;
