#[path = "health_check.rs"]
mod health_check_route;
mod notification_feed;
mod notifications;
mod push_subscriptions;

pub use health_check_route::*;
pub use notification_feed::*;
pub use notifications::*;
pub use push_subscriptions::*;

pub fn error_chain_fmt(
    e: &impl std::error::Error,
    f: &mut std::fmt::Formatter<'_>,
) -> std::fmt::Result {
    writeln!(f, "{}\n", e)?;
    let mut current = e.source();
    while let Some(cause) = current {
        writeln!(f, "Caused by:\n\t{}", cause)?;
        current = cause.source();
    }
    Ok(())
}
