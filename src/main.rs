use pushgate::configuration::get_configuration;
use pushgate::push::{PushTransport, WebPushClient};
use pushgate::startup::build;
use pushgate::telemetry::{get_subscriber, init_subscriber};
use std::sync::Arc;

#[rocket::main]
async fn main() -> Result<(), rocket::Error> {
    let subscriber = get_subscriber("pushgate".into(), "info".into(), std::io::stdout);
    init_subscriber(subscriber);

    let configuration = get_configuration().expect("Failed to read configuration.");
    let push_transport = WebPushClient::from_settings(&configuration.push_client)
        .expect("Failed to initialise the web push client.")
        .map(|client| Arc::new(client) as Arc<dyn PushTransport>);
    if push_transport.is_none() {
        tracing::warn!(
            "No VAPID key pair configured; notifications will be recorded but never delivered."
        );
    }

    let (rocket, _port) = build(&configuration, push_transport).await?;
    rocket.launch().await
}
