use crate::catchers::*;
use crate::configuration::Settings;
use crate::port_saver;
use crate::port_saver::Port;
use crate::push::{PushGateway, PushTransport};
use crate::routes::*;
use rocket::{Ignite, Rocket};
use rocket_sync_db_pools::database;
use std::sync::Arc;

#[database("pushgate")]
pub struct PushgateDbConn(diesel::PgConnection);

/// Assembles the whole application: database pool, the managed push
/// gateway (the one explicit configuration object everything outbound goes
/// through), routes and catchers. The transport is injected so tests can
/// swap the real Web Push client for a recording double; `None` means push
/// is not configured.
pub async fn build(
    configuration: &Settings,
    push_transport: Option<Arc<dyn PushTransport>>,
) -> Result<(Rocket<Ignite>, Port), rocket::Error> {
    let (port_saver, port) = port_saver::create_pair();
    let figment = rocket::Config::figment()
        .merge(("address", configuration.application.host))
        .merge(("port", configuration.application.port.unwrap_or(0)))
        .merge((
            "databases.pushgate.url",
            configuration.database.connection_string(),
        ));
    rocket::custom(figment)
        .attach(port_saver)
        .attach(PushgateDbConn::fairing())
        .manage(PushGateway::new(
            push_transport,
            &configuration.push_client,
        ))
        .mount(
            "/",
            routes![
                health_check,
                vapid_public_key,
                register_subscription,
                unregister_subscription,
                publish_notification,
                list_notifications,
                mark_notifications_read,
                mark_notification_clicked,
                delete_notification,
                open_notification,
            ],
        )
        .register(
            "/",
            catchers![
                unauthorized_request_credentials,
                unprocessable_entity_to_bad_request
            ],
        )
        .ignite()
        .await
        .map(|rocket| (rocket, port))
}
