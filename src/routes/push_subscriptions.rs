use crate::domain::{ClientKeys, PushEndpoint};
use crate::guards::AuthenticatedUser;
use crate::models::NewPushSubscription;
use crate::push::PushGateway;
use crate::startup::PushgateDbConn;
use crate::store;
use chrono::Utc;
use diesel::PgConnection;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::State;

/// The shape a browser's `PushSubscription.toJSON()` produces.
#[derive(serde::Deserialize)]
pub struct SubscriptionRequest {
    endpoint: String,
    keys: SubscriptionKeys,
}

#[derive(serde::Deserialize)]
pub struct SubscriptionKeys {
    p256dh: String,
    auth: String,
}

struct ParsedSubscription {
    endpoint: PushEndpoint,
    keys: ClientKeys,
}

impl TryFrom<SubscriptionRequest> for ParsedSubscription {
    type Error = String;

    fn try_from(request: SubscriptionRequest) -> Result<Self, Self::Error> {
        let endpoint = PushEndpoint::parse(request.endpoint)?;
        let keys = ClientKeys::parse(request.keys.p256dh, request.keys.auth)?;
        Ok(ParsedSubscription { endpoint, keys })
    }
}

#[tracing::instrument(
    name = "Registering a push subscription",
    skip(body, conn, user),
    fields(user_id = %user.user_id)
)]
#[post("/push/subscriptions", data = "<body>")]
pub async fn register_subscription(
    body: Json<SubscriptionRequest>,
    conn: PushgateDbConn,
    user: AuthenticatedUser,
) -> Result<(), Status> {
    let subscription: ParsedSubscription = match body.into_inner().try_into() {
        Ok(subscription) => subscription,
        Err(_) => return Err(Status::BadRequest),
    };
    let user_id = user.user_id;
    let inserted = conn
        .run(move |c: &mut PgConnection| {
            let endpoint_key = subscription.endpoint.key();
            let now = Utc::now();
            store::subscriptions::upsert(
                c,
                &NewPushSubscription {
                    endpoint_key: &endpoint_key,
                    endpoint: subscription.endpoint.as_ref(),
                    public_key: subscription.keys.public_key(),
                    auth_secret: subscription.keys.auth_secret(),
                    user_id: &user_id,
                    registered_at: &now,
                },
            )
        })
        .await;
    if inserted.is_err() {
        return Err(Status::InternalServerError);
    }
    Ok(())
}

#[derive(serde::Deserialize)]
pub struct UnsubscribeRequest {
    endpoint: String,
}

#[tracing::instrument(
    name = "Unregistering a push subscription",
    skip(body, conn, user),
    fields(user_id = %user.user_id)
)]
#[delete("/push/subscriptions", data = "<body>")]
pub async fn unregister_subscription(
    body: Json<UnsubscribeRequest>,
    conn: PushgateDbConn,
    user: AuthenticatedUser,
) -> Result<(), Status> {
    let endpoint = match PushEndpoint::parse(body.into_inner().endpoint) {
        Ok(endpoint) => endpoint,
        Err(_) => return Err(Status::BadRequest),
    };
    let key = endpoint.key();
    // Unregistering an endpoint that was never (or is no longer) registered
    // succeeds: the device is gone either way.
    match conn
        .run(move |c: &mut PgConnection| store::subscriptions::delete_by_key(c, &key))
        .await
    {
        Ok(_) => Ok(()),
        Err(_) => Err(Status::InternalServerError),
    }
}

#[derive(serde::Serialize)]
pub struct PublicKeyResponse {
    public_key: String,
}

/// The VAPID public key a browser passes as `applicationServerKey` when it
/// subscribes. 404 until a key pair is configured.
#[get("/push/public_key")]
pub async fn vapid_public_key(
    gateway: &State<PushGateway>,
) -> Result<Json<PublicKeyResponse>, Status> {
    match gateway.vapid_public_key() {
        Some(key) => Ok(Json(PublicKeyResponse {
            public_key: key.to_string(),
        })),
        None => Err(Status::NotFound),
    }
}
