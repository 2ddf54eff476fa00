use anyhow::{anyhow, Context};
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome};
use rocket::Request;
use secrecy::Secret;

/// The raw credentials of an HTTP basic auth header. Possession proves
/// nothing — `AuthenticatedUser` is the guard that actually checks them.
pub struct BasicAuth {
    pub username: String,
    pub password: Secret<String>,
}

#[async_trait]
impl<'r> FromRequest<'r> for BasicAuth {
    type Error = anyhow::Error;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match decode_basic_auth(request) {
            Ok(auth) => Outcome::Success(auth),
            Err(e) => Outcome::Failure((Status::Unauthorized, e)),
        }
    }
}

fn decode_basic_auth(request: &Request) -> Result<BasicAuth, anyhow::Error> {
    let header = request
        .headers()
        .get_one("Authorization")
        .context("The 'Authorization' header was missing.")?;
    let encoded = header
        .strip_prefix("Basic ")
        .context("The authorization scheme was not 'Basic'.")?;
    let decoded = base64::decode_config(encoded, base64::STANDARD)
        .context("Failed to base64-decode 'Basic' credentials.")?;
    let decoded =
        String::from_utf8(decoded).context("The decoded credentials are not valid UTF8.")?;

    let (username, password) = decoded
        .split_once(':')
        .ok_or_else(|| anyhow!("'Basic' credentials must be colon-separated."))?;

    Ok(BasicAuth {
        username: username.to_string(),
        password: Secret::new(password.to_string()),
    })
}
