use crate::guards::BasicAuth;
use crate::startup::PushgateDbConn;
use anyhow::{anyhow, Context};
use argon2::{Argon2, PasswordHash, PasswordVerifier};
use diesel::{ExpressionMethods, OptionalExtension, PgConnection, QueryDsl, RunQueryDsl};
use rocket::http::Status;
use rocket::outcome::{try_outcome, IntoOutcome};
use rocket::request::{FromRequest, Outcome};
use rocket::Request;
use secrecy::ExposeSecret;
use uuid::Uuid;

/// The authenticated caller. Receipt and subscription operations require
/// one and fail with 401 before any handler logic runs — nothing in the
/// system ever operates on a placeholder user.
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub username: String,
    // prevents construction outside of this module
    _private: (),
}

#[async_trait]
impl<'r> FromRequest<'r> for AuthenticatedUser {
    type Error = anyhow::Error;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let conn = try_outcome!(request.guard::<PushgateDbConn>().await.map_failure(|_| (
            Status::InternalServerError,
            anyhow!("Failed to retrieve a connection from the DB pool.")
        )));
        let basic_auth = try_outcome!(request.guard::<BasicAuth>().await.map_failure(|_| (
            Status::Unauthorized,
            anyhow!("User has not been authenticated.")
        )));

        validate_credentials(basic_auth, conn)
            .await
            .into_outcome(Status::Unauthorized)
    }
}

async fn validate_credentials(
    basic_auth: BasicAuth,
    conn: PushgateDbConn,
) -> Result<AuthenticatedUser, anyhow::Error> {
    conn.run(move |conn: &mut PgConnection| {
        use crate::schema::users;

        let (user_id, password_hash) = users::table
            .select((users::user_id, users::password_hash))
            .filter(users::username.eq(&basic_auth.username))
            .first::<(Uuid, String)>(conn)
            .optional()
            .context("Failed to perform a query to validate auth credentials.")?
            .ok_or_else(|| anyhow!("Unknown username."))?;

        let expected_hash = PasswordHash::new(&password_hash)
            .map_err(|_| anyhow!("The stored password hash is not a valid PHC string."))?;
        Argon2::default()
            .verify_password(
                basic_auth.password.expose_secret().as_bytes(),
                &expected_hash,
            )
            .map_err(|_| anyhow!("Invalid password."))?;

        Ok(AuthenticatedUser {
            user_id,
            username: basic_auth.username,
            _private: (),
        })
    })
    .await
}
