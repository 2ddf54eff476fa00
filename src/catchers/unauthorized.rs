use rocket::http::Header;
use rocket::response::Responder;

/// 401s carry a challenge so interactive clients prompt for credentials.
#[catch(401)]
pub fn unauthorized_request_credentials() -> RequestCredentials {
    RequestCredentials {
        inner: (),
        www_authenticate: Header::new("WWW-Authenticate", r#"Basic realm="pushgate""#),
    }
}

#[derive(Responder)]
#[response(status = 401)]
pub struct RequestCredentials {
    inner: (),
    www_authenticate: Header<'static>,
}
