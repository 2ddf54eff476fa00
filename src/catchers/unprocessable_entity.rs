use rocket::response::status::BadRequest;
use rocket::Request;

// Rocket answers undeserializable bodies with a 422; this API's contract is
// a plain 400 for any malformed input.
#[catch(422)]
pub fn unprocessable_entity_to_bad_request(_req: &Request) -> BadRequest<()> {
    BadRequest(None)
}
