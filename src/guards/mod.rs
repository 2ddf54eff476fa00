mod authenticated_user;
mod basic_auth;

pub use authenticated_user::*;
pub use basic_auth::*;
