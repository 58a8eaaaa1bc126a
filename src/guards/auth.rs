use rocket::request::{self, FromRequest, Request, Outcome};
use rocket::http::Status;
use mongodb::bson::oid::ObjectId;
use log::debug;

// === OpenAPI (compatible with rocket_okapi 0.8.0 / 0.8.1) ===
use rocket_okapi::request::{OpenApiFromRequest, RequestHeaderInput};
use rocket_okapi::r#gen::OpenApiGenerator;

/// The authenticated actor behind a request, taken from a bearer JWT.
/// Identity is trusted as verified once the signature checks out.
pub struct AuthGuard {
    pub user_id: ObjectId,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthGuard {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let Some(header) = req.headers().get_one("Authorization") else {
            return Outcome::Error((Status::Unauthorized, ()));
        };
        let token = header.trim_start_matches("Bearer ");

        match crate::services::JwtService::verify_token(token) {
            Ok(claims) => match ObjectId::parse_str(&claims.sub) {
                Ok(user_id) => Outcome::Success(AuthGuard { user_id }),
                Err(_) => Outcome::Error((Status::Unauthorized, ())),
            },
            Err(e) => {
                debug!("Rejected bearer token: {}", e);
                Outcome::Error((Status::Unauthorized, ()))
            }
        }
    }
}

/// === OpenAPI Integration ===
impl<'a> OpenApiFromRequest<'a> for AuthGuard {
    fn from_request_input(
        _gen: &mut OpenApiGenerator,
        _name: String,
        _required: bool,
    ) -> rocket_okapi::Result<RequestHeaderInput> {
        Ok(RequestHeaderInput::None)
    }
}
