//! Session hand-off from the external identity provider, and logout.
//!
//! The provider authenticates users on its own and posts the asserted
//! claims here with a shared secret; this service only provisions the
//! local row and issues the session cookie.

use crate::app_config::get_app_config;
use crate::db::get_db_pool;
use crate::identity::{self, IdentityClaims, SESSION_USER_KEY};
use actix_session::Session;
use actix_web::{error, post, web, Error, HttpRequest, HttpResponse};
use validator::Validate;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(create_session).service(logout);
}

const IDENTITY_SECRET_HEADER: &str = "X-Identity-Secret";

#[post("/session")]
async fn create_session(
    req: HttpRequest,
    session: Session,
    claims: web::Json<IdentityClaims>,
) -> Result<HttpResponse, Error> {
    let shared_secret = get_app_config().identity.shared_secret;
    if shared_secret.is_empty() {
        log::error!("identity hand-off attempted without a configured shared secret");
        return Err(error::ErrorServiceUnavailable("identity hand-off not configured"));
    }

    let presented = req
        .headers()
        .get(IDENTITY_SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if presented != shared_secret {
        return Err(error::ErrorForbidden("invalid identity secret"));
    }

    claims
        .validate()
        .map_err(|e| error::ErrorBadRequest(e.to_string()))?;

    let user = identity::upsert_provider_user(get_db_pool(), &claims)
        .await
        .map_err(error::ErrorInternalServerError)?;

    session
        .insert(SESSION_USER_KEY, user.id)
        .map_err(error::ErrorInternalServerError)?;

    log::info!("session opened for user {} ({})", user.id, user.username);
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "id": user.id,
        "username": user.username,
        "display_name": user.display_name,
        "privileged": user.privileged,
    })))
}

#[post("/logout")]
async fn logout(session: Session) -> Result<HttpResponse, Error> {
    session.purge();
    Ok(HttpResponse::Ok().json(serde_json::json!({ "status": "logged_out" })))
}
