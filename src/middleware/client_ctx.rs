//! Client context passed to routes.
//!
//! Resolved once per request from the session cookie: either an
//! authenticated [`Actor`] or a guest. This is the authorization context
//! every operation receives explicitly; there is no ambient global actor.

use crate::db::get_db_pool;
use crate::identity::{Actor, SESSION_USER_KEY};
use crate::orm::{reviews, users};
use crate::reviews::policy;
use actix_session::SessionExt;
use actix_web::dev::Payload;
use actix_web::{error, Error, FromRequest, HttpRequest};
use futures_util::future::LocalBoxFuture;
use sea_orm::EntityTrait;

#[derive(Clone, Debug, Default)]
pub struct ClientCtx {
    client: Option<Actor>,
}

impl ClientCtx {
    pub fn guest() -> Self {
        Self::default()
    }

    /// Build a context for a known actor. Used by the session hand-off and
    /// by tests.
    pub fn from_actor(actor: Actor) -> Self {
        Self {
            client: Some(actor),
        }
    }

    /// Returns either the user's id or None.
    pub fn get_id(&self) -> Option<i32> {
        self.client.as_ref().map(|u| u.id)
    }

    /// Returns either the user's display name or the word for guest.
    pub fn get_name(&self) -> String {
        match &self.client {
            Some(user) => user.display_name.to_owned(),
            None => "Guest".to_owned(),
        }
    }

    pub fn get_user(&self) -> Option<&Actor> {
        self.client.as_ref()
    }

    pub fn is_user(&self) -> bool {
        self.client.is_some()
    }

    pub fn is_privileged(&self) -> bool {
        self.client.as_ref().map(|u| u.privileged).unwrap_or(false)
    }

    /// Require user to be logged in. Returns the actor or ErrorUnauthorized.
    pub fn require_user(&self) -> Result<&Actor, Error> {
        self.client
            .as_ref()
            .ok_or_else(|| error::ErrorUnauthorized("Login required"))
    }

    pub fn can_delete_review(&self, review: &reviews::Model) -> bool {
        match &self.client {
            Some(user) => policy::can_delete(user.id, user.privileged, review.user_id),
            None => false,
        }
    }

    pub fn can_adjudicate(&self, review: &reviews::Model) -> bool {
        match &self.client {
            Some(user) => policy::can_adjudicate(user.id, user.privileged, review.user_id),
            None => false,
        }
    }

    pub fn can_join_directly(&self) -> bool {
        policy::can_join_directly(self.is_privileged())
    }
}

/// This implementation is what actually provides the `client: ClientCtx`
/// in the parameters of route functions.
impl FromRequest for ClientCtx {
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let session = req.get_session();

        Box::pin(async move {
            let user_id = match session.get::<i32>(SESSION_USER_KEY) {
                Ok(Some(id)) => id,
                Ok(None) => return Ok(ClientCtx::guest()),
                Err(e) => {
                    log::warn!("unreadable session cookie: {}", e);
                    return Ok(ClientCtx::guest());
                }
            };

            match users::Entity::find_by_id(user_id).one(get_db_pool()).await {
                Ok(Some(user)) => Ok(ClientCtx::from_actor(user.into())),
                // Stale session pointing at a deleted user.
                Ok(None) => Ok(ClientCtx::guest()),
                Err(e) => {
                    log::error!("could not resolve session user {}: {}", user_id, e);
                    Err(error::ErrorInternalServerError("session lookup failed"))
                }
            }
        })
    }
}
