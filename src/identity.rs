//! Identity seam.
//!
//! Authentication happens in an external provider. It hands authenticated
//! users over through the session endpoint (see `web::session`), after
//! which each request resolves an [`Actor`] from the session cookie.

use crate::orm::users;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{entity::*, query::*, DatabaseConnection, DbErr};
use serde::Deserialize;
use validator::Validate;

/// Session key holding the authenticated user id.
pub const SESSION_USER_KEY: &str = "uid";

/// An authenticated user as operations see it: a stable id, a display
/// name, and the elevated-rights capability flag.
#[derive(Clone, Debug)]
pub struct Actor {
    pub id: i32,
    pub username: String,
    pub display_name: String,
    pub privileged: bool,
}

impl From<users::Model> for Actor {
    fn from(user: users::Model) -> Self {
        Self {
            id: user.id,
            username: user.username,
            display_name: user.display_name,
            privileged: user.privileged,
        }
    }
}

/// Claims the identity provider asserts when handing a user over.
#[derive(Debug, Deserialize, Validate)]
pub struct IdentityClaims {
    #[validate(length(min = 1, max = 150))]
    pub username: String,
    #[validate(length(min = 1, max = 150))]
    pub display_name: String,
}

/// Get-or-create the local user row for a provider-asserted identity.
/// The display name follows the provider on every hand-off; the
/// privileged flag is managed locally and never granted here.
pub async fn upsert_provider_user(
    db: &DatabaseConnection,
    claims: &IdentityClaims,
) -> Result<users::Model, DbErr> {
    if let Some(user) = users::Entity::find()
        .filter(users::Column::Username.eq(claims.username.as_str()))
        .one(db)
        .await?
    {
        if user.display_name != claims.display_name {
            users::Entity::update_many()
                .col_expr(
                    users::Column::DisplayName,
                    Expr::value(claims.display_name.clone()),
                )
                .filter(users::Column::Id.eq(user.id))
                .exec(db)
                .await?;
        }
        return Ok(users::Model {
            display_name: claims.display_name.clone(),
            ..user
        });
    }

    let user = users::ActiveModel {
        username: Set(claims.username.clone()),
        display_name: Set(claims.display_name.clone()),
        privileged: Set(false),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    log::info!("provisioned user {} ({})", user.id, user.username);
    Ok(user)
}
