//! Member profiles: public profile pages, profile settings and the
//! profile image upload.

use crate::app_config::get_app_config;
use crate::attachment;
use crate::db::get_db_pool;
use crate::middleware::ClientCtx;
use crate::orm::{books, profiles, reviews, user_books, users};
use crate::reviews::ReviewError;
use crate::web::review::summarize;
use actix_multipart::Multipart;
use actix_web::{error, get, post, web, Error, HttpResponse};
use futures_util::TryStreamExt;
use sea_orm::sea_query::Expr;
use sea_orm::{entity::*, query::*, ActiveEnum, DatabaseConnection, DbBackend, Statement};
use serde::Deserialize;
use validator::Validate;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_member)
        .service(update_profile)
        .service(upload_profile_image);
}

/// Reviews the user has commented on, newest first.
async fn commented_reviews(
    db: &DatabaseConnection,
    user_id: i32,
) -> Result<Vec<reviews::Model>, sea_orm::DbErr> {
    let sql = r#"
        SELECT DISTINCT r.*
        FROM reviews r
        JOIN comments c ON c.review_id = r.id
        WHERE c.user_id = $1
        ORDER BY r.created_at DESC
    "#;

    reviews::Model::find_by_statement(Statement::from_sql_and_values(
        DbBackend::Postgres,
        sql,
        vec![user_id.into()],
    ))
    .all(db)
    .await
}

async fn find_or_default_profile(
    db: &DatabaseConnection,
    user_id: i32,
) -> Result<profiles::Model, sea_orm::DbErr> {
    Ok(profiles::Entity::find()
        .filter(profiles::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .unwrap_or(profiles::Model {
            id: 0,
            user_id,
            profile_image: None,
            reading_goal: None,
            display_reading_goal: false,
        }))
}

#[get("/members/{username}")]
async fn view_member(client: ClientCtx, path: web::Path<String>) -> Result<HttpResponse, Error> {
    let db = get_db_pool();

    let user = users::Entity::find()
        .filter(users::Column::Username.eq(path.into_inner()))
        .one(db)
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or(ReviewError::NotFound("member"))?;

    let profile = find_or_default_profile(db, user.id)
        .await
        .map_err(error::ErrorInternalServerError)?;

    let written = reviews::Entity::find()
        .filter(reviews::Column::UserId.eq(user.id))
        .order_by_desc(reviews::Column::CreatedAt)
        .all(db)
        .await
        .map_err(error::ErrorInternalServerError)?;

    let commented = commented_reviews(db, user.id)
        .await
        .map_err(error::ErrorInternalServerError)?;

    let shelves = user_books::Entity::find()
        .filter(user_books::Column::UserId.eq(user.id))
        .find_also_related(books::Entity)
        .all(db)
        .await
        .map_err(error::ErrorInternalServerError)?;

    let shelf_views: Vec<_> = shelves
        .into_iter()
        .filter_map(|(entry, book)| {
            book.map(|b| {
                serde_json::json!({
                    "status": entry.status.to_value(),
                    "book_id": b.id,
                    "title": b.title,
                    "author": b.author,
                })
            })
        })
        .collect();

    let is_self = client.get_id() == Some(user.id);
    // The goal is private unless the member opted into showing it.
    let reading_goal = if profile.display_reading_goal || is_self {
        profile.reading_goal
    } else {
        None
    };

    let profile_image_url = profile
        .profile_image
        .as_ref()
        .map(|name| format!("{}/{}", get_app_config().media.url_prefix, name));

    let include_attachment = client.is_user();
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "username": user.username,
        "display_name": user.display_name,
        "privileged": user.privileged,
        "member_since": user.created_at,
        "profile_image_url": profile_image_url,
        "reading_goal": reading_goal,
        "reviews_written": written
            .iter()
            .map(|r| summarize(r, include_attachment))
            .collect::<Vec<_>>(),
        "reviews_commented_on": commented
            .iter()
            .map(|r| summarize(r, include_attachment))
            .collect::<Vec<_>>(),
        "shelves": shelf_views,
    })))
}

#[derive(Deserialize, Validate)]
struct ProfileForm {
    #[validate(range(min = 0))]
    reading_goal: Option<i32>,
    display_reading_goal: bool,
}

#[post("/profile")]
async fn update_profile(
    client: ClientCtx,
    form: web::Json<ProfileForm>,
) -> Result<HttpResponse, Error> {
    let actor = client.require_user()?.clone();
    form.validate()
        .map_err(|e| ReviewError::validation(e.to_string()))?;

    let db = get_db_pool();
    let existing = profiles::Entity::find()
        .filter(profiles::Column::UserId.eq(actor.id))
        .one(db)
        .await
        .map_err(error::ErrorInternalServerError)?;

    let profile = match existing {
        Some(profile) => {
            profiles::Entity::update_many()
                .col_expr(
                    profiles::Column::ReadingGoal,
                    Expr::value(form.reading_goal),
                )
                .col_expr(
                    profiles::Column::DisplayReadingGoal,
                    Expr::value(form.display_reading_goal),
                )
                .filter(profiles::Column::Id.eq(profile.id))
                .exec(db)
                .await
                .map_err(error::ErrorInternalServerError)?;
            profiles::Model {
                reading_goal: form.reading_goal,
                display_reading_goal: form.display_reading_goal,
                ..profile
            }
        }
        None => profiles::ActiveModel {
            user_id: Set(actor.id),
            reading_goal: Set(form.reading_goal),
            display_reading_goal: Set(form.display_reading_goal),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_err(error::ErrorInternalServerError)?,
    };

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "reading_goal": profile.reading_goal,
        "display_reading_goal": profile.display_reading_goal,
    })))
}

#[post("/profile/image")]
async fn upload_profile_image(
    client: ClientCtx,
    mut payload: Multipart,
) -> Result<HttpResponse, Error> {
    let actor = client.require_user()?.clone();
    let db = get_db_pool();

    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(mut field) = payload
        .try_next()
        .await
        .map_err(|e| ReviewError::validation(format!("malformed upload: {}", e)))?
    {
        let disposition = field.content_disposition().clone();
        if disposition.get_name() != Some("image") {
            continue;
        }
        let filename = disposition
            .get_filename()
            .map(|f| f.to_string())
            .ok_or_else(|| ReviewError::validation("uploaded file has no name"))?;
        let bytes =
            attachment::read_field_bytes(&mut field, attachment::PROFILE_IMAGE_MAX_BYTES)
                .await
                .map_err(|e| ReviewError::validation(e.to_string()))?;
        upload = Some((filename, bytes));
    }

    let (filename, bytes) =
        upload.ok_or_else(|| ReviewError::validation("an 'image' file field is required"))?;

    let extension = attachment::validate_profile_image(&filename, bytes.len())
        .map_err(|e| ReviewError::validation(e.to_string()))?;

    let media_dir = get_app_config().media.directory;
    let stored = attachment::save_bytes(&media_dir, &extension, &bytes)
        .map_err(|e| ReviewError::validation(e.to_string()))?;

    let existing = profiles::Entity::find()
        .filter(profiles::Column::UserId.eq(actor.id))
        .one(db)
        .await
        .map_err(error::ErrorInternalServerError)?;

    let old_image = existing.as_ref().and_then(|p| p.profile_image.clone());

    match existing {
        Some(profile) => {
            profiles::Entity::update_many()
                .col_expr(
                    profiles::Column::ProfileImage,
                    Expr::value(Some(stored.clone())),
                )
                .filter(profiles::Column::Id.eq(profile.id))
                .exec(db)
                .await
                .map_err(error::ErrorInternalServerError)?;
        }
        None => {
            profiles::ActiveModel {
                user_id: Set(actor.id),
                profile_image: Set(Some(stored.clone())),
                display_reading_goal: Set(false),
                ..Default::default()
            }
            .insert(db)
            .await
            .map_err(error::ErrorInternalServerError)?;
        }
    }

    // The replaced image is orphaned once the row points elsewhere.
    if let Some(old) = old_image {
        attachment::remove_file(&media_dir, &old);
    }

    log::info!("user {} updated their profile image", actor.id);
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "profile_image_url": format!("{}/{}", get_app_config().media.url_prefix, stored),
    })))
}
