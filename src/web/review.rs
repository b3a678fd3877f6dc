//! Review endpoints: listing, creation, detail, deletion, comments.

use crate::app_config::get_app_config;
use crate::attachment;
use crate::db::get_db_pool;
use crate::middleware::ClientCtx;
use crate::orm::reviews::Genre;
use crate::orm::{comments, reviews, users};
use crate::reviews::{find_review, rating, requests, ReviewError};
use actix_multipart::Multipart;
use actix_web::{delete, error, get, post, web, Error, HttpResponse};
use chrono::Utc;
use futures_util::TryStreamExt;
use sea_orm::{entity::*, query::*};
use serde::{Deserialize, Serialize};
use validator::Validate;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(list_reviews)
        .service(author_reviews)
        .service(genre_reviews)
        .service(create_review)
        .service(view_review)
        .service(delete_review)
        .service(add_comment);
}

/// A review as handed to the presentation layer. The attachment reference
/// is withheld from unauthenticated actors.
#[derive(Serialize)]
pub struct ReviewSummary {
    pub id: i32,
    pub owner_id: i32,
    pub title: String,
    pub author: String,
    pub genre: String,
    pub rating: f64,
    pub created_at: chrono::NaiveDateTime,
    pub attachment: Option<AttachmentView>,
}

#[derive(Serialize)]
pub struct AttachmentView {
    pub url: String,
    pub title: Option<String>,
    pub keywords: Option<String>,
    pub description: Option<String>,
}

pub fn summarize(review: &reviews::Model, include_attachment: bool) -> ReviewSummary {
    let attachment = if include_attachment {
        review.file_name.as_ref().map(|name| AttachmentView {
            url: format!("{}/{}", get_app_config().media.url_prefix, name),
            title: review.file_title.clone(),
            keywords: review.file_keywords.clone(),
            description: review.file_description.clone(),
        })
    } else {
        None
    };

    ReviewSummary {
        id: review.id,
        owner_id: review.user_id,
        title: review.title.clone(),
        author: review.author.clone(),
        genre: review.genre.code(),
        rating: review.rating,
        created_at: review.created_at,
        attachment,
    }
}

#[derive(Serialize)]
struct ReviewListResponse {
    reviews: Vec<ReviewSummary>,
    membership_review_ids: Vec<i32>,
}

async fn list_response(
    client: &ClientCtx,
    items: Vec<reviews::Model>,
) -> Result<ReviewListResponse, Error> {
    let membership_review_ids = match client.get_id() {
        Some(user_id) => crate::reviews::membership_review_ids(get_db_pool(), user_id)
            .await
            .map_err(error::ErrorInternalServerError)?
            .into_iter()
            .collect(),
        None => Vec::new(),
    };

    let include_attachment = client.is_user();
    Ok(ReviewListResponse {
        reviews: items
            .iter()
            .map(|r| summarize(r, include_attachment))
            .collect(),
        membership_review_ids,
    })
}

#[derive(Deserialize)]
struct ListQuery {
    sort_by: Option<String>,
    sort_direction: Option<String>,
}

#[get("/reviews")]
async fn list_reviews(client: ClientCtx, query: web::Query<ListQuery>) -> Result<HttpResponse, Error> {
    let order_by = crate::reviews::sort_column(query.sort_by.as_deref().unwrap_or(""));
    let order = crate::reviews::sort_order(query.sort_direction.as_deref().unwrap_or("desc"));

    let items = crate::reviews::list_reviews(get_db_pool(), order_by, order)
        .await
        .map_err(error::ErrorInternalServerError)?;

    Ok(HttpResponse::Ok().json(list_response(&client, items).await?))
}

#[get("/reviews/author/{author}")]
async fn author_reviews(client: ClientCtx, path: web::Path<String>) -> Result<HttpResponse, Error> {
    let author = path.into_inner();
    let items = reviews::Entity::find()
        .filter(reviews::Column::Author.eq(author))
        .order_by_desc(reviews::Column::CreatedAt)
        .all(get_db_pool())
        .await
        .map_err(error::ErrorInternalServerError)?;

    Ok(HttpResponse::Ok().json(list_response(&client, items).await?))
}

#[get("/reviews/genre/{genre}")]
async fn genre_reviews(client: ClientCtx, path: web::Path<String>) -> Result<HttpResponse, Error> {
    // An unknown genre code matches nothing rather than erroring.
    let items = match Genre::from_code(&path.into_inner()) {
        Some(genre) => reviews::Entity::find()
            .filter(reviews::Column::Genre.eq(genre.code()))
            .order_by_desc(reviews::Column::CreatedAt)
            .all(get_db_pool())
            .await
            .map_err(error::ErrorInternalServerError)?,
        None => Vec::new(),
    };

    Ok(HttpResponse::Ok().json(list_response(&client, items).await?))
}

/// Collected multipart fields for review creation.
#[derive(Default, Validate)]
struct CreateReviewForm {
    #[validate(length(min = 1, max = 200))]
    title: String,
    #[validate(length(min = 1, max = 100))]
    author: String,
    genre: String,
    #[validate(length(min = 1))]
    body: String,
    rating: Option<i32>,
    file: Option<(String, Vec<u8>)>,
    file_title: Option<String>,
    file_keywords: Option<String>,
    file_description: Option<String>,
}

/// Cap on individual text fields in the multipart form.
const TEXT_FIELD_LIMIT: usize = 64 * 1024;

async fn collect_create_form(payload: &mut Multipart) -> Result<CreateReviewForm, ReviewError> {
    let mut form = CreateReviewForm::default();

    while let Some(mut field) = payload
        .try_next()
        .await
        .map_err(|e| ReviewError::validation(format!("malformed upload: {}", e)))?
    {
        let disposition = field.content_disposition().clone();
        let name = disposition.get_name().unwrap_or("").to_string();

        if name == "file" {
            let filename = disposition
                .get_filename()
                .map(|f| f.to_string())
                .filter(|f| !f.is_empty());
            let bytes =
                attachment::read_field_bytes(&mut field, attachment::REVIEW_MAX_BYTES)
                    .await
                    .map_err(|e| ReviewError::validation(e.to_string()))?;
            if let (Some(filename), false) = (filename, bytes.is_empty()) {
                form.file = Some((filename, bytes));
            }
            continue;
        }

        let bytes = attachment::read_field_bytes(&mut field, TEXT_FIELD_LIMIT)
            .await
            .map_err(|e| ReviewError::validation(e.to_string()))?;
        let value = String::from_utf8(bytes)
            .map_err(|_| ReviewError::validation("form fields must be UTF-8"))?;

        match name.as_str() {
            "title" => form.title = value,
            "author" => form.author = value,
            "genre" => form.genre = value,
            "body" => form.body = value,
            "rating" => {
                form.rating = Some(
                    value
                        .trim()
                        .parse()
                        .map_err(|_| ReviewError::validation("rating must be a number"))?,
                )
            }
            "file_title" => form.file_title = Some(value),
            "file_keywords" => form.file_keywords = Some(value),
            "file_description" => form.file_description = Some(value),
            _ => log::debug!("ignoring unknown form field '{}'", name),
        }
    }

    Ok(form)
}

#[post("/reviews")]
async fn create_review(client: ClientCtx, mut payload: Multipart) -> Result<HttpResponse, Error> {
    let actor = client.require_user()?.clone();

    let form = collect_create_form(&mut payload).await?;
    form.validate()
        .map_err(|e| ReviewError::validation(e.to_string()))?;

    let genre = Genre::from_code(&form.genre)
        .ok_or_else(|| ReviewError::validation("unknown genre"))?;

    let rating_value = form
        .rating
        .ok_or_else(|| ReviewError::validation("rating is required"))?;
    if !(rating::MIN_RATING..=rating::MAX_RATING).contains(&rating_value) {
        return Err(ReviewError::validation(format!(
            "rating must be between {} and {}",
            rating::MIN_RATING,
            rating::MAX_RATING
        ))
        .into());
    }

    // Validate and store the attachment before any database write so a
    // rejected file leaves no state behind.
    let stored_file = match &form.file {
        Some((filename, bytes)) => {
            let extension = attachment::validate_review_upload(filename, bytes.len())
                .map_err(|e| ReviewError::validation(e.to_string()))?;
            let media_dir = get_app_config().media.directory;
            let stored = attachment::save_bytes(&media_dir, &extension, bytes)
                .map_err(|e| ReviewError::validation(e.to_string()))?;
            Some(stored)
        }
        None => None,
    };

    let has_file = stored_file.is_some();
    let review = reviews::ActiveModel {
        user_id: Set(actor.id),
        title: Set(form.title.trim().to_string()),
        author: Set(form.author.trim().to_string()),
        genre: Set(genre),
        body: Set(form.body.trim().to_string()),
        rating: Set(f64::from(rating_value)),
        original_rating: Set(rating_value),
        created_at: Set(Utc::now().naive_utc()),
        file_name: Set(stored_file),
        file_title: Set(form.file_title.filter(|_| has_file)),
        file_keywords: Set(form
            .file_keywords
            .as_deref()
            .map(attachment::normalize_keywords)
            .filter(|_| has_file)),
        file_description: Set(form.file_description.filter(|_| has_file)),
        ..Default::default()
    }
    .insert(get_db_pool())
    .await
    .map_err(ReviewError::from)?;

    log::info!("user {} created review {}", actor.id, review.id);
    Ok(HttpResponse::Created().json(summarize(&review, true)))
}

#[derive(Serialize)]
struct CommentView {
    id: i32,
    user_id: i32,
    username: Option<String>,
    body: String,
    rating: Option<i32>,
    created_at: chrono::NaiveDateTime,
}

#[derive(Serialize)]
struct PendingRequestView {
    id: i32,
    user_id: i32,
    username: Option<String>,
    requested_at: chrono::NaiveDateTime,
}

#[derive(Serialize)]
struct ReviewDetailResponse {
    #[serde(flatten)]
    review: ReviewSummary,
    body: String,
    comments: Vec<CommentView>,
    is_member: bool,
    is_owner: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pending_requests: Option<Vec<PendingRequestView>>,
}

#[get("/reviews/{review_id}")]
async fn view_review(client: ClientCtx, path: web::Path<i32>) -> Result<HttpResponse, Error> {
    let review_id = path.into_inner();
    let db = get_db_pool();

    let review = find_review(db, review_id).await?;

    // Comments newest-first, with their authors for display.
    let comment_rows = comments::Entity::find()
        .filter(comments::Column::ReviewId.eq(review.id))
        .find_also_related(users::Entity)
        .order_by_desc(comments::Column::CreatedAt)
        .all(db)
        .await
        .map_err(error::ErrorInternalServerError)?;

    let comment_views = comment_rows
        .into_iter()
        .map(|(comment, user)| CommentView {
            id: comment.id,
            user_id: comment.user_id,
            username: user.map(|u| u.username),
            body: comment.body,
            rating: comment.rating,
            created_at: comment.created_at,
        })
        .collect();

    let is_member = match client.get_id() {
        Some(user_id) => crate::reviews::membership_review_ids(db, user_id)
            .await
            .map_err(error::ErrorInternalServerError)?
            .contains(&review.id),
        None => false,
    };

    // Pending requests are only surfaced to actors who may adjudicate them.
    let pending_requests = if client.can_adjudicate(&review) {
        let rows = requests::pending_for_review(db, review.id)
            .await
            .map_err(error::ErrorInternalServerError)?;

        let mut views = Vec::with_capacity(rows.len());
        for request in rows {
            let user = users::Entity::find_by_id(request.user_id)
                .one(db)
                .await
                .map_err(error::ErrorInternalServerError)?;
            views.push(PendingRequestView {
                id: request.id,
                user_id: request.user_id,
                username: user.map(|u| u.username),
                requested_at: request.requested_at,
            });
        }
        Some(views)
    } else {
        None
    };

    Ok(HttpResponse::Ok().json(ReviewDetailResponse {
        body: review.body.clone(),
        review: summarize(&review, client.is_user()),
        comments: comment_views,
        is_member,
        is_owner: client.get_id() == Some(review.user_id),
        pending_requests,
    }))
}

#[delete("/reviews/{review_id}")]
async fn delete_review(client: ClientCtx, path: web::Path<i32>) -> Result<HttpResponse, Error> {
    let actor = client.require_user()?.clone();
    let db = get_db_pool();

    let review = find_review(db, path.into_inner()).await?;
    crate::reviews::delete_review(db, &review, &actor).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "deleted": review.id })))
}

#[derive(Deserialize)]
struct CommentForm {
    text: String,
    rating: Option<i32>,
}

#[post("/reviews/{review_id}/comments")]
async fn add_comment(
    client: ClientCtx,
    path: web::Path<i32>,
    form: web::Json<CommentForm>,
) -> Result<HttpResponse, Error> {
    let actor = client.require_user()?.clone();

    let comment = rating::add_comment(
        get_db_pool(),
        path.into_inner(),
        &actor,
        &form.text,
        form.rating,
    )
    .await?;

    Ok(HttpResponse::Created().json(CommentView {
        id: comment.id,
        user_id: comment.user_id,
        username: Some(actor.username),
        body: comment.body,
        rating: comment.rating,
        created_at: comment.created_at,
    }))
}
