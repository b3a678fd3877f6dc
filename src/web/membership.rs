//! Membership endpoints: joining, leaving and adjudicating join requests.

use crate::db::get_db_pool;
use crate::middleware::ClientCtx;
use crate::orm::users;
use crate::reviews::requests::Adjudication;
use crate::reviews::{find_review, membership, requests, ReviewError};
use actix_web::{error, get, post, web, Error, HttpResponse};
use sea_orm::{ActiveEnum, EntityTrait};
use serde::Deserialize;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(join_review)
        .service(leave_review)
        .service(list_requests)
        .service(adjudicate_request);
}

#[post("/reviews/{review_id}/join")]
async fn join_review(client: ClientCtx, path: web::Path<i32>) -> Result<HttpResponse, Error> {
    let actor = client.require_user()?.clone();
    let db = get_db_pool();

    let review = find_review(db, path.into_inner()).await?;
    let outcome = membership::join(db, &review, &actor).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "status": outcome.as_str() })))
}

#[post("/reviews/{review_id}/leave")]
async fn leave_review(client: ClientCtx, path: web::Path<i32>) -> Result<HttpResponse, Error> {
    let actor = client.require_user()?.clone();
    let db = get_db_pool();

    let review = find_review(db, path.into_inner()).await?;
    membership::leave(db, &review, &actor).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "status": "left" })))
}

#[derive(serde::Serialize)]
struct RequestView {
    id: i32,
    user_id: i32,
    username: Option<String>,
    requested_at: chrono::NaiveDateTime,
}

#[get("/reviews/{review_id}/requests")]
async fn list_requests(client: ClientCtx, path: web::Path<i32>) -> Result<HttpResponse, Error> {
    client.require_user()?;
    let db = get_db_pool();

    let review = find_review(db, path.into_inner()).await?;
    if !client.can_adjudicate(&review) {
        return Err(ReviewError::Unauthorized.into());
    }

    let rows = requests::pending_for_review(db, review.id)
        .await
        .map_err(error::ErrorInternalServerError)?;

    let mut views = Vec::with_capacity(rows.len());
    for request in rows {
        let user = users::Entity::find_by_id(request.user_id)
            .one(db)
            .await
            .map_err(error::ErrorInternalServerError)?;
        views.push(RequestView {
            id: request.id,
            user_id: request.user_id,
            username: user.map(|u| u.username),
            requested_at: request.requested_at,
        });
    }

    Ok(HttpResponse::Ok().json(views))
}

#[derive(Deserialize)]
struct AdjudicationForm {
    action: String,
}

#[post("/reviews/{review_id}/requests/{request_id}")]
async fn adjudicate_request(
    client: ClientCtx,
    path: web::Path<(i32, i32)>,
    form: web::Json<AdjudicationForm>,
) -> Result<HttpResponse, Error> {
    let actor = client.require_user()?.clone();
    let (review_id, request_id) = path.into_inner();
    let db = get_db_pool();

    let action = Adjudication::parse(&form.action)
        .ok_or_else(|| ReviewError::validation("action must be 'accept' or 'reject'"))?;

    let review = find_review(db, review_id).await?;
    let request = requests::adjudicate(db, &review, &actor, request_id, action).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "id": request.id,
        "user_id": request.user_id,
        "status": request.status.to_value(),
    })))
}
