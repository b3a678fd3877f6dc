//! The front page: the most recent reviews plus who is asking.

use crate::db::get_db_pool;
use crate::middleware::ClientCtx;
use crate::orm::reviews;
use crate::web::review::summarize;
use actix_web::{error, get, Error, HttpResponse};
use sea_orm::{entity::*, query::*};

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_index);
}

const RECENT_REVIEWS: u64 = 10;

#[get("/")]
async fn view_index(client: ClientCtx) -> Result<HttpResponse, Error> {
    let db = get_db_pool();

    let recent = reviews::Entity::find()
        .order_by_desc(reviews::Column::CreatedAt)
        .limit(RECENT_REVIEWS)
        .all(db)
        .await
        .map_err(error::ErrorInternalServerError)?;

    let membership_review_ids: Vec<i32> = match client.get_id() {
        Some(user_id) => crate::reviews::membership_review_ids(db, user_id)
            .await
            .map_err(error::ErrorInternalServerError)?
            .into_iter()
            .collect(),
        None => Vec::new(),
    };

    let include_attachment = client.is_user();
    let recent_views: Vec<_> = recent
        .iter()
        .map(|r| summarize(r, include_attachment))
        .collect();

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "name": client.get_name(),
        "privileged": client.is_privileged(),
        "recent_reviews": recent_views,
        "membership_review_ids": membership_review_ids,
    })))
}
