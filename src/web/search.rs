//! Review search.

use crate::db::get_db_pool;
use crate::middleware::ClientCtx;
use crate::web::review::summarize;
use actix_web::{error, get, web, Error, HttpResponse};
use serde::Deserialize;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(search_reviews);
}

#[derive(Deserialize)]
struct SearchQuery {
    q: Option<String>,
}

#[get("/reviews/search")]
async fn search_reviews(
    client: ClientCtx,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse, Error> {
    let q = query.q.as_deref().unwrap_or("").trim();

    // A blank query lists everything rather than erroring.
    let items = crate::reviews::search_reviews(get_db_pool(), q)
        .await
        .map_err(error::ErrorInternalServerError)?;

    let include_attachment = client.is_user();
    let results: Vec<_> = items
        .iter()
        .map(|r| summarize(r, include_attachment))
        .collect();

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "query": q,
        "results": results,
    })))
}
