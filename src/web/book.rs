//! Book catalogue and personal reading shelves.

use crate::db::get_db_pool;
use crate::middleware::ClientCtx;
use crate::orm::user_books::{self, ShelfStatus};
use crate::orm::{books, reviews};
use crate::reviews::ReviewError;
use actix_web::{delete, error, get, post, web, Error, HttpResponse};
use sea_orm::{entity::*, query::*, ActiveEnum};
use serde::{Deserialize, Serialize};

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(list_books)
        .service(view_book)
        .service(shelve_book)
        .service(unshelve_book);
}

#[derive(Serialize)]
struct BookView {
    id: i32,
    title: String,
    author: String,
    genre: String,
    description: String,
    publisher: String,
    date_published: chrono::NaiveDate,
    img_url: Option<String>,
    buy_link: Option<String>,
}

impl From<books::Model> for BookView {
    fn from(book: books::Model) -> Self {
        Self {
            id: book.id,
            title: book.title,
            author: book.author,
            genre: book.genre,
            description: book.description,
            publisher: book.publisher,
            date_published: book.date_published,
            img_url: book.img_url,
            buy_link: book.buy_link,
        }
    }
}

#[get("/books")]
async fn list_books() -> Result<HttpResponse, Error> {
    let books = books::Entity::find()
        .order_by_asc(books::Column::Title)
        .all(get_db_pool())
        .await
        .map_err(error::ErrorInternalServerError)?;

    Ok(HttpResponse::Ok().json(books.into_iter().map(BookView::from).collect::<Vec<_>>()))
}

async fn find_book(db: &sea_orm::DatabaseConnection, book_id: i32) -> Result<books::Model, Error> {
    books::Entity::find_by_id(book_id)
        .one(db)
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| ReviewError::NotFound("book").into())
}

async fn shelf_entry(
    db: &sea_orm::DatabaseConnection,
    user_id: i32,
    book_id: i32,
    status: ShelfStatus,
) -> Result<Option<user_books::Model>, Error> {
    user_books::Entity::find()
        .filter(user_books::Column::UserId.eq(user_id))
        .filter(user_books::Column::BookId.eq(book_id))
        .filter(user_books::Column::Status.eq(status.to_value()))
        .one(db)
        .await
        .map_err(error::ErrorInternalServerError)
}

#[get("/books/{book_id}")]
async fn view_book(client: ClientCtx, path: web::Path<i32>) -> Result<HttpResponse, Error> {
    let db = get_db_pool();
    let book = find_book(db, path.into_inner()).await?;

    let (on_read_shelf, on_want_shelf) = match client.get_id() {
        Some(user_id) => (
            shelf_entry(db, user_id, book.id, ShelfStatus::Read)
                .await?
                .is_some(),
            shelf_entry(db, user_id, book.id, ShelfStatus::WantToRead)
                .await?
                .is_some(),
        ),
        None => (false, false),
    };

    // Genre is free text in the catalogue; only map it to a review genre
    // code when it matches one, so the prefill stays valid.
    let genre_code = reviews::Genre::from_code(&book.genre)
        .map(|g| g.code())
        .unwrap_or_else(|| reviews::Genre::Other.code());

    let review_prefill = serde_json::json!({
        "title": book.title,
        "author": book.author,
        "genre": genre_code,
    });

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "book": BookView::from(book),
        "on_read_shelf": on_read_shelf,
        "on_want_to_read_shelf": on_want_shelf,
        "review_prefill": review_prefill,
    })))
}

#[derive(Deserialize)]
struct ShelveForm {
    status: String,
}

#[post("/books/{book_id}/shelve")]
async fn shelve_book(
    client: ClientCtx,
    path: web::Path<i32>,
    form: web::Json<ShelveForm>,
) -> Result<HttpResponse, Error> {
    let actor = client.require_user()?.clone();
    let db = get_db_pool();

    let status = ShelfStatus::from_code(&form.status)
        .ok_or_else(|| ReviewError::validation("status must be 'read' or 'want_to_read'"))?;

    let book = find_book(db, path.into_inner()).await?;

    // Re-shelving onto the same shelf is a no-op.
    if let Some(existing) = shelf_entry(db, actor.id, book.id, status).await? {
        return Ok(HttpResponse::Ok().json(serde_json::json!({
            "id": existing.id,
            "status": existing.status.to_value(),
            "created": false,
        })));
    }

    let entry = user_books::ActiveModel {
        user_id: Set(actor.id),
        book_id: Set(book.id),
        status: Set(status),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(error::ErrorInternalServerError)?;

    log::info!(
        "user {} shelved book {} as {}",
        actor.id,
        book.id,
        entry.status.to_value()
    );
    Ok(HttpResponse::Created().json(serde_json::json!({
        "id": entry.id,
        "status": entry.status.to_value(),
        "created": true,
    })))
}

#[delete("/books/{book_id}/shelve/{status}")]
async fn unshelve_book(
    client: ClientCtx,
    path: web::Path<(i32, String)>,
) -> Result<HttpResponse, Error> {
    let actor = client.require_user()?.clone();
    let (book_id, status_code) = path.into_inner();
    let db = get_db_pool();

    let status = ShelfStatus::from_code(&status_code)
        .ok_or_else(|| ReviewError::validation("status must be 'read' or 'want_to_read'"))?;

    let entry = shelf_entry(db, actor.id, book_id, status)
        .await?
        .ok_or(ReviewError::NotFound("shelf entry"))?;

    user_books::Entity::delete_by_id(entry.id)
        .exec(db)
        .await
        .map_err(error::ErrorInternalServerError)?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "removed": entry.id })))
}
