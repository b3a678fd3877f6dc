//! Catalogue importer.
//!
//! Reads a CSV of books and inserts the ones not already present. Matching
//! is exact on every field, so re-running the import is idempotent and a
//! corrected row imports as a new book.

use anyhow::Context;
use bookclub::db::{get_db_pool, init_db};
use bookclub::orm::books;
use chrono::NaiveDate;
use env_logger::Env;
use sea_orm::{entity::*, query::*};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct BookRecord {
    title: String,
    author: String,
    genre: String,
    description: String,
    publisher: String,
    date_published: NaiveDate,
    img_url: Option<String>,
    buy_link: Option<String>,
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let path = std::env::args().nth(1).unwrap_or_else(|| "books.csv".to_string());
    init_db(std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?).await;
    let db = get_db_pool();

    let mut reader = csv::Reader::from_path(&path)
        .with_context(|| format!("could not open {}", path))?;

    let mut imported = 0usize;
    let mut skipped = 0usize;

    for result in reader.deserialize() {
        let record: BookRecord = result.context("malformed CSV row")?;

        let existing = books::Entity::find()
            .filter(books::Column::Title.eq(record.title.as_str()))
            .filter(books::Column::Author.eq(record.author.as_str()))
            .filter(books::Column::Genre.eq(record.genre.as_str()))
            .filter(books::Column::Description.eq(record.description.as_str()))
            .filter(books::Column::Publisher.eq(record.publisher.as_str()))
            .filter(books::Column::DatePublished.eq(record.date_published))
            .one(db)
            .await?;

        if existing.is_some() {
            log::debug!("skipping existing book '{}'", record.title);
            skipped += 1;
            continue;
        }

        books::ActiveModel {
            title: Set(record.title.clone()),
            author: Set(record.author),
            genre: Set(record.genre),
            description: Set(record.description),
            publisher: Set(record.publisher),
            date_published: Set(record.date_published),
            img_url: Set(record.img_url.filter(|u| !u.is_empty())),
            buy_link: Set(record.buy_link.filter(|u| !u.is_empty())),
            ..Default::default()
        }
        .insert(db)
        .await?;

        log::info!("imported '{}'", record.title);
        imported += 1;
    }

    log::info!("done: {} imported, {} already present", imported, skipped);
    Ok(())
}
