//! Test fixtures for creating test data
#![allow(dead_code)]

use bookclub::identity::Actor;
use bookclub::orm::reviews::Genre;
use bookclub::orm::{books, reviews, users};
use chrono::Utc;
use sea_orm::{entity::*, ActiveValue::Set, DatabaseConnection, DbErr};

/// Create a test user and return it as the actor operations expect.
pub async fn create_test_user(
    db: &DatabaseConnection,
    username: &str,
    privileged: bool,
) -> Result<Actor, DbErr> {
    let user = users::ActiveModel {
        username: Set(username.to_string()),
        display_name: Set(username.to_string()),
        privileged: Set(privileged),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    Ok(user.into())
}

/// Create a review owned by the given user with the given original rating.
pub async fn create_test_review(
    db: &DatabaseConnection,
    owner_id: i32,
    title: &str,
    rating: i32,
) -> Result<reviews::Model, DbErr> {
    reviews::ActiveModel {
        user_id: Set(owner_id),
        title: Set(title.to_string()),
        author: Set("Test Author".to_string()),
        genre: Set(Genre::Fiction),
        body: Set("A review body long enough to be plausible.".to_string()),
        rating: Set(f64::from(rating)),
        original_rating: Set(rating),
        created_at: Set(Utc::now().naive_utc()),
        file_name: Set(None),
        file_title: Set(None),
        file_keywords: Set(None),
        file_description: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await
}

/// Create a catalogue book.
pub async fn create_test_book(
    db: &DatabaseConnection,
    title: &str,
    author: &str,
) -> Result<books::Model, DbErr> {
    books::ActiveModel {
        title: Set(title.to_string()),
        author: Set(author.to_string()),
        genre: Set("Fiction".to_string()),
        description: Set("A test book.".to_string()),
        publisher: Set("Test Press".to_string()),
        date_published: Set(chrono::NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()),
        img_url: Set(None),
        buy_link: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await
}
