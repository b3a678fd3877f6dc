//! Test database setup and management
#![allow(dead_code)]

use sea_orm::{Database, DatabaseConnection, DbErr, Statement};
use std::env;

/// Connect to the integration test database, or None when no
/// TEST_DATABASE_URL is configured. Tests that need a database start with
/// this and return early when it is absent, so the suite still passes in
/// environments without Postgres.
pub async fn setup_test_database() -> Option<DatabaseConnection> {
    let database_url = match env::var("TEST_DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("TEST_DATABASE_URL not set; skipping database test");
            return None;
        }
    };

    match Database::connect(&database_url).await {
        Ok(db) => Some(db),
        Err(e) => panic!("could not connect to test database: {}", e),
    }
}

/// Cleanup function to remove test data
///
/// Truncates all tables that might contain test data. Child tables (with
/// foreign keys) are listed before parent tables; RESTART IDENTITY resets
/// sequences to 1 so fixtures get predictable ids.
pub async fn cleanup_test_data(db: &DatabaseConnection) -> Result<(), DbErr> {
    use sea_orm::ConnectionTrait;

    db.execute(Statement::from_string(
        db.get_database_backend(),
        "TRUNCATE TABLE
            comments,
            join_requests,
            review_memberships,
            reviews,
            user_books,
            profiles,
            books,
            users
        RESTART IDENTITY CASCADE;"
            .to_string(),
    ))
    .await?;

    Ok(())
}
