//! Global database pool.
//!
//! The pool is initialized once at startup and shared through a static so
//! handlers and background tasks can reach it without threading a handle
//! through every call site.

use once_cell::sync::OnceCell;
use sea_orm::{Database, DatabaseConnection};

static DB_POOL: OnceCell<DatabaseConnection> = OnceCell::new();

/// Connect to the database and store the pool globally.
/// Panics if called twice or if the connection fails.
pub async fn init_db(database_url: String) {
    let pool = Database::connect(&database_url)
        .await
        .expect("Failed to connect to database");

    DB_POOL.set(pool).expect("DB pool already initialized");
}

/// Returns the global database pool.
/// Panics if `init_db` has not run.
pub fn get_db_pool() -> &'static DatabaseConnection {
    DB_POOL.get().expect("DB pool is not initialized")
}
