//! Review community core: membership, join requests, comment ratings and
//! the authorization policy around them.
//!
//! Handlers in `crate::web` stay thin; every state transition lives here so
//! it can be exercised directly against a database connection.

pub mod error;
pub mod membership;
pub mod policy;
pub mod rating;
pub mod requests;

pub use error::ReviewError;

use crate::identity::Actor;
use crate::orm::{comments, join_requests, review_memberships, reviews};
use sea_orm::{
    entity::*, query::*, DatabaseConnection, DatabaseTransaction, DbBackend, DbErr, Order,
    Statement,
};
use std::collections::HashSet;

/// Resolve a sort key from the request into a review column.
/// Unknown keys fall back to the creation date.
pub fn sort_column(sort_by: &str) -> reviews::Column {
    match sort_by {
        "rating" => reviews::Column::Rating,
        "author" => reviews::Column::Author,
        "title" => reviews::Column::Title,
        _ => reviews::Column::CreatedAt,
    }
}

/// Resolve a sort direction; anything but "asc" sorts descending.
pub fn sort_order(direction: &str) -> Order {
    if direction.eq_ignore_ascii_case("asc") {
        Order::Asc
    } else {
        Order::Desc
    }
}

pub async fn find_review(
    db: &DatabaseConnection,
    review_id: i32,
) -> Result<reviews::Model, ReviewError> {
    reviews::Entity::find_by_id(review_id)
        .one(db)
        .await?
        .ok_or(ReviewError::NotFound("review"))
}

/// Lock the review row for the rest of the transaction.
///
/// Every read-modify-write against a review's dependent state (membership
/// grants, pending requests, the rating aggregate) takes this lock first,
/// so concurrent submissions against the same review serialize instead of
/// both acting on a stale read. Reviews other than this one are unaffected.
pub(crate) async fn lock_review(
    txn: &DatabaseTransaction,
    review_id: i32,
) -> Result<reviews::Model, ReviewError> {
    reviews::Model::find_by_statement(Statement::from_sql_and_values(
        DbBackend::Postgres,
        r#"SELECT * FROM reviews WHERE id = $1 FOR UPDATE"#,
        vec![review_id.into()],
    ))
    .one(txn)
    .await?
    .ok_or(ReviewError::NotFound("review"))
}

/// List reviews ordered by the given column and direction.
pub async fn list_reviews(
    db: &DatabaseConnection,
    order_by: reviews::Column,
    order: Order,
) -> Result<Vec<reviews::Model>, DbErr> {
    reviews::Entity::find()
        .order_by(order_by, order)
        .all(db)
        .await
}

/// Escape LIKE metacharacters so user input matches literally rather than
/// acting as a wildcard.
fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Case-insensitive substring search across title, author, genre and the
/// attachment's descriptive metadata. A query matching nothing returns an
/// empty vec, never an error; a blank query lists every review, newest
/// first.
pub async fn search_reviews(
    db: &DatabaseConnection,
    query: &str,
) -> Result<Vec<reviews::Model>, DbErr> {
    let query = query.trim();
    if query.is_empty() {
        return list_reviews(db, reviews::Column::CreatedAt, Order::Desc).await;
    }

    let sql = r#"
        SELECT *
        FROM reviews
        WHERE title ILIKE $1
           OR author ILIKE $1
           OR genre ILIKE $1
           OR file_title ILIKE $1
           OR file_keywords ILIKE $1
        ORDER BY created_at DESC
    "#;

    let pattern = format!("%{}%", escape_like(query));

    reviews::Model::find_by_statement(Statement::from_sql_and_values(
        DbBackend::Postgres,
        sql,
        vec![pattern.into()],
    ))
    .all(db)
    .await
}

/// Delete a review and everything hanging off it (comments, memberships,
/// join requests) in one transaction. Owner or privileged actors only.
pub async fn delete_review(
    db: &DatabaseConnection,
    review: &reviews::Model,
    actor: &Actor,
) -> Result<(), ReviewError> {
    if !policy::can_delete(actor.id, actor.privileged, review.user_id) {
        return Err(ReviewError::Unauthorized);
    }

    let txn = db.begin().await?;

    comments::Entity::delete_many()
        .filter(comments::Column::ReviewId.eq(review.id))
        .exec(&txn)
        .await?;
    review_memberships::Entity::delete_many()
        .filter(review_memberships::Column::ReviewId.eq(review.id))
        .exec(&txn)
        .await?;
    join_requests::Entity::delete_many()
        .filter(join_requests::Column::ReviewId.eq(review.id))
        .exec(&txn)
        .await?;
    reviews::Entity::delete_by_id(review.id).exec(&txn).await?;

    txn.commit().await?;

    // The attachment file is orphaned at this point; removing it is
    // best-effort and never fails the deletion.
    if let Some(ref file_name) = review.file_name {
        let media_dir = crate::app_config::get_app_config().media.directory;
        crate::attachment::remove_file(&media_dir, file_name);
    }

    log::info!("review {} deleted by user {}", review.id, actor.id);
    Ok(())
}

/// Review ids the user holds a membership for, for list rendering.
pub async fn membership_review_ids(
    db: &DatabaseConnection,
    user_id: i32,
) -> Result<HashSet<i32>, DbErr> {
    Ok(review_memberships::Entity::find()
        .filter(review_memberships::Column::UserId.eq(user_id))
        .all(db)
        .await?
        .into_iter()
        .map(|m| m.review_id)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_key_resolution() {
        assert!(matches!(sort_column("rating"), reviews::Column::Rating));
        assert!(matches!(sort_column("author"), reviews::Column::Author));
        assert!(matches!(sort_column("title"), reviews::Column::Title));
        assert!(matches!(sort_column("date"), reviews::Column::CreatedAt));
        assert!(matches!(sort_column("bogus"), reviews::Column::CreatedAt));
        assert!(matches!(sort_column(""), reviews::Column::CreatedAt));
    }

    #[test]
    fn sort_direction_defaults_to_descending() {
        assert!(matches!(sort_order("asc"), Order::Asc));
        assert!(matches!(sort_order("ASC"), Order::Asc));
        assert!(matches!(sort_order("desc"), Order::Desc));
        assert!(matches!(sort_order("sideways"), Order::Desc));
    }

    #[test]
    fn like_metacharacters_match_literally() {
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("snake_case"), "snake\\_case");
        assert_eq!(escape_like("back\\slash"), "back\\\\slash");
        assert_eq!(escape_like("plain words"), "plain words");
    }
}
