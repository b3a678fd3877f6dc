//! Integration tests for comments and rating aggregation

mod common;
use serial_test::serial;

use bookclub::orm::reviews;
use bookclub::reviews::rating;
use bookclub::reviews::{membership, ReviewError};
use common::{database::*, fixtures::*};
use sea_orm::EntityTrait;

async fn reload(db: &sea_orm::DatabaseConnection, review_id: i32) -> reviews::Model {
    reviews::Entity::find_by_id(review_id)
        .one(db)
        .await
        .expect("query")
        .expect("review exists")
}

#[actix_rt::test]
#[serial]
async fn rated_comments_move_the_mean_with_the_original_fixed() {
    let db = match setup_test_database().await {
        Some(db) => db,
        None => return,
    };
    cleanup_test_data(&db).await.expect("cleanup");

    let owner = create_test_user(&db, "owner", false).await.expect("owner");
    let review = create_test_review(&db, owner.id, "Dune", 5)
        .await
        .expect("review");

    rating::add_comment(&db, review.id, &owner, "Rereading changed my mind.", Some(3))
        .await
        .expect("first comment");
    assert_eq!(reload(&db, review.id).await.rating, 4.0);

    rating::add_comment(&db, review.id, &owner, "Settling on somewhere between.", Some(4))
        .await
        .expect("second comment");
    // (5 + 3 + 4) / 3: the original rating keeps full weight.
    assert_eq!(reload(&db, review.id).await.rating, 4.0);
}

#[actix_rt::test]
#[serial]
async fn unrated_comment_leaves_the_aggregate_alone() {
    let db = match setup_test_database().await {
        Some(db) => db,
        None => return,
    };
    cleanup_test_data(&db).await.expect("cleanup");

    let owner = create_test_user(&db, "owner", false).await.expect("owner");
    let review = create_test_review(&db, owner.id, "Dune", 5)
        .await
        .expect("review");

    rating::add_comment(&db, review.id, &owner, "Just a note, no verdict.", None)
        .await
        .expect("comment");
    assert_eq!(reload(&db, review.id).await.rating, 5.0);

    // A later rated comment averages over rated comments only.
    rating::add_comment(&db, review.id, &owner, "Now with a verdict.", Some(3))
        .await
        .expect("rated comment");
    assert_eq!(reload(&db, review.id).await.rating, 4.0);
}

#[actix_rt::test]
#[serial]
async fn aggregate_rounds_to_two_decimals() {
    let db = match setup_test_database().await {
        Some(db) => db,
        None => return,
    };
    cleanup_test_data(&db).await.expect("cleanup");

    let owner = create_test_user(&db, "owner", false).await.expect("owner");
    let review = create_test_review(&db, owner.id, "Dune", 5)
        .await
        .expect("review");

    rating::add_comment(&db, review.id, &owner, "First pass.", Some(3))
        .await
        .expect("first");
    rating::add_comment(&db, review.id, &owner, "Second pass.", Some(3))
        .await
        .expect("second");
    // (5 + 3 + 3) / 3 = 3.666...
    assert_eq!(reload(&db, review.id).await.rating, 3.67);
}

#[actix_rt::test]
#[serial]
async fn comment_validation_happens_before_any_write() {
    let db = match setup_test_database().await {
        Some(db) => db,
        None => return,
    };
    cleanup_test_data(&db).await.expect("cleanup");

    let owner = create_test_user(&db, "owner", false).await.expect("owner");
    let review = create_test_review(&db, owner.id, "Dune", 5)
        .await
        .expect("review");

    let empty = rating::add_comment(&db, review.id, &owner, "   ", Some(3)).await;
    assert!(matches!(empty, Err(ReviewError::Validation(_))));

    let too_low = rating::add_comment(&db, review.id, &owner, "Bad rating.", Some(0)).await;
    assert!(matches!(too_low, Err(ReviewError::Validation(_))));

    let too_high = rating::add_comment(&db, review.id, &owner, "Bad rating.", Some(6)).await;
    assert!(matches!(too_high, Err(ReviewError::Validation(_))));

    // Nothing was written and the aggregate never moved.
    assert_eq!(reload(&db, review.id).await.rating, 5.0);
}

#[actix_rt::test]
#[serial]
async fn only_members_owner_or_privileged_may_comment() {
    let db = match setup_test_database().await {
        Some(db) => db,
        None => return,
    };
    cleanup_test_data(&db).await.expect("cleanup");

    let owner = create_test_user(&db, "owner", false).await.expect("owner");
    let outsider = create_test_user(&db, "outsider", false)
        .await
        .expect("outsider");
    let librarian = create_test_user(&db, "librarian", true)
        .await
        .expect("librarian");
    let review = create_test_review(&db, owner.id, "Dune", 5)
        .await
        .expect("review");

    let denied = rating::add_comment(&db, review.id, &outsider, "Let me in.", None).await;
    assert!(matches!(denied, Err(ReviewError::Unauthorized)));

    rating::add_comment(&db, review.id, &librarian, "Privileged access.", None)
        .await
        .expect("privileged comment");

    // Membership opens the door for the outsider.
    membership::grant(&db, review.id, outsider.id)
        .await
        .expect("grant");
    rating::add_comment(&db, review.id, &outsider, "Member now.", Some(4))
        .await
        .expect("member comment");
}

#[actix_rt::test]
#[serial]
async fn departed_members_ratings_keep_counting() {
    let db = match setup_test_database().await {
        Some(db) => db,
        None => return,
    };
    cleanup_test_data(&db).await.expect("cleanup");

    let owner = create_test_user(&db, "owner", false).await.expect("owner");
    let member = create_test_user(&db, "member", false).await.expect("member");
    let review = create_test_review(&db, owner.id, "Dune", 5)
        .await
        .expect("review");

    membership::grant(&db, review.id, member.id)
        .await
        .expect("grant");
    rating::add_comment(&db, review.id, &member, "Before leaving.", Some(3))
        .await
        .expect("comment");
    assert_eq!(reload(&db, review.id).await.rating, 4.0);

    membership::leave(&db, &review, &member).await.expect("leave");

    // The departed member's rating still weighs into later recomputes.
    rating::add_comment(&db, review.id, &owner, "After they left.", Some(4))
        .await
        .expect("owner comment");
    assert_eq!(reload(&db, review.id).await.rating, 4.0);
}
