//! Integration tests for joining and leaving reviews

mod common;
use serial_test::serial;

use bookclub::orm::review_memberships;
use bookclub::reviews::membership::{self, JoinOutcome};
use bookclub::reviews::ReviewError;
use common::{database::*, fixtures::*};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};

#[actix_rt::test]
#[serial]
async fn privileged_join_is_direct_and_idempotent() {
    let db = match setup_test_database().await {
        Some(db) => db,
        None => return,
    };
    cleanup_test_data(&db).await.expect("cleanup");

    let owner = create_test_user(&db, "owner", false).await.expect("owner");
    let librarian = create_test_user(&db, "librarian", true)
        .await
        .expect("librarian");
    let review = create_test_review(&db, owner.id, "Dune", 5)
        .await
        .expect("review");

    let first = membership::join(&db, &review, &librarian)
        .await
        .expect("first join");
    assert!(matches!(first, JoinOutcome::Joined(_)));

    let second = membership::join(&db, &review, &librarian)
        .await
        .expect("second join");
    assert!(matches!(second, JoinOutcome::AlreadyMember(_)));

    let rows = review_memberships::Entity::find()
        .filter(review_memberships::Column::ReviewId.eq(review.id))
        .filter(review_memberships::Column::UserId.eq(librarian.id))
        .count(&db)
        .await
        .expect("count");
    assert_eq!(rows, 1, "repeated joins must not duplicate the membership");
}

#[actix_rt::test]
#[serial]
async fn unprivileged_join_becomes_a_request() {
    let db = match setup_test_database().await {
        Some(db) => db,
        None => return,
    };
    cleanup_test_data(&db).await.expect("cleanup");

    let owner = create_test_user(&db, "owner", false).await.expect("owner");
    let reader = create_test_user(&db, "reader", false).await.expect("reader");
    let review = create_test_review(&db, owner.id, "Dune", 4)
        .await
        .expect("review");

    let first = membership::join(&db, &review, &reader)
        .await
        .expect("first attempt");
    assert!(matches!(first, JoinOutcome::Requested(_)));

    // No membership yet, just a pending request.
    let memberships = review_memberships::Entity::find()
        .filter(review_memberships::Column::UserId.eq(reader.id))
        .count(&db)
        .await
        .expect("count");
    assert_eq!(memberships, 0);

    let second = membership::join(&db, &review, &reader)
        .await
        .expect("second attempt");
    assert!(matches!(second, JoinOutcome::AlreadyRequested(_)));
}

#[actix_rt::test]
#[serial]
async fn owner_cannot_join_own_review() {
    let db = match setup_test_database().await {
        Some(db) => db,
        None => return,
    };
    cleanup_test_data(&db).await.expect("cleanup");

    let owner = create_test_user(&db, "owner", true).await.expect("owner");
    let review = create_test_review(&db, owner.id, "Dune", 3)
        .await
        .expect("review");

    let result = membership::join(&db, &review, &owner).await;
    assert!(matches!(result, Err(ReviewError::SelfJoin)));
}

#[actix_rt::test]
#[serial]
async fn owner_cannot_leave_own_review() {
    let db = match setup_test_database().await {
        Some(db) => db,
        None => return,
    };
    cleanup_test_data(&db).await.expect("cleanup");

    let owner = create_test_user(&db, "owner", false).await.expect("owner");
    let review = create_test_review(&db, owner.id, "Dune", 3)
        .await
        .expect("review");

    let result = membership::leave(&db, &review, &owner).await;
    assert!(matches!(result, Err(ReviewError::CannotLeaveOwnReview)));
}

#[actix_rt::test]
#[serial]
async fn leaving_without_membership_fails() {
    let db = match setup_test_database().await {
        Some(db) => db,
        None => return,
    };
    cleanup_test_data(&db).await.expect("cleanup");

    let owner = create_test_user(&db, "owner", false).await.expect("owner");
    let reader = create_test_user(&db, "reader", false).await.expect("reader");
    let review = create_test_review(&db, owner.id, "Dune", 3)
        .await
        .expect("review");

    let result = membership::leave(&db, &review, &reader).await;
    assert!(matches!(result, Err(ReviewError::NotAMember)));
}

#[actix_rt::test]
#[serial]
async fn member_can_leave_and_membership_row_goes_away() {
    let db = match setup_test_database().await {
        Some(db) => db,
        None => return,
    };
    cleanup_test_data(&db).await.expect("cleanup");

    let owner = create_test_user(&db, "owner", false).await.expect("owner");
    let librarian = create_test_user(&db, "librarian", true)
        .await
        .expect("librarian");
    let review = create_test_review(&db, owner.id, "Dune", 3)
        .await
        .expect("review");

    membership::join(&db, &review, &librarian)
        .await
        .expect("join");
    membership::leave(&db, &review, &librarian)
        .await
        .expect("leave");

    let rows = review_memberships::Entity::find()
        .filter(review_memberships::Column::UserId.eq(librarian.id))
        .count(&db)
        .await
        .expect("count");
    assert_eq!(rows, 0);

    // Leaving twice fails the second time.
    let again = membership::leave(&db, &review, &librarian).await;
    assert!(matches!(again, Err(ReviewError::NotAMember)));
}

#[actix_rt::test]
#[serial]
async fn simultaneous_joins_create_exactly_one_membership() {
    let db = match setup_test_database().await {
        Some(db) => db,
        None => return,
    };
    cleanup_test_data(&db).await.expect("cleanup");

    let owner = create_test_user(&db, "owner", false).await.expect("owner");
    let librarian = create_test_user(&db, "librarian", true)
        .await
        .expect("librarian");
    let review = create_test_review(&db, owner.id, "Dune", 5)
        .await
        .expect("review");

    // Both attempts race through the existence check; the review row lock
    // must serialize them so only one inserts.
    let (a, b) = futures_util::future::join(
        membership::join(&db, &review, &librarian),
        membership::join(&db, &review, &librarian),
    )
    .await;
    let outcomes = [a.expect("join a"), b.expect("join b")];

    let joined = outcomes
        .iter()
        .filter(|o| matches!(o, JoinOutcome::Joined(_)))
        .count();
    assert_eq!(joined, 1, "exactly one attempt should create the row");

    let rows = review_memberships::Entity::find()
        .filter(review_memberships::Column::ReviewId.eq(review.id))
        .filter(review_memberships::Column::UserId.eq(librarian.id))
        .count(&db)
        .await
        .expect("count");
    assert_eq!(rows, 1);

    // A single leave now fully removes the membership.
    membership::leave(&db, &review, &librarian)
        .await
        .expect("leave");
    let remaining = review_memberships::Entity::find()
        .filter(review_memberships::Column::UserId.eq(librarian.id))
        .count(&db)
        .await
        .expect("count");
    assert_eq!(remaining, 0);
}
