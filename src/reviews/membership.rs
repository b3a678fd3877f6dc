//! Membership manager.
//!
//! A membership pairs a user with a review they have joined; at most one
//! row per (user, review). Privileged users are granted membership
//! immediately; everyone else goes through the join-request workflow.
//!
//! Every write path runs in a transaction holding the review row lock
//! (see [`crate::reviews::lock_review`]), so two concurrent joins for the
//! same (user, review) cannot both pass the existence check and insert a
//! duplicate row.

use crate::identity::Actor;
use crate::orm::{review_memberships, reviews};
use crate::reviews::{lock_review, policy, requests, ReviewError};
use chrono::Utc;
use sea_orm::{entity::*, query::*, DatabaseConnection, DatabaseTransaction, DbErr};

/// What a join attempt resolved to.
#[derive(Debug)]
pub enum JoinOutcome {
    /// A membership was created.
    Joined(review_memberships::Model),
    /// The caller already held a membership; nothing changed.
    AlreadyMember(review_memberships::Model),
    /// A pending join request was created for the owner to adjudicate.
    Requested(crate::orm::join_requests::Model),
    /// A pending request already existed; nothing changed.
    AlreadyRequested(crate::orm::join_requests::Model),
}

impl JoinOutcome {
    /// Stable label for API responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            JoinOutcome::Joined(_) => "joined",
            JoinOutcome::AlreadyMember(_) => "already_member",
            JoinOutcome::Requested(_) => "requested",
            JoinOutcome::AlreadyRequested(_) => "already_requested",
        }
    }
}

/// Handle a join attempt against a review.
///
/// The owner is rejected outright; ownership already implies full rights.
/// Privileged actors get an idempotent direct grant, everyone else is
/// routed into the request workflow.
pub async fn join(
    db: &DatabaseConnection,
    review: &reviews::Model,
    actor: &Actor,
) -> Result<JoinOutcome, ReviewError> {
    if actor.id == review.user_id {
        return Err(ReviewError::SelfJoin);
    }

    let txn = db.begin().await?;
    lock_review(&txn, review.id).await?;

    let outcome = if policy::can_join_directly(actor.privileged) {
        let (membership, created) = grant_in(&txn, review.id, actor.id).await?;
        if created {
            log::info!("user {} joined review {} directly", actor.id, review.id);
            JoinOutcome::Joined(membership)
        } else {
            JoinOutcome::AlreadyMember(membership)
        }
    } else {
        let (request, created) =
            requests::get_or_create_pending(&txn, review.id, actor.id).await?;
        if created {
            log::info!(
                "user {} requested to join review {}",
                actor.id,
                review.id
            );
            JoinOutcome::Requested(request)
        } else {
            JoinOutcome::AlreadyRequested(request)
        }
    };

    txn.commit().await?;
    Ok(outcome)
}

/// Idempotent membership grant. Returns the row and whether it was created
/// by this call. Takes the review row lock for the duration of the check
/// and insert.
pub async fn grant(
    db: &DatabaseConnection,
    review_id: i32,
    user_id: i32,
) -> Result<(review_memberships::Model, bool), ReviewError> {
    let txn = db.begin().await?;
    lock_review(&txn, review_id).await?;
    let granted = grant_in(&txn, review_id, user_id).await?;
    txn.commit().await?;
    Ok(granted)
}

/// Grant step for callers already inside a transaction holding the review
/// row lock.
pub(crate) async fn grant_in(
    txn: &DatabaseTransaction,
    review_id: i32,
    user_id: i32,
) -> Result<(review_memberships::Model, bool), DbErr> {
    if let Some(existing) = review_memberships::Entity::find()
        .filter(review_memberships::Column::ReviewId.eq(review_id))
        .filter(review_memberships::Column::UserId.eq(user_id))
        .one(txn)
        .await?
    {
        return Ok((existing, false));
    }

    let membership = review_memberships::ActiveModel {
        review_id: Set(review_id),
        user_id: Set(user_id),
        joined_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(txn)
    .await?;

    Ok((membership, true))
}

/// Leave a review's collaborative group.
///
/// The owner cannot leave their own review; a non-member gets
/// [`ReviewError::NotAMember`]. Past comments by a departing member keep
/// counting toward the rating aggregate.
pub async fn leave(
    db: &DatabaseConnection,
    review: &reviews::Model,
    actor: &Actor,
) -> Result<(), ReviewError> {
    if actor.id == review.user_id {
        return Err(ReviewError::CannotLeaveOwnReview);
    }

    let membership = review_memberships::Entity::find()
        .filter(review_memberships::Column::ReviewId.eq(review.id))
        .filter(review_memberships::Column::UserId.eq(actor.id))
        .one(db)
        .await?
        .ok_or(ReviewError::NotAMember)?;

    review_memberships::Entity::delete_by_id(membership.id)
        .exec(db)
        .await?;

    log::info!("user {} left review {}", actor.id, review.id);
    Ok(())
}
