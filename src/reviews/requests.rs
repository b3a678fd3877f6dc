//! Join-request workflow.
//!
//! Per (user, review): Absent -> Pending -> Accepted | Rejected. Accepted
//! and Rejected are terminal; an adjudicated row is never reused. The
//! request path keeps at most one pending row per (user, review) via
//! get-or-create under the review row lock, and adjudication commits the
//! status change and the membership grant as one transaction.

use crate::identity::Actor;
use crate::orm::join_requests::{self, RequestStatus};
use crate::orm::reviews;
use crate::reviews::{lock_review, membership, policy, ReviewError};
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{entity::*, query::*, DatabaseConnection, DatabaseTransaction, DbErr};

/// The two adjudication actions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Adjudication {
    Accept,
    Reject,
}

impl Adjudication {
    pub fn parse(action: &str) -> Option<Self> {
        match action {
            "accept" => Some(Self::Accept),
            "reject" => Some(Self::Reject),
            _ => None,
        }
    }
}

/// Create a join request, or return the existing pending one.
pub async fn request_join(
    db: &DatabaseConnection,
    review: &reviews::Model,
    actor: &Actor,
) -> Result<(join_requests::Model, bool), ReviewError> {
    if actor.id == review.user_id {
        return Err(ReviewError::SelfJoin);
    }

    let txn = db.begin().await?;
    lock_review(&txn, review.id).await?;
    let (request, created) = get_or_create_pending(&txn, review.id, actor.id).await?;
    txn.commit().await?;

    Ok((request, created))
}

/// Find or create the single pending request for (review, user). Returns
/// the row and whether this call created it. The caller must already hold
/// the review row lock on `txn`.
pub(crate) async fn get_or_create_pending(
    txn: &DatabaseTransaction,
    review_id: i32,
    user_id: i32,
) -> Result<(join_requests::Model, bool), DbErr> {
    if let Some(existing) = join_requests::Entity::find()
        .filter(join_requests::Column::ReviewId.eq(review_id))
        .filter(join_requests::Column::UserId.eq(user_id))
        .filter(join_requests::Column::Status.eq(RequestStatus::Pending.to_value()))
        .one(txn)
        .await?
    {
        return Ok((existing, false));
    }

    let request = join_requests::ActiveModel {
        review_id: Set(review_id),
        user_id: Set(user_id),
        status: Set(RequestStatus::Pending),
        requested_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(txn)
    .await?;

    Ok((request, true))
}

/// Accept or reject a pending request.
///
/// Only the review owner or a privileged actor may adjudicate. Accepting
/// marks the request and grants membership idempotently, both in the same
/// transaction; rejecting just marks the request. A request that is no
/// longer pending cannot be adjudicated again.
pub async fn adjudicate(
    db: &DatabaseConnection,
    review: &reviews::Model,
    adjudicator: &Actor,
    request_id: i32,
    action: Adjudication,
) -> Result<join_requests::Model, ReviewError> {
    if !policy::can_adjudicate(adjudicator.id, adjudicator.privileged, review.user_id) {
        return Err(ReviewError::Unauthorized);
    }

    // Dropping the transaction on any error path below rolls everything
    // back, so a failed grant never leaves the request marked accepted.
    let txn = db.begin().await?;
    lock_review(&txn, review.id).await?;

    let request = join_requests::Entity::find_by_id(request_id)
        .one(&txn)
        .await?
        .filter(|r| r.review_id == review.id)
        .ok_or(ReviewError::NotFound("join request"))?;

    if request.status != RequestStatus::Pending {
        return Err(ReviewError::validation(
            "this join request has already been adjudicated",
        ));
    }

    let new_status = match action {
        Adjudication::Accept => RequestStatus::Accepted,
        Adjudication::Reject => RequestStatus::Rejected,
    };

    join_requests::Entity::update_many()
        .col_expr(
            join_requests::Column::Status,
            Expr::value(new_status.to_value()),
        )
        .filter(join_requests::Column::Id.eq(request.id))
        .exec(&txn)
        .await?;

    if action == Adjudication::Accept {
        let (_, created) = membership::grant_in(&txn, review.id, request.user_id).await?;
        if created {
            log::info!(
                "request {} accepted; user {} is now a member of review {}",
                request.id,
                request.user_id,
                review.id
            );
        }
    } else {
        log::info!(
            "request {} from user {} rejected for review {}",
            request.id,
            request.user_id,
            review.id
        );
    }

    txn.commit().await?;

    Ok(join_requests::Model {
        status: new_status,
        ..request
    })
}

/// All pending requests for a review, oldest first, for the adjudicator.
pub async fn pending_for_review(
    db: &DatabaseConnection,
    review_id: i32,
) -> Result<Vec<join_requests::Model>, DbErr> {
    join_requests::Entity::find()
        .filter(join_requests::Column::ReviewId.eq(review_id))
        .filter(join_requests::Column::Status.eq(RequestStatus::Pending.to_value()))
        .order_by_asc(join_requests::Column::RequestedAt)
        .all(db)
        .await
}
