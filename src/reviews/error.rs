//! Domain error taxonomy for the review core.
//!
//! Every variant maps to a user-visible message and an HTTP status; none is
//! fatal, and every failure path leaves prior state unchanged.

use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use sea_orm::DbErr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("you cannot join your own review")]
    SelfJoin,

    #[error("you cannot leave your own review")]
    CannotLeaveOwnReview,

    #[error("you are not a member of this review")]
    NotAMember,

    #[error("you are not authorized to perform this action")]
    Unauthorized,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Validation(String),

    #[error("database error")]
    Db(#[from] DbErr),
}

impl ReviewError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

impl actix_web::ResponseError for ReviewError {
    fn status_code(&self) -> StatusCode {
        match self {
            ReviewError::SelfJoin
            | ReviewError::CannotLeaveOwnReview
            | ReviewError::NotAMember
            | ReviewError::Validation(_) => StatusCode::BAD_REQUEST,
            ReviewError::Unauthorized => StatusCode::FORBIDDEN,
            ReviewError::NotFound(_) => StatusCode::NOT_FOUND,
            ReviewError::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let ReviewError::Db(err) = self {
            log::error!("database error in review core: {}", err);
        }

        HttpResponse::build(self.status_code())
            .json(serde_json::json!({ "error": self.to_string() }))
    }
}
