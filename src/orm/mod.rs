pub mod books;
pub mod comments;
pub mod join_requests;
pub mod profiles;
pub mod review_memberships;
pub mod reviews;
pub mod user_books;
pub mod users;
