pub mod book;
pub mod index;
pub mod membership;
pub mod profile;
pub mod review;
pub mod search;
pub mod session;

/// Configures the web app by adding services from each web file.
///
/// Route resolution stops at the first match, so literal routes such as
/// /reviews/search must register before the /reviews/{id} pattern.
pub fn configure(conf: &mut actix_web::web::ServiceConfig) {
    index::configure(conf);
    search::configure(conf);
    membership::configure(conf);
    review::configure(conf);
    book::configure(conf);
    profile::configure(conf);
    session::configure(conf);
}
