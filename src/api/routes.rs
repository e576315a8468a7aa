use actix_web::web;

use super::handlers;

/// Configures the API routes
///
/// # Arguments
///
/// * `cfg` - The service configuration
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .route("/transactions", web::get().to(handlers::get_transactions))
            .route("/voting/{isbn}", web::get().to(handlers::get_vote_name))
            .route("/chain", web::get().to(handlers::get_chain))
            .route("/chain/tip", web::get().to(handlers::get_tip))
            .route("/mine", web::post().to(handlers::mine_block))
            .route("/validate", web::get().to(handlers::validate_chain))
    );
}
