// API module
//
// This module contains the HTTP surface over the ledger and the vote cache

pub mod handlers;
pub mod routes;

use utoipa::OpenApi;

// Re-export main components for easier access
pub use routes::configure_routes;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::get_transactions,
        handlers::get_vote_name,
        handlers::get_chain,
        handlers::get_tip,
        handlers::mine_block,
        handlers::validate_chain
    ),
    components(
        schemas(
            crate::blockchain::Block,
            crate::blockchain::BlockSummary,
            crate::blockchain::Transaction,
            crate::blockchain::InputRef,
            crate::blockchain::OutputRef,
            handlers::ChainResponse,
            handlers::MineRequest,
            handlers::ValidationResponse,
            handlers::VoteResponse
        )
    ),
    tags(
        (name = "ledger", description = "Ledger API endpoints")
    ),
    info(
        title = "Vote Ledger API",
        version = "0.1.0",
        description = "An in-memory proof-of-work ledger for ballot transactions",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    )
)]
pub struct ApiDoc;
