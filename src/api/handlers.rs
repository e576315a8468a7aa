use actix_web::{web, HttpResponse, Responder};
use log::error;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::blockchain::{Block, BlockSummary, ChainError, Ledger, Transaction};
use crate::voting::{SlowVoteSource, VoteNameCache};

/// Shared ledger handle
pub type LedgerData = web::Data<Ledger>;

/// Shared vote name cache
pub type VoteCacheData = web::Data<VoteNameCache<SlowVoteSource>>;

/// Response for the chain endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ChainResponse {
    /// The length of the chain
    pub length: usize,

    /// Leading zeros required in every block hash
    pub difficulty: u32,

    /// The blocks in the chain
    pub chain: Vec<Block>,

    /// Whether the chain is valid
    pub is_valid: bool,
}

/// Request for the mine endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct MineRequest {
    /// Transactions to include in the new block
    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

/// Response for the validate endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ValidationResponse {
    pub valid: bool,

    /// First violation found, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Response for the voting endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct VoteResponse {
    pub isbn: String,
    pub name: String,
}

fn chain_error_response(err: &ChainError) -> HttpResponse {
    let body = serde_json::json!({ "error": err.to_string() });
    match err {
        ChainError::StaleTip { .. } => HttpResponse::Conflict().json(body),
        ChainError::InvalidLinkage { .. }
        | ChainError::InvalidProofOfWork { .. }
        | ChainError::HashMismatch { .. } => HttpResponse::BadRequest().json(body),
        ChainError::EmptyChain | ChainError::DifficultyOutOfRange(_) => {
            error!("Ledger is misconfigured: {}", err);
            HttpResponse::InternalServerError().json(body)
        }
    }
}

/// List transactions that spend inputs
///
/// Returns every transaction with a non-empty input list, in block order
#[utoipa::path(
    get,
    path = "/api/v1/transactions",
    responses(
        (status = 200, description = "Transactions retrieved successfully", body = Vec<Transaction>)
    )
)]
pub async fn get_transactions(ledger: LedgerData) -> impl Responder {
    HttpResponse::Ok().json(ledger.transactions_with_inputs())
}

/// Look up a vote name
///
/// Answers from the cache when possible, otherwise asks the slow source
#[utoipa::path(
    get,
    path = "/api/v1/voting/{isbn}",
    params(
        ("isbn" = String, Path, description = "Ballot identifier")
    ),
    responses(
        (status = 200, description = "Vote name retrieved successfully", body = VoteResponse)
    )
)]
pub async fn get_vote_name(cache: VoteCacheData, isbn: web::Path<String>) -> impl Responder {
    let isbn = isbn.into_inner();
    let name = cache.lookup(&isbn).await;

    HttpResponse::Ok().json(VoteResponse { isbn, name })
}

/// Get the full chain
///
/// Returns the entire chain and its validity status
#[utoipa::path(
    get,
    path = "/api/v1/chain",
    responses(
        (status = 200, description = "Chain retrieved successfully", body = ChainResponse)
    )
)]
pub async fn get_chain(ledger: LedgerData) -> impl Responder {
    let chain = ledger.snapshot();

    let response = ChainResponse {
        length: chain.len(),
        difficulty: chain.difficulty(),
        is_valid: chain.is_valid(),
        chain: chain.blocks().to_vec(),
    };

    HttpResponse::Ok().json(response)
}

/// Get the tip of the chain
#[utoipa::path(
    get,
    path = "/api/v1/chain/tip",
    responses(
        (status = 200, description = "Tip retrieved successfully", body = BlockSummary),
        (status = 500, description = "Ledger has no blocks")
    )
)]
pub async fn get_tip(ledger: LedgerData) -> impl Responder {
    match ledger.tip_summary() {
        Ok(summary) => HttpResponse::Ok().json(summary),
        Err(err) => chain_error_response(&err),
    }
}

/// Mine a new block
///
/// Mines the given transactions into a block on top of the tip
#[utoipa::path(
    post,
    path = "/api/v1/mine",
    request_body = MineRequest,
    responses(
        (status = 201, description = "Block mined successfully", body = BlockSummary),
        (status = 409, description = "Tip kept moving while mining"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn mine_block(ledger: LedgerData, mine_req: web::Json<MineRequest>) -> impl Responder {
    let ledger = ledger.into_inner();
    let transactions = mine_req.into_inner().transactions;

    // Mining is CPU bound, keep it off the async workers
    match web::block(move || ledger.mine_and_append(transactions)).await {
        Ok(Ok(summary)) => HttpResponse::Created().json(summary),
        Ok(Err(err)) => chain_error_response(&err),
        Err(err) => {
            error!("Mining task failed: {}", err);
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": format!("Mining task failed: {}", err)
            }))
        }
    }
}

/// Check if the chain is valid
///
/// Validates the entire chain and reports the first violation
#[utoipa::path(
    get,
    path = "/api/v1/validate",
    responses(
        (status = 200, description = "Chain validation status", body = ValidationResponse)
    )
)]
pub async fn validate_chain(ledger: LedgerData) -> impl Responder {
    let response = match ledger.validate() {
        Ok(()) => ValidationResponse {
            valid: true,
            error: None,
        },
        Err(err) => ValidationResponse {
            valid: false,
            error: Some(err.to_string()),
        },
    };

    HttpResponse::Ok().json(response)
}
