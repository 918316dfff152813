use crate::constants::MAX_BLOCKS_PER_REQUEST;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use ledger_core::{Block, Chain, LedgerError};
use ledger_storage::sled_store::SledStore;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) chain: Chain<SledStore>,
    /// Appends are serialized; scans run freely.
    pub(crate) writer: Arc<Mutex<()>>,
}

impl AppState {
    pub(crate) fn new(chain: Chain<SledStore>) -> Self {
        Self {
            chain,
            writer: Arc::new(Mutex::new(())),
        }
    }
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Head {
    pub(crate) height: usize,
    pub(crate) tip: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct BlockRow {
    pub(crate) hash: String,
    pub(crate) previous_hash: Option<String>,
    pub(crate) ts: i64,
    pub(crate) nonce: u64,
    pub(crate) tx_count: usize,
    pub(crate) pow_valid: bool,
}

impl BlockRow {
    fn from_block(block: &Block, pow_valid: bool) -> Self {
        Self {
            hash: hex::encode(block.hash()),
            previous_hash: block.prev_block_hash().map(hex::encode),
            ts: block.timestamp(),
            nonce: block.nonce(),
            tx_count: block.transactions().len(),
            pow_valid,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Balance {
    pub(crate) address: String,
    pub(crate) balance: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TransferIn {
    pub(crate) from: String,
    pub(crate) to: String,
    pub(crate) amount: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct TransferOut {
    pub(crate) accepted: bool,
    pub(crate) block: BlockRow,
}

/// Ledger failure rendered as a JSON body with a matching status.
#[derive(Debug)]
pub(crate) struct ApiError(pub(crate) LedgerError);

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    pub(crate) fn status(&self) -> StatusCode {
        match self.0 {
            LedgerError::InvalidAmount | LedgerError::ValueOverflow => StatusCode::BAD_REQUEST,
            LedgerError::InsufficientFunds { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            LedgerError::TipMoved { .. } => StatusCode::CONFLICT,
            LedgerError::MiningCancelled => StatusCode::SERVICE_UNAVAILABLE,
            LedgerError::StoreNotFound => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!("request failed: {}", self.0);
        }
        let body = Json(serde_json::json!({ "error": self.0.to_string() }));
        (status, body).into_response()
    }
}

/// Runs a chain call on the blocking pool; sled reads and mining both block.
async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> ledger_core::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError(LedgerError::Storage(anyhow::anyhow!("worker task failed: {e}"))))?
        .map_err(ApiError)
}

pub(crate) async fn head(State(state): State<AppState>) -> Result<Json<Head>, ApiError> {
    let chain = state.chain.clone();
    let (height, tip) = blocking(move || Ok((chain.height()?, chain.tip()?))).await?;
    Ok(Json(Head {
        height,
        tip: hex::encode(tip),
    }))
}

pub(crate) async fn blocks(State(state): State<AppState>) -> Result<Json<Vec<BlockRow>>, ApiError> {
    let chain = state.chain.clone();
    let rows = blocking(move || {
        let mut rows = Vec::new();
        for block in chain.iter()?.take(MAX_BLOCKS_PER_REQUEST) {
            let block = block?;
            rows.push(BlockRow::from_block(&block, chain.validate(&block)));
        }
        Ok(rows)
    })
    .await?;
    Ok(Json(rows))
}

pub(crate) async fn balance(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<Balance>, ApiError> {
    let chain = state.chain.clone();
    let lookup = address.clone();
    let balance = blocking(move || chain.balance(&lookup)).await?;
    Ok(Json(Balance { address, balance }))
}

pub(crate) async fn transfer(
    State(state): State<AppState>,
    Json(req): Json<TransferIn>,
) -> Result<Json<TransferOut>, ApiError> {
    let chain = state.chain.clone();
    let writer = Arc::clone(&state.writer);
    let (block, pow_valid) = blocking(move || {
        let _guard = writer
            .lock()
            .map_err(|_| LedgerError::Storage(anyhow::anyhow!("writer lock poisoned")))?;
        let block = chain.transfer(&req.from, &req.to, req.amount)?;
        let pow_valid = chain.validate(&block);
        Ok((block, pow_valid))
    })
    .await?;
    info!("transfer mined in block {}", hex::encode(block.hash()));
    Ok(Json(TransferOut {
        accepted: true,
        block: BlockRow::from_block(&block, pow_valid),
    }))
}

pub(crate) fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(Health { status: "ok" }) }))
        .route("/chain/head", get(head))
        .route("/chain/blocks", get(blocks))
        .route("/balance/{address}", get(balance))
        .route("/transfer", post(transfer))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
