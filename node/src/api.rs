//! # REST + JSON-RPC API
//!
//! Builds the axum router that exposes the custody node's HTTP interface.
//! All endpoints share application state through axum's `State` extractor.
//!
//! ## Endpoints
//!
//! | Method | Path                 | Description                       |
//! |--------|----------------------|-----------------------------------|
//! | GET    | `/health`            | Liveness probe                    |
//! | GET    | `/status`            | Vault and network summary         |
//! | GET    | `/accounts/:address` | Wallet and booked balances        |
//! | POST   | `/rpc`               | JSON-RPC 2.0 gateway              |
//!
//! ## Amounts
//!
//! Amounts travel as decimal strings of the smallest unit (wei). JSON
//! numbers are accepted on input when they fit in a `u64`.
//!
//! ## JSON-RPC methods
//!
//! - `vault_depositETH`, `vault_withdrawETH`, `vault_depositERC20`,
//!   `vault_withdrawERC20`, `vault_wrapETHToWETH`, `vault_unwrapWETHToETH`
//!   take the caller first. Zero amounts are refused.
//! - `vault_getETHBalance`, `vault_getAssetBalance`, `vault_wrappedToken`,
//!   `vault_checkSolvency`
//! - `erc20_deploy`, `erc20_approve`, `erc20_balanceOf`, `erc20_info`,
//!   `erc20_list`
//! - `devnet_faucet`, `devnet_nativeBalance`, `devnet_chainId`,
//!   `devnet_networkId`, `devnet_version`

use axum::{
    extract::{Path, State},
    http::{Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use custody_contracts::{Devnet, DevnetError, TokenInfo, VaultError};
use custody_protocol::config::{NetworkProfile, DEVNET_FAUCET_ETHER, WEI_PER_ETHER};
use custody_protocol::{format_ether, Amount, AssetId, Identity};

use crate::metrics::SharedMetrics;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
///
/// Cheap to clone: everything behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The node's reported version string.
    pub version: String,
    /// Network profile the node reports.
    pub network: NetworkProfile,
    /// The devnet hosting the vault. One operation at a time.
    pub devnet: Arc<Mutex<Devnet>>,
    /// Reference to Prometheus metrics for in-handler recording.
    pub metrics: SharedMetrics,
    /// When the node started.
    pub started_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all API routes, CORS, and tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/rpc", post(rpc_handler))
        .route("/accounts/:address", get(account_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// JSON-RPC Types
// ---------------------------------------------------------------------------

const INVALID_REQUEST: i32 = -32600;
const METHOD_NOT_FOUND: i32 = -32601;
const INVALID_PARAMS: i32 = -32602;
const INTERNAL_ERROR: i32 = -32603;
const INSUFFICIENT_BALANCE: i32 = -32010;
const TRANSFER_FAILED: i32 = -32011;
const ARITHMETIC_OVERFLOW: i32 = -32012;
const ZERO_AMOUNT: i32 = -32013;
const SUBSTRATE_REJECTED: i32 = -32020;
const UNKNOWN_ASSET: i32 = -32021;
const INSOLVENT: i32 = -32022;

/// A JSON-RPC 2.0 request envelope.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    /// Protocol version. Must be "2.0".
    pub jsonrpc: String,
    /// The method to invoke.
    pub method: String,
    /// Positional parameters.
    pub params: Option<Value>,
    /// Request identifier. Echoed back in the response.
    pub id: Value,
}

/// A JSON-RPC 2.0 response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// Protocol version. Always "2.0".
    pub jsonrpc: String,
    /// The result on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// The error on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    /// Request identifier, echoed from the request.
    pub id: Value,
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Numeric error code.
    pub code: i32,
    /// Short human-readable error description.
    pub message: String,
    /// Optional structured error data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(INVALID_PARAMS, format!("Invalid params: {}", message.into()))
    }

    fn internal(err: impl std::fmt::Display) -> Self {
        Self::new(INTERNAL_ERROR, format!("Internal error: {}", err))
    }
}

impl From<DevnetError> for JsonRpcError {
    fn from(err: DevnetError) -> Self {
        let code = match &err {
            DevnetError::Vault(VaultError::InsufficientBalance { .. }) => INSUFFICIENT_BALANCE,
            DevnetError::Vault(VaultError::TransferFailed(_)) => TRANSFER_FAILED,
            DevnetError::Vault(VaultError::ArithmeticOverflow { .. }) => ARITHMETIC_OVERFLOW,
            DevnetError::Vault(VaultError::ZeroAmount) => ZERO_AMOUNT,
            DevnetError::External(_) => SUBSTRATE_REJECTED,
            DevnetError::UnknownAsset(_) => UNKNOWN_ASSET,
            DevnetError::Insolvent { .. } => INSOLVENT,
        };
        Self::new(code, err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Response Types
// ---------------------------------------------------------------------------

/// Response payload for `GET /status`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Node software version.
    pub version: String,
    /// Network name.
    pub network: String,
    /// Chain id of the network profile.
    pub chain_id: u64,
    /// Identity the vault is deployed at.
    pub vault_address: String,
    /// The wrapped-native token the vault bridges into.
    pub wrapped_token: String,
    /// Native currency owed to depositors, in wei.
    pub total_native_custodied: String,
    /// Same, formatted in ether.
    pub total_native_custodied_ether: String,
    /// Identities with any non-zero booked balance.
    pub depositor_count: usize,
    /// Whether the vault holds at least what it owes.
    pub solvent: bool,
    /// Seconds since the node started.
    pub uptime_secs: i64,
    /// ISO-8601 timestamp of the response.
    pub timestamp: String,
}

/// One booked asset position.
#[derive(Debug, Serialize, Deserialize)]
pub struct AssetPosition {
    pub asset: String,
    pub symbol: Option<String>,
    pub balance: String,
}

/// Response payload for `GET /accounts/:address`.
#[derive(Debug, Serialize, Deserialize)]
pub struct AccountResponse {
    /// Hex-encoded account address.
    pub address: String,
    /// Native currency in the account's own wallet, in wei.
    pub wallet_native: String,
    /// Native currency booked for the account in the vault, in wei.
    pub vault_native: String,
    /// Booked token balances, sorted by asset id.
    pub vault_assets: Vec<AssetPosition>,
}

/// Token metadata, with supply as a decimal string.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub asset: String,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub total_supply: String,
    pub created_at: String,
}

impl From<&TokenInfo> for TokenResponse {
    fn from(info: &TokenInfo) -> Self {
        Self {
            asset: info.id.to_string(),
            name: info.name.clone(),
            symbol: info.symbol.clone(),
            decimals: info.decimals,
            total_supply: info.total_supply.to_string(),
            created_at: info.created_at.to_rfc3339(),
        }
    }
}

/// Returned by every successful state-changing RPC.
#[derive(Debug, Serialize, Deserialize)]
pub struct OperationReceipt {
    /// Unique id for log correlation.
    pub operation_id: String,
    pub method: String,
    pub caller: String,
    pub amount: String,
    pub timestamp: String,
}

/// Generic error body returned by REST endpoints on failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health`: returns 200 if the node is alive.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

/// `GET /status`: returns a summary of the vault and the network.
async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let devnet = state.devnet.lock();
    let ledger = devnet.vault().ledger();
    let total = ledger.total_eth();
    let now = Utc::now();

    let resp = StatusResponse {
        version: state.version.clone(),
        network: state.network.name().to_string(),
        chain_id: state.network.chain_id(),
        vault_address: devnet.vault_address().to_string(),
        wrapped_token: devnet.wrapped_token().to_string(),
        total_native_custodied: total.to_string(),
        total_native_custodied_ether: format_ether(total),
        depositor_count: ledger.depositor_count(),
        solvent: devnet.check_solvency().is_ok(),
        uptime_secs: (now - state.started_at).num_seconds(),
        timestamp: now.to_rfc3339(),
    };
    Json(resp)
}

/// `GET /accounts/:address`: wallet and booked balances for an identity.
///
/// Unknown identities get an all-zero response.
async fn account_handler(
    Path(address): Path<String>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let who: Identity = match address.parse() {
        Ok(who) => who,
        Err(e) => {
            let err = ErrorResponse {
                error: format!("Invalid address {}: {}", address, e),
            };
            return (StatusCode::BAD_REQUEST, Json(err)).into_response();
        }
    };

    let devnet = state.devnet.lock();
    let vault_assets = devnet
        .vault()
        .ledger()
        .asset_positions(&who)
        .into_iter()
        .map(|(asset, balance)| AssetPosition {
            asset: asset.to_string(),
            symbol: devnet.token_info(&asset).map(|info| info.symbol.clone()),
            balance: balance.to_string(),
        })
        .collect();

    let account = AccountResponse {
        address: who.to_string(),
        wallet_native: devnet.native_balance_of(&who).to_string(),
        vault_native: devnet.vault().eth_balance(&who).to_string(),
        vault_assets,
    };
    (StatusCode::OK, Json(account)).into_response()
}

/// `POST /rpc`: JSON-RPC 2.0 gateway.
///
/// Unknown methods return error code -32601 (Method not found).
async fn rpc_handler(
    State(state): State<AppState>,
    Json(req): Json<JsonRpcRequest>,
) -> impl IntoResponse {
    if req.jsonrpc != "2.0" {
        return Json(JsonRpcResponse {
            jsonrpc: "2.0".into(),
            result: None,
            error: Some(JsonRpcError::new(
                INVALID_REQUEST,
                "Invalid Request: jsonrpc must be \"2.0\"",
            )),
            id: req.id,
        });
    }

    let params = Params::new(req.params.as_ref());
    let (result, error) = match dispatch(&state, &req.method, &params) {
        Ok(value) => (Some(value), None),
        Err(err) => (None, Some(err)),
    };

    Json(JsonRpcResponse {
        jsonrpc: "2.0".into(),
        result,
        error,
        id: req.id,
    })
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

fn dispatch(state: &AppState, method: &str, params: &Params<'_>) -> Result<Value, JsonRpcError> {
    match method {
        // -- vault: state-changing --------------------------------------------
        "vault_depositETH" => {
            let caller = params.identity(0, "caller")?;
            let amount = params.amount(1, "amount")?;
            vault_op(state, method, caller, amount, |d| d.deposit_eth(&caller, amount))
        }
        "vault_withdrawETH" => {
            let caller = params.identity(0, "caller")?;
            let amount = params.amount(1, "amount")?;
            vault_op(state, method, caller, amount, |d| d.withdraw_eth(&caller, amount))
        }
        "vault_depositERC20" => {
            let caller = params.identity(0, "caller")?;
            let asset = params.asset(1, "asset")?;
            let amount = params.amount(2, "amount")?;
            vault_op(state, method, caller, amount, |d| {
                d.deposit_erc20(&caller, &asset, amount)
            })
        }
        "vault_withdrawERC20" => {
            let caller = params.identity(0, "caller")?;
            let asset = params.asset(1, "asset")?;
            let amount = params.amount(2, "amount")?;
            vault_op(state, method, caller, amount, |d| {
                d.withdraw_erc20(&caller, &asset, amount)
            })
        }
        "vault_wrapETHToWETH" => {
            let caller = params.identity(0, "caller")?;
            let amount = params.amount(1, "amount")?;
            vault_op(state, method, caller, amount, |d| d.wrap_eth_to_weth(&caller, amount))
        }
        "vault_unwrapWETHToETH" => {
            let caller = params.identity(0, "caller")?;
            let amount = params.amount(1, "amount")?;
            vault_op(state, method, caller, amount, |d| {
                d.unwrap_weth_to_eth(&caller, amount)
            })
        }

        // -- vault: queries ---------------------------------------------------
        "vault_getETHBalance" => {
            let caller = params.identity(0, "caller")?;
            let balance = state.devnet.lock().vault().eth_balance(&caller);
            Ok(json!(balance.to_string()))
        }
        "vault_getAssetBalance" => {
            let caller = params.identity(0, "caller")?;
            let asset = params.asset(1, "asset")?;
            let balance = state.devnet.lock().vault().asset_balance(&caller, &asset);
            Ok(json!(balance.to_string()))
        }
        "vault_wrappedToken" => Ok(json!(state.devnet.lock().wrapped_token().to_string())),
        "vault_checkSolvency" => match state.devnet.lock().check_solvency() {
            Ok(()) => Ok(json!({ "solvent": true })),
            Err(DevnetError::Insolvent { asset, held, owed }) => Ok(json!({
                "solvent": false,
                "asset": asset,
                "held": held.to_string(),
                "owed": owed.to_string(),
            })),
            Err(e) => Err(e.into()),
        },

        // -- tokens -----------------------------------------------------------
        "erc20_deploy" => {
            let name = params.string(0, "name")?;
            let symbol = params.string(1, "symbol")?;
            let initial_account = params.identity(2, "initial_account")?;
            let initial_balance = params.amount(3, "initial_balance")?;
            let asset = state
                .devnet
                .lock()
                .deploy_token(name, symbol, &initial_account, initial_balance);
            Ok(json!(asset.to_string()))
        }
        "erc20_approve" => {
            let owner = params.identity(0, "owner")?;
            let asset = params.asset(1, "asset")?;
            let amount = params.amount(2, "amount")?;
            state.devnet.lock().approve(&owner, &asset, amount)?;
            Ok(json!(true))
        }
        "erc20_balanceOf" => {
            let holder = params.identity(0, "holder")?;
            let asset = params.asset(1, "asset")?;
            let balance = state.devnet.lock().token_balance_of(&holder, &asset)?;
            Ok(json!(balance.to_string()))
        }
        "erc20_info" => {
            let asset = params.asset(0, "asset")?;
            let devnet = state.devnet.lock();
            let info = devnet
                .token_info(&asset)
                .ok_or(DevnetError::UnknownAsset(asset))?;
            serde_json::to_value(TokenResponse::from(info)).map_err(JsonRpcError::internal)
        }
        "erc20_list" => {
            let devnet = state.devnet.lock();
            let tokens: Vec<TokenResponse> =
                devnet.tokens().into_iter().map(TokenResponse::from).collect();
            serde_json::to_value(tokens).map_err(JsonRpcError::internal)
        }

        // -- devnet -----------------------------------------------------------
        "devnet_faucet" => {
            let account = params.identity(0, "account")?;
            let amount = params
                .optional_amount(1, "amount")?
                .unwrap_or(DEVNET_FAUCET_ETHER * WEI_PER_ETHER);
            let mut devnet = state.devnet.lock();
            devnet.faucet(&account, amount)?;
            Ok(json!(devnet.native_balance_of(&account).to_string()))
        }
        "devnet_nativeBalance" => {
            let account = params.identity(0, "account")?;
            let balance = state.devnet.lock().native_balance_of(&account);
            Ok(json!(balance.to_string()))
        }
        "devnet_chainId" => Ok(json!(state.network.chain_id())),
        "devnet_networkId" => Ok(json!(state.network.name())),
        "devnet_version" => Ok(json!(state.version)),

        _ => Err(JsonRpcError::new(
            METHOD_NOT_FOUND,
            format!("Method not found: {}", method),
        )),
    }
}

/// Runs one vault operation under the devnet lock, records metrics, and
/// turns the outcome into a receipt or an RPC error.
fn vault_op<F>(
    state: &AppState,
    method: &str,
    caller: Identity,
    amount: Amount,
    op: F,
) -> Result<Value, JsonRpcError>
where
    F: FnOnce(&mut Devnet) -> Result<(), DevnetError>,
{
    let started = Instant::now();
    let mut devnet = state.devnet.lock();
    let outcome: Result<(), DevnetError> = if amount == 0 {
        Err(VaultError::ZeroAmount.into())
    } else {
        op(&mut devnet)
    };
    state.metrics.record(method, &outcome, started.elapsed());
    state.metrics.refresh(&devnet);
    drop(devnet);

    match outcome {
        Ok(()) => {
            let receipt = OperationReceipt {
                operation_id: Uuid::new_v4().to_string(),
                method: method.to_string(),
                caller: caller.to_string(),
                amount: amount.to_string(),
                timestamp: Utc::now().to_rfc3339(),
            };
            tracing::info!(
                operation_id = %receipt.operation_id,
                method = method,
                caller = %caller,
                amount = %amount,
                "vault operation applied"
            );
            serde_json::to_value(receipt).map_err(JsonRpcError::internal)
        }
        Err(err) => {
            tracing::warn!(method = method, caller = %caller, amount = %amount, error = %err, "vault operation refused");
            Err(err.into())
        }
    }
}

// ---------------------------------------------------------------------------
// Params
// ---------------------------------------------------------------------------

/// Positional JSON-RPC parameters.
struct Params<'a> {
    values: &'a [Value],
}

impl<'a> Params<'a> {
    fn new(params: Option<&'a Value>) -> Self {
        let values = params
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        Self { values }
    }

    fn raw(&self, index: usize, name: &str) -> Result<&'a Value, JsonRpcError> {
        self.values
            .get(index)
            .ok_or_else(|| JsonRpcError::invalid_params(format!("missing {} at position {}", name, index)))
    }

    fn string(&self, index: usize, name: &str) -> Result<&'a str, JsonRpcError> {
        self.raw(index, name)?
            .as_str()
            .ok_or_else(|| JsonRpcError::invalid_params(format!("{} must be a string", name)))
    }

    fn identity(&self, index: usize, name: &str) -> Result<Identity, JsonRpcError> {
        self.string(index, name)?
            .parse()
            .map_err(|e| JsonRpcError::invalid_params(format!("{}: {}", name, e)))
    }

    fn asset(&self, index: usize, name: &str) -> Result<AssetId, JsonRpcError> {
        self.string(index, name)?
            .parse()
            .map_err(|e| JsonRpcError::invalid_params(format!("{}: {}", name, e)))
    }

    fn amount(&self, index: usize, name: &str) -> Result<Amount, JsonRpcError> {
        parse_amount(self.raw(index, name)?, name)
    }

    fn optional_amount(&self, index: usize, name: &str) -> Result<Option<Amount>, JsonRpcError> {
        match self.values.get(index) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => parse_amount(value, name).map(Some),
        }
    }
}

fn parse_amount(value: &Value, name: &str) -> Result<Amount, JsonRpcError> {
    match value {
        Value::String(s) => s
            .parse::<Amount>()
            .map_err(|e| JsonRpcError::invalid_params(format!("{}: {}", name, e))),
        Value::Number(n) => n
            .as_u64()
            .map(Amount::from)
            .ok_or_else(|| JsonRpcError::invalid_params(format!("{} must be a non-negative integer", name))),
        _ => Err(JsonRpcError::invalid_params(format!(
            "{} must be a decimal string",
            name
        ))),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
