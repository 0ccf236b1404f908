//! RPC Method Implementations
//!
//! Each method corresponds to a JSON-RPC call that external apps can make.

use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::chain::LedgerError;
use crate::crypto::{decode_address, Hash};
use crate::registry::{RegistryError, StarRegistry};
use crate::wallet::{Wallet, WalletError};

/// JSON-RPC 2.0 Request
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    pub params: Option<Value>,
    pub id: Value,
}

/// JSON-RPC 2.0 Response
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub result: Option<Value>,
    pub error: Option<JsonRpcError>,
    pub id: Value,
}

/// JSON-RPC Error
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn error(id: Value, code: i32, message: String) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(JsonRpcError { code, message }),
            id,
        }
    }
}

/// Error codes
pub mod codes {
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL: i32 = -32603;
    pub const CHAIN_CORRUPTION: i32 = -32000;
    pub const INVALID_ADDRESS: i32 = -1;
    pub const MALFORMED_MESSAGE: i32 = -2;
    pub const VERIFICATION_EXPIRED: i32 = -3;
    pub const INVALID_SIGNATURE: i32 = -4;
    pub const NOT_FOUND: i32 = -5;
    pub const WALLET_ERROR: i32 = -6;
}

/// RPC Handler State
pub struct RpcState {
    pub registry: Arc<StarRegistry>,
    /// Node-side keys, for clients that cannot sign themselves
    pub wallet: Mutex<Wallet>,
}

impl RpcState {
    /// `wallet_max_keys` bounds the keys `getnewaddress`/`importprivkey` may add
    pub fn new(registry: Arc<StarRegistry>, wallet_max_keys: usize) -> Self {
        Self {
            registry,
            wallet: Mutex::new(Wallet::with_limit(wallet_max_keys)),
        }
    }
}

/// Process a JSON-RPC request and return a response
pub async fn handle_request(state: &RpcState, request: JsonRpcRequest) -> JsonRpcResponse {
    let id = request.id;
    let params = positional(request.params);

    match request.method.as_str() {
        "getchainheight" => get_chain_height(state, id),
        "requestvalidation" => request_validation(state, id, &params),
        "submitstar" => submit_star(state, id, params).await,
        "getblockbyhash" => get_block_by_hash(state, id, &params),
        "getblockbyheight" => get_block_by_height(state, id, &params),
        "getblocks" => get_blocks(state, id, &params),
        "getstarsbyowner" => get_stars_by_owner(state, id, &params),
        "validatechain" => validate_chain(state, id),
        "getinfo" => get_info(state, id),
        "getnewaddress" => get_new_address(state, id),
        "importprivkey" => import_priv_key(state, id, &params),
        "listaddresses" => list_addresses(state, id),
        "validateaddress" => validate_address(id, &params),
        "signmessage" => sign_message(state, id, &params),
        _ => JsonRpcResponse::error(
            id,
            codes::METHOD_NOT_FOUND,
            format!("Method not found: {}", request.method),
        ),
    }
}

/// Normalize params to a positional list; a bare scalar is one argument.
fn positional(params: Option<Value>) -> Vec<Value> {
    match params {
        Some(Value::Array(arr)) => arr,
        Some(Value::Null) | None => Vec::new(),
        Some(other) => vec![other],
    }
}

fn str_param<'a>(params: &'a [Value], index: usize) -> Option<&'a str> {
    params.get(index).and_then(Value::as_str)
}

fn u64_param(params: &[Value], index: usize) -> Option<u64> {
    params.get(index).and_then(Value::as_u64)
}

fn invalid_params(id: Value, expected: &str) -> JsonRpcResponse {
    JsonRpcResponse::error(id, codes::INVALID_PARAMS, format!("Invalid params: expected {expected}"))
}

fn to_response<T: Serialize>(id: Value, value: &T) -> JsonRpcResponse {
    match serde_json::to_value(value) {
        Ok(v) => JsonRpcResponse::success(id, v),
        Err(e) => JsonRpcResponse::error(id, codes::INTERNAL, e.to_string()),
    }
}

fn registry_error(id: Value, err: RegistryError) -> JsonRpcResponse {
    let code = match &err {
        RegistryError::InvalidAddress => codes::INVALID_ADDRESS,
        RegistryError::MalformedMessage(_) => codes::MALFORMED_MESSAGE,
        RegistryError::VerificationExpired { .. } => codes::VERIFICATION_EXPIRED,
        RegistryError::InvalidSignature => codes::INVALID_SIGNATURE,
        RegistryError::Ledger(LedgerError::ChainCorruption { .. }) => codes::CHAIN_CORRUPTION,
        RegistryError::Ledger(LedgerError::Encoding(_) | LedgerError::Genesis(_)) => codes::INTERNAL,
    };
    JsonRpcResponse::error(id, code, err.to_string())
}

/// Returns the current chain height
fn get_chain_height(state: &RpcState, id: Value) -> JsonRpcResponse {
    JsonRpcResponse::success(id, json!(state.registry.get_chain_height()))
}

/// Issues a challenge message
/// Params: [address]
fn request_validation(state: &RpcState, id: Value, params: &[Value]) -> JsonRpcResponse {
    let address = str_param(params, 0).unwrap_or_default();
    match state.registry.request_challenge(address) {
        Ok(message) => JsonRpcResponse::success(id, json!(message)),
        Err(e) => registry_error(id, e),
    }
}

/// Verifies a signed challenge and registers the star
/// Params: [address, message, signature, star]
async fn submit_star(state: &RpcState, id: Value, mut params: Vec<Value>) -> JsonRpcResponse {
    if params.len() < 4 {
        return invalid_params(id, "[address, message, signature, star]");
    }
    let star = params.swap_remove(3);
    let (Some(address), Some(message), Some(signature)) = (
        str_param(&params, 0),
        str_param(&params, 1),
        str_param(&params, 2),
    ) else {
        return invalid_params(id, "[address, message, signature, star]");
    };

    match state
        .registry
        .submit_proof(address, message, signature, star)
        .await
    {
        Ok(block) => to_response(id, &block),
        Err(e) => registry_error(id, e),
    }
}

/// Returns a block by hash, or null
/// Params: [hash]
fn get_block_by_hash(state: &RpcState, id: Value, params: &[Value]) -> JsonRpcResponse {
    let Some(hash) = str_param(params, 0).and_then(|s| s.parse::<Hash>().ok()) else {
        return invalid_params(id, "[block hash hex]");
    };
    to_response(id, &state.registry.get_block_by_hash(&hash))
}

/// Returns a block by height, or null
/// Params: [height]
fn get_block_by_height(state: &RpcState, id: Value, params: &[Value]) -> JsonRpcResponse {
    let Some(height) = u64_param(params, 0) else {
        return invalid_params(id, "[height]");
    };
    to_response(id, &state.registry.get_block_by_height(height))
}

/// Returns blocks in an inclusive height range
/// Params: [start, (optional) end]
fn get_blocks(state: &RpcState, id: Value, params: &[Value]) -> JsonRpcResponse {
    let Some(start) = u64_param(params, 0) else {
        return invalid_params(id, "[start, (optional) end]");
    };
    let end = u64_param(params, 1).unwrap_or(u64::MAX);
    if end < start {
        return invalid_params(id, "start <= end");
    }
    to_response(id, &state.registry.get_blocks_range(start, end))
}

/// Returns every star registered by an address
/// Params: [address]
fn get_stars_by_owner(state: &RpcState, id: Value, params: &[Value]) -> JsonRpcResponse {
    let Some(address) = str_param(params, 0) else {
        return invalid_params(id, "[address]");
    };
    JsonRpcResponse::success(id, Value::Array(state.registry.get_stars_by_owner(address)))
}

/// Audits the whole chain
fn validate_chain(state: &RpcState, id: Value) -> JsonRpcResponse {
    let audit = state.registry.validate_chain();
    JsonRpcResponse::success(
        id,
        json!({
            "valid": audit.is_valid(),
            "blocks_checked": audit.blocks_checked,
            "faults": audit.faults.iter().map(|f| f.to_string()).collect::<Vec<_>>(),
        }),
    )
}

/// Returns general node information
fn get_info(state: &RpcState, id: Value) -> JsonRpcResponse {
    let height = state.registry.get_chain_height();
    let tip = state
        .registry
        .get_block_by_height(height)
        .and_then(|b| b.hash)
        .map(|h| h.to_hex());

    JsonRpcResponse::success(
        id,
        json!({
            "chain": "star-registry",
            "height": height,
            "tip": tip,
            "verification_window_secs": state.registry.window_secs(),
            "append_validation": state.registry.append_validation(),
            "version": env!("CARGO_PKG_VERSION"),
        }),
    )
}

fn wallet_error(id: Value, err: WalletError) -> JsonRpcResponse {
    let code = match &err {
        WalletError::UnknownAddress(_) => codes::NOT_FOUND,
        WalletError::InvalidPrivateKey => codes::INVALID_PARAMS,
        WalletError::Full(_) | WalletError::SigningError(_) => codes::WALLET_ERROR,
    };
    JsonRpcResponse::error(id, code, err.to_string())
}

/// Generates a node-held key
fn get_new_address(state: &RpcState, id: Value) -> JsonRpcResponse {
    let mut wallet = state.wallet.lock().unwrap_or_else(PoisonError::into_inner);
    match wallet.generate_key() {
        Ok(keypair) => JsonRpcResponse::success(
            id,
            json!({
                "address": keypair.address,
                "private_key": hex::encode(keypair.private_key_bytes()),
            }),
        ),
        Err(e) => wallet_error(id, e),
    }
}

/// Adds an existing key to the node wallet
/// Params: [private key hex]
fn import_priv_key(state: &RpcState, id: Value, params: &[Value]) -> JsonRpcResponse {
    let Some(bytes) = str_param(params, 0)
        .and_then(|s| hex::decode(s).ok())
        .and_then(|v| <[u8; 32]>::try_from(v).ok())
    else {
        return invalid_params(id, "[32-byte private key hex]");
    };

    let mut wallet = state.wallet.lock().unwrap_or_else(PoisonError::into_inner);
    match wallet.import_key(&bytes) {
        Ok(keypair) => JsonRpcResponse::success(id, json!(keypair.address)),
        Err(e) => wallet_error(id, e),
    }
}

/// Lists addresses held by the node wallet
fn list_addresses(state: &RpcState, id: Value) -> JsonRpcResponse {
    let wallet = state.wallet.lock().unwrap_or_else(PoisonError::into_inner);
    let mut addresses = wallet.get_addresses();
    addresses.sort_unstable();
    JsonRpcResponse::success(id, json!(addresses))
}

/// Checks an address's encoding and checksum
/// Params: [address]
fn validate_address(id: Value, params: &[Value]) -> JsonRpcResponse {
    let Some(address) = str_param(params, 0) else {
        return invalid_params(id, "[address]");
    };
    match decode_address(address) {
        Ok(key_hash) => JsonRpcResponse::success(
            id,
            json!({ "isvalid": true, "address": address, "key_hash": hex::encode(key_hash) }),
        ),
        Err(e) => JsonRpcResponse::success(id, json!({ "isvalid": false, "error": e.to_string() })),
    }
}

/// Signs a message with a node-held key
/// Params: [address, message]
fn sign_message(state: &RpcState, id: Value, params: &[Value]) -> JsonRpcResponse {
    let (Some(address), Some(message)) = (str_param(params, 0), str_param(params, 1)) else {
        return invalid_params(id, "[address, message]");
    };

    let wallet = state.wallet.lock().unwrap_or_else(PoisonError::into_inner);
    match wallet.sign_message(address, message) {
        Ok(signature) => JsonRpcResponse::success(id, json!(signature)),
        Err(e) => wallet_error(id, e),
    }
}
