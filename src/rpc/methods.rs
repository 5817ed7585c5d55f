//! RPC Method Implementations
//!
//! Each method corresponds to a JSON-RPC call that external apps can make.
//! Content mutations route through the store first, then feed the engine's
//! eligibility tracker.

use crate::content::ContentStore;
use crate::engine::RewardEngine;
use crate::ids::Id;
use crate::oracle::{FixedRatePriceFeed, PriceFeed};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

/// JSON-RPC 2.0 Request
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    pub params: Option<serde_json::Value>,
    pub id: serde_json::Value,
}

/// JSON-RPC 2.0 Response
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub result: Option<serde_json::Value>,
    pub error: Option<JsonRpcError>,
    pub id: serde_json::Value,
}

/// JSON-RPC Error
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
}

impl JsonRpcResponse {
    pub fn success(id: serde_json::Value, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn error(id: serde_json::Value, code: i32, message: String) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(JsonRpcError { code, message }),
            id,
        }
    }
}

/// RPC Handler State
pub struct RpcState {
    pub engine: Arc<Mutex<RewardEngine>>,
    pub store: Arc<Mutex<ContentStore>>,
    pub price_feed: FixedRatePriceFeed,
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Process a JSON-RPC request and return a response
pub fn handle_request(state: &RpcState, request: JsonRpcRequest) -> JsonRpcResponse {
    match request.method.as_str() {
        "getinfo" => get_info(state, request.id),
        "getbalance" => get_balance(state, request.id),
        "getusdbalance" => get_usd_balance(state, request.id),
        "checkupkeep" => check_upkeep(state, request.id),
        "performupkeep" => perform_upkeep(state, request.id),
        "getrecentwinners" => get_recent_winners(state, request.id),
        "geteligibleposts" => get_eligible_posts(state, request.id),
        "getrecentposts" => get_recent_posts(state, request.id),
        "registeruser" => register_user(state, request.id, request.params),
        "createpost" => create_post(state, request.id, request.params),
        "editpost" => edit_post(state, request.id, request.params),
        "deletepost" => delete_post(state, request.id, request.params),
        "upvote" => vote(state, request.id, request.params, true),
        "downvote" => vote(state, request.id, request.params, false),
        "getpost" => get_post(state, request.id, request.params),
        "getuserposts" => get_user_posts(state, request.id, request.params),
        _ => JsonRpcResponse::error(
            request.id,
            -32601,
            format!("Method not found: {}", request.method),
        ),
    }
}

/// Returns general engine information
// Lock order everywhere: store before engine
fn get_info(state: &RpcState, id: serde_json::Value) -> JsonRpcResponse {
    let store = state.store.lock().unwrap();
    let engine = state.engine.lock().unwrap();

    let info = serde_json::json!({
        "token": crate::constants::TOKEN_FULL_NAME,
        "users": store.user_count(),
        "posts": store.post_count(),
        "eligible_posts": engine.num_eligible(),
        "balance": engine.balance() as f64 / 100_000_000.0,
        "last_cycle_at": engine.last_cycle_at(),
        "window_started_at": engine.window_started_at(),
        "pending_request": engine.pending_request_id(),
        "next_cycle_id": engine.next_cycle_id(),
        "version": "0.1.0",
    });

    JsonRpcResponse::success(id, info)
}

/// Returns the reward pool balance in KRM
fn get_balance(state: &RpcState, id: serde_json::Value) -> JsonRpcResponse {
    let engine = state.engine.lock().unwrap();
    let balance_krm = engine.balance() as f64 / 100_000_000.0;
    JsonRpcResponse::success(id, serde_json::json!(balance_krm))
}

/// Returns the reward pool's USD value via the price feed
fn get_usd_balance(state: &RpcState, id: serde_json::Value) -> JsonRpcResponse {
    let engine = state.engine.lock().unwrap();
    let cents = state.price_feed.usd_value_of(engine.balance());
    JsonRpcResponse::success(id, serde_json::json!(cents as f64 / 100.0))
}

/// Read-only due-check
fn check_upkeep(state: &RpcState, id: serde_json::Value) -> JsonRpcResponse {
    let engine = state.engine.lock().unwrap();
    let check = engine.check_upkeep(unix_now());
    JsonRpcResponse::success(
        id,
        serde_json::json!({
            "upkeep_needed": check.due,
            "reason": check.reason,
        }),
    )
}

/// Commit a reward cycle by hand (operators; the trigger loop normally does this)
fn perform_upkeep(state: &RpcState, id: serde_json::Value) -> JsonRpcResponse {
    let mut engine = state.engine.lock().unwrap();
    match engine.perform_upkeep(unix_now()) {
        Ok(request_id) => {
            println!("🎲 Upkeep committed via RPC, randomness request {}", request_id);
            JsonRpcResponse::success(id, serde_json::json!({ "request_id": request_id }))
        }
        Err(e) => JsonRpcResponse::error(id, -10, e.to_string()),
    }
}

/// Returns the bounded winner history, oldest-first
fn get_recent_winners(state: &RpcState, id: serde_json::Value) -> JsonRpcResponse {
    let engine = state.engine.lock().unwrap();
    let winners: Vec<serde_json::Value> = engine
        .recent_winners()
        .iter()
        .map(|r| {
            serde_json::json!({
                "cycle_id": r.cycle_id,
                "winner": r.winner.to_hex(),
                "amount": r.amount as f64 / 100_000_000.0,
                "paid": r.paid,
                "failure_reason": r.failure_reason,
                "decided_at": r.decided_at,
            })
        })
        .collect();
    JsonRpcResponse::success(id, serde_json::json!(winners))
}

/// Ids of posts whose authors are candidates this window
fn get_eligible_posts(state: &RpcState, id: serde_json::Value) -> JsonRpcResponse {
    let engine = state.engine.lock().unwrap();
    JsonRpcResponse::success(id, serde_json::json!(engine.eligible_post_ids()))
}

/// Ids of posts created inside the active window
fn get_recent_posts(state: &RpcState, id: serde_json::Value) -> JsonRpcResponse {
    let store = state.store.lock().unwrap();
    let engine = state.engine.lock().unwrap();
    let ids = store.recent_post_ids(engine.window_started_at());
    JsonRpcResponse::success(id, serde_json::json!(ids))
}

/// Register a user
/// Params: [name, bio]
fn register_user(
    state: &RpcState,
    id: serde_json::Value,
    params: Option<serde_json::Value>,
) -> JsonRpcResponse {
    let (name, bio) = match params {
        Some(serde_json::Value::Array(arr)) if !arr.is_empty() => {
            let name = arr[0].as_str().unwrap_or("").to_string();
            let bio = arr.get(1).and_then(|v| v.as_str()).unwrap_or("").to_string();
            (name, bio)
        }
        _ => return JsonRpcResponse::error(id, -32602, "Invalid params: [name, bio]".into()),
    };

    if name.is_empty() {
        return JsonRpcResponse::error(id, -1, "Name must not be empty".into());
    }

    let mut store = state.store.lock().unwrap();
    match store.register_user(&name, &bio, unix_now()) {
        Ok(user) => {
            let (author, address) = (user.id, user.payout_address.clone());
            println!("👤 Registered user {} ({})", name, address);

            let mut engine = state.engine.lock().unwrap();
            engine.register_payout_address(author, address.clone());

            JsonRpcResponse::success(
                id,
                serde_json::json!({
                    "author_id": author.to_hex(),
                    "payout_address": address,
                }),
            )
        }
        Err(e) => JsonRpcResponse::error(id, -1, e.to_string()),
    }
}

/// Create a post
/// Params: [author_id_hex, content, (optional) image_hash]
fn create_post(
    state: &RpcState,
    id: serde_json::Value,
    params: Option<serde_json::Value>,
) -> JsonRpcResponse {
    let (author_hex, content, image_hash) = match params {
        Some(serde_json::Value::Array(arr)) if arr.len() >= 2 => {
            let author = arr[0].as_str().unwrap_or("").to_string();
            let content = arr[1].as_str().unwrap_or("").to_string();
            let image = arr.get(2).and_then(|v| v.as_str()).map(|s| s.to_string());
            (author, content, image)
        }
        _ => {
            return JsonRpcResponse::error(
                id,
                -32602,
                "Invalid params: [author_id, content, (optional) image_hash]".into(),
            )
        }
    };

    let author = match Id::from_hex(&author_hex) {
        Ok(a) => a,
        Err(_) => return JsonRpcResponse::error(id, -5, "Invalid author id".into()),
    };

    let mut store = state.store.lock().unwrap();
    match store.create_post(author, content, image_hash, unix_now()) {
        Ok(post) => JsonRpcResponse::success(id, serde_json::json!(post.id)),
        Err(e) => JsonRpcResponse::error(id, -1, e.to_string()),
    }
}

/// Edit a post; only the owner may edit
/// Params: [author_id_hex, post_id, content, (optional) image_hash]
fn edit_post(
    state: &RpcState,
    id: serde_json::Value,
    params: Option<serde_json::Value>,
) -> JsonRpcResponse {
    let (author_hex, post_id, content, image_hash) = match params {
        Some(serde_json::Value::Array(arr)) if arr.len() >= 3 => {
            let author = arr[0].as_str().unwrap_or("").to_string();
            let post_id = arr[1].as_u64().unwrap_or(0);
            let content = arr[2].as_str().unwrap_or("").to_string();
            let image = arr.get(3).and_then(|v| v.as_str()).map(|s| s.to_string());
            (author, post_id, content, image)
        }
        _ => {
            return JsonRpcResponse::error(
                id,
                -32602,
                "Invalid params: [author_id, post_id, content, (optional) image_hash]".into(),
            )
        }
    };

    let author = match Id::from_hex(&author_hex) {
        Ok(a) => a,
        Err(_) => return JsonRpcResponse::error(id, -5, "Invalid author id".into()),
    };

    let mut store = state.store.lock().unwrap();
    match store.edit_post(&author, post_id, content, image_hash) {
        Ok(()) => JsonRpcResponse::success(id, serde_json::json!(true)),
        Err(e) => JsonRpcResponse::error(id, -1, e.to_string()),
    }
}

/// Delete a post; only the owner may delete
/// Params: [author_id_hex, post_id]
fn delete_post(
    state: &RpcState,
    id: serde_json::Value,
    params: Option<serde_json::Value>,
) -> JsonRpcResponse {
    let (author_hex, post_id) = match params {
        Some(serde_json::Value::Array(arr)) if arr.len() >= 2 => {
            let author = arr[0].as_str().unwrap_or("").to_string();
            let post_id = arr[1].as_u64().unwrap_or(0);
            (author, post_id)
        }
        _ => {
            return JsonRpcResponse::error(id, -32602, "Invalid params: [author_id, post_id]".into())
        }
    };

    let author = match Id::from_hex(&author_hex) {
        Ok(a) => a,
        Err(_) => return JsonRpcResponse::error(id, -5, "Invalid author id".into()),
    };

    let mut store = state.store.lock().unwrap();
    match store.delete_post(&author, post_id) {
        Ok(()) => JsonRpcResponse::success(id, serde_json::json!(true)),
        Err(e) => JsonRpcResponse::error(id, -1, e.to_string()),
    }
}

/// Vote on a post
/// Params: [voter_id_hex, post_id]
fn vote(
    state: &RpcState,
    id: serde_json::Value,
    params: Option<serde_json::Value>,
    up: bool,
) -> JsonRpcResponse {
    let (voter_hex, post_id) = match params {
        Some(serde_json::Value::Array(arr)) if arr.len() >= 2 => {
            let voter = arr[0].as_str().unwrap_or("").to_string();
            let post_id = arr[1].as_u64().unwrap_or(0);
            (voter, post_id)
        }
        _ => {
            return JsonRpcResponse::error(id, -32602, "Invalid params: [voter_id, post_id]".into())
        }
    };

    let voter = match Id::from_hex(&voter_hex) {
        Ok(v) => v,
        Err(_) => return JsonRpcResponse::error(id, -5, "Invalid voter id".into()),
    };

    let mut store = state.store.lock().unwrap();
    let result = if up {
        store.upvote(voter, post_id)
    } else {
        store.downvote(voter, post_id)
    };

    match result {
        Ok(post) => {
            let engagement = post.engagement();
            let mut engine = state.engine.lock().unwrap();
            engine.note_engagement(post);
            let eligible = engine.is_post_eligible(post_id);

            JsonRpcResponse::success(
                id,
                serde_json::json!({
                    "post_id": post_id,
                    "engagement": engagement,
                    "eligible": eligible,
                }),
            )
        }
        Err(e) => JsonRpcResponse::error(id, -1, e.to_string()),
    }
}

/// Returns full post data by id
/// Params: [post_id]
fn get_post(
    state: &RpcState,
    id: serde_json::Value,
    params: Option<serde_json::Value>,
) -> JsonRpcResponse {
    let post_id = match params {
        Some(serde_json::Value::Array(arr)) if !arr.is_empty() => arr[0].as_u64().unwrap_or(0),
        Some(serde_json::Value::Number(n)) => n.as_u64().unwrap_or(0),
        _ => return JsonRpcResponse::error(id, -32602, "Invalid params: expected post id".into()),
    };

    let store = state.store.lock().unwrap();
    match store.get_post(post_id) {
        Some(post) => {
            let engine = state.engine.lock().unwrap();
            let upvoters: Vec<String> = post.upvoters().map(|v| v.to_hex()).collect();
            let downvoters: Vec<String> = post.downvoters().map(|v| v.to_hex()).collect();
            let info = serde_json::json!({
                "id": post.id,
                "author": post.author.to_hex(),
                "content": post.content,
                "image_hash": post.image_hash,
                "created_at": post.created_at,
                "upvotes": post.upvote_count(),
                "downvotes": post.downvote_count(),
                "upvoters": upvoters,
                "downvoters": downvoters,
                "engagement": post.engagement(),
                "eligible": engine.is_post_eligible(post.id),
            });
            JsonRpcResponse::success(id, info)
        }
        None => JsonRpcResponse::error(id, -5, "Post not found".into()),
    }
}

/// Ids of all posts by an author
/// Params: [author_id_hex]
fn get_user_posts(
    state: &RpcState,
    id: serde_json::Value,
    params: Option<serde_json::Value>,
) -> JsonRpcResponse {
    let author_hex = match params {
        Some(serde_json::Value::Array(arr)) if !arr.is_empty() => {
            arr[0].as_str().unwrap_or("").to_string()
        }
        Some(serde_json::Value::String(s)) => s,
        _ => return JsonRpcResponse::error(id, -32602, "Invalid params: expected author id".into()),
    };

    let author = match Id::from_hex(&author_hex) {
        Ok(a) => a,
        Err(_) => return JsonRpcResponse::error(id, -5, "Invalid author id".into()),
    };

    let store = state.store.lock().unwrap();
    JsonRpcResponse::success(id, serde_json::json!(store.get_user_posts(&author)))
}
