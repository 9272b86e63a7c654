//! Integration tests for the nebula-cdn API.
//!
//! Each test spins up a real server on an ephemeral port backed by an
//! in-memory user store and drives it over HTTP with reqwest.

use ed25519_dalek::{Signer, SigningKey};
use k256::ecdsa::SigningKey as EcdsaSigningKey;
use nebula_cdn::{
    auth::middleware::AppState,
    auth::token::unix_now,
    config::Config,
    middleware::security_headers,
    models::{NewUser, WalletProvider},
    routes,
    storage::{MemUserStore, UserStore},
};
use sha3::{Digest, Keccak256};
use std::sync::Arc;

const TEST_SECRET: &str = "integration-test-secret";
const TTL: u64 = 86_400;

fn test_config(production: bool, skip_auth: bool) -> Config {
    Config {
        jwt_secret: TEST_SECRET.to_string(),
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        production,
        skip_auth,
        token_ttl_secs: TTL,
    }
}

/// Spin up a test server and return its base URL, the store, and the state.
async fn spawn_server(config: Config) -> (String, Arc<MemUserStore>, AppState) {
    let store = Arc::new(MemUserStore::new());
    let state = AppState::new(Arc::clone(&store) as Arc<dyn UserStore>, config);

    let app = routes::api_router()
        .layer(axum::middleware::from_fn(security_headers))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), store, state)
}

async fn spawn_default_server() -> (String, Arc<MemUserStore>, AppState) {
    spawn_server(test_config(false, false)).await
}

// ============================================================================
// Signing helpers
// ============================================================================

/// Generate an Ed25519 wallet: base58 address is the public key.
fn ed25519_wallet() -> (SigningKey, String) {
    let mut seed = [0u8; 32];
    rand::fill(&mut seed);
    let signing_key = SigningKey::from_bytes(&seed);
    let address = bs58::encode(signing_key.verifying_key().as_bytes()).into_string();
    (signing_key, address)
}

fn ed25519_sign(key: &SigningKey, message: &str) -> String {
    bs58::encode(key.sign(message.as_bytes()).to_bytes()).into_string()
}

/// Generate a secp256k1 wallet and its 0x-prefixed Ethereum address.
fn ecdsa_wallet() -> (EcdsaSigningKey, String) {
    let signing_key = loop {
        let mut seed = [0u8; 32];
        rand::fill(&mut seed);
        if let Ok(key) = EcdsaSigningKey::from_slice(&seed) {
            break key;
        }
    };

    use k256::elliptic_curve::sec1::ToEncodedPoint;
    let point = signing_key.verifying_key().to_encoded_point(false);
    let digest = Keccak256::digest(&point.as_bytes()[1..]);
    let address = format!("0x{}", hex::encode(&digest[12..]));

    (signing_key, address)
}

/// EIP-191 personal-sign: 65-byte (r, s, v) signature, hex with 0x prefix.
fn ecdsa_personal_sign(key: &EcdsaSigningKey, message: &str) -> String {
    let mut hasher = Keccak256::new();
    hasher.update(format!("\x19Ethereum Signed Message:\n{}", message.len()));
    hasher.update(message.as_bytes());
    let digest: [u8; 32] = hasher.finalize().into();

    let (sig, recovery_id) = key.sign_prehash_recoverable(&digest).unwrap();
    let mut bytes = sig.to_bytes().to_vec();
    bytes.push(recovery_id.to_byte() + 27);
    format!("0x{}", hex::encode(bytes))
}

async fn login(
    client: &reqwest::Client,
    base_url: &str,
    wallet_address: &str,
    signature: &str,
    message: &str,
    wallet_type: &str,
) -> reqwest::Response {
    client
        .post(format!("{}/api/auth/wallet", base_url))
        .json(&serde_json::json!({
            "walletAddress": wallet_address,
            "signature": signature,
            "message": message,
            "walletType": wallet_type
        }))
        .send()
        .await
        .expect("Failed to send request")
}

// ============================================================================
// Wallet Login Tests
// ============================================================================

#[tokio::test]
async fn test_ed25519_login_end_to_end() {
    let (base_url, _store, _state) = spawn_default_server().await;
    let client = reqwest::Client::new();

    let (key, address) = ed25519_wallet();
    let signature = ed25519_sign(&key, "login-nonce-1");

    let resp = login(
        &client,
        &base_url,
        &address,
        &signature,
        "login-nonce-1",
        "phantom",
    )
    .await;
    assert_eq!(resp.status(), 200);

    let body: serde_json::Value = resp.json().await.unwrap();
    let token = body["token"].as_str().unwrap().to_string();
    assert!(!token.is_empty());
    assert_eq!(body["user"]["walletAddress"].as_str().unwrap(), address);
    assert_eq!(body["user"]["walletType"].as_str().unwrap(), "phantom");
    assert!(body["user"]["username"].as_str().unwrap().starts_with("user_"));

    // The issued credential authenticates a protected route, and the request
    // context carries the wallet address
    let resp = client
        .get(format!("{}/api/user/profile", base_url))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let profile: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(profile["walletAddress"].as_str().unwrap(), address);
}

#[tokio::test]
async fn test_ecdsa_login_end_to_end() {
    let (base_url, _store, _state) = spawn_default_server().await;
    let client = reqwest::Client::new();

    let (key, address) = ecdsa_wallet();
    let signature = ecdsa_personal_sign(&key, "login-nonce-2");

    let resp = login(
        &client,
        &base_url,
        &address,
        &signature,
        "login-nonce-2",
        "metamask",
    )
    .await;
    assert_eq!(resp.status(), 200);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["user"]["walletType"].as_str().unwrap(), "metamask");

    let token = body["token"].as_str().unwrap();
    let resp = client
        .get(format!("{}/api/user/profile", base_url))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn test_unknown_wallet_type_uses_ecdsa_branch() {
    let (base_url, _store, _state) = spawn_default_server().await;
    let client = reqwest::Client::new();

    let (key, address) = ecdsa_wallet();
    let signature = ecdsa_personal_sign(&key, "hello");

    let resp = login(&client, &base_url, &address, &signature, "hello", "ledger").await;
    assert_eq!(resp.status(), 200);

    // Unrecognized provider string is not stored
    let body: serde_json::Value = resp.json().await.unwrap();
    assert!(body["user"]["walletType"].is_null());
}

#[tokio::test]
async fn test_missing_fields() {
    let (base_url, _store, _state) = spawn_default_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/api/auth/wallet", base_url))
        .json(&serde_json::json!({"walletAddress": "abc"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"].as_str().unwrap(), "missing_fields");

    // Present but empty counts as missing too
    let resp = login(&client, &base_url, "abc", "", "msg", "phantom").await;
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_invalid_signature() {
    let (base_url, _store, _state) = spawn_default_server().await;
    let client = reqwest::Client::new();

    let (_, address) = ed25519_wallet();
    let garbage = bs58::encode([0u8; 64]).into_string();

    let resp = login(&client, &base_url, &address, &garbage, "msg", "phantom").await;
    assert_eq!(resp.status(), 401);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"].as_str().unwrap(), "invalid_signature");
}

#[tokio::test]
async fn test_repeat_login_reuses_user_and_updates_provider() {
    let (base_url, _store, _state) = spawn_default_server().await;
    let client = reqwest::Client::new();

    let (key, address) = ecdsa_wallet();
    let signature = ecdsa_personal_sign(&key, "again");

    let resp = login(&client, &base_url, &address, &signature, "again", "metamask").await;
    let first: serde_json::Value = resp.json().await.unwrap();

    // Same wallet from a different provider: same user, tag updated
    let resp = login(&client, &base_url, &address, &signature, "again", "brave").await;
    let second: serde_json::Value = resp.json().await.unwrap();

    assert_eq!(first["user"]["id"], second["user"]["id"]);
    assert_eq!(second["user"]["walletType"].as_str().unwrap(), "brave");
}

#[tokio::test]
async fn test_concurrent_first_logins_create_one_user() {
    let (base_url, _store, _state) = spawn_default_server().await;

    let (key, address) = ed25519_wallet();
    let signature = ed25519_sign(&key, "race");

    let mut handles = Vec::new();
    for _ in 0..8 {
        let base_url = base_url.clone();
        let address = address.clone();
        let signature = signature.clone();
        handles.push(tokio::spawn(async move {
            let client = reqwest::Client::new();
            let resp = login(&client, &base_url, &address, &signature, "race", "phantom").await;
            assert_eq!(resp.status(), 200);
            let body: serde_json::Value = resp.json().await.unwrap();
            body["user"]["id"].as_i64().unwrap()
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap());
    }
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 1, "exactly one user record per wallet address");
}

// ============================================================================
// Simulated Signature Seam
// ============================================================================

#[tokio::test]
async fn test_simulated_signature_accepted_outside_production() {
    let (base_url, _store, _state) = spawn_default_server().await;
    let client = reqwest::Client::new();

    let resp = login(
        &client,
        &base_url,
        "0xdeadbeef00000000000000000000000000000000",
        "simulated_signature",
        "msg",
        "metamask",
    )
    .await;
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn test_simulated_signature_rejected_in_production() {
    let (base_url, _store, _state) = spawn_server(test_config(true, false)).await;
    let client = reqwest::Client::new();

    let resp = login(
        &client,
        &base_url,
        "0xdeadbeef00000000000000000000000000000000",
        "simulated_signature",
        "msg",
        "metamask",
    )
    .await;
    assert_eq!(resp.status(), 401);
}

// ============================================================================
// Request Authorization Tests
// ============================================================================

#[tokio::test]
async fn test_protected_route_without_token_is_401() {
    let (base_url, _store, _state) = spawn_default_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{}/api/user/profile", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"].as_str().unwrap(), "unauthenticated");
}

#[tokio::test]
async fn test_tampered_token_is_403() {
    let (base_url, _store, state) = spawn_default_server().await;
    let client = reqwest::Client::new();

    let token = state.token_keys.mint(1, None, TTL).unwrap();
    let tampered = format!("{}x", &token[..token.len() - 1]);

    let resp = client
        .get(format!("{}/api/user/profile", base_url))
        .header("Authorization", format!("Bearer {}", tampered))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"].as_str().unwrap(), "forbidden");
}

#[tokio::test]
async fn test_token_expiry_boundary() {
    let (base_url, store, state) = spawn_default_server().await;
    let client = reqwest::Client::new();

    let user = store
        .create(NewUser {
            username: "boundary".to_string(),
            wallet_address: Some("0xboundary".to_string()),
            wallet_type: Some(WalletProvider::Metamask),
            avatar_url: None,
        })
        .await
        .unwrap();

    // Just inside the 24h window: accepted
    let iat = unix_now() - (TTL as usize - 120);
    let fresh = state
        .token_keys
        .mint_at(user.id, Some("0xboundary"), TTL, iat)
        .unwrap();
    let resp = client
        .get(format!("{}/api/user/profile", base_url))
        .header("Authorization", format!("Bearer {}", fresh))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    // Just past the window: rejected with 403, not 401
    let iat = unix_now() - (TTL as usize + 60);
    let stale = state
        .token_keys
        .mint_at(user.id, Some("0xboundary"), TTL, iat)
        .unwrap();
    let resp = client
        .get(format!("{}/api/user/profile", base_url))
        .header("Authorization", format!("Bearer {}", stale))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
}

#[tokio::test]
async fn test_token_for_vanished_user_is_403() {
    let (base_url, _store, state) = spawn_default_server().await;
    let client = reqwest::Client::new();

    let token = state.token_keys.mint(999, None, TTL).unwrap();
    let resp = client
        .get(format!("{}/api/user/profile", base_url))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
}

#[tokio::test]
async fn test_skip_auth_substitutes_development_identity() {
    let (base_url, store, _state) = spawn_server(test_config(false, true)).await;
    let client = reqwest::Client::new();

    // Seed user 1 the way main does so the development identity resolves
    store
        .create(NewUser {
            username: "demo".to_string(),
            wallet_address: Some("0x1234567890abcdef1234567890abcdef12345678".to_string()),
            wallet_type: Some(WalletProvider::Metamask),
            avatar_url: None,
        })
        .await
        .unwrap();

    let resp = client
        .get(format!("{}/api/user/profile", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["username"].as_str().unwrap(), "demo");
}

#[tokio::test]
async fn test_wallet_guard() {
    let (base_url, store, state) = spawn_default_server().await;
    let client = reqwest::Client::new();

    let no_wallet = store
        .create(NewUser {
            username: "nowallet".to_string(),
            wallet_address: None,
            wallet_type: None,
            avatar_url: None,
        })
        .await
        .unwrap();
    let token = state.token_keys.mint(no_wallet.id, None, TTL).unwrap();

    // Valid credential: profile is reachable
    let resp = client
        .get(format!("{}/api/user/profile", base_url))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    // Wallet-gated endpoint rejects the same credential
    let resp = client
        .get(format!("{}/api/user/wallet", base_url))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
}

#[tokio::test]
async fn test_wallet_endpoint_returns_wallet_info() {
    let (base_url, _store, _state) = spawn_default_server().await;
    let client = reqwest::Client::new();

    let (key, address) = ed25519_wallet();
    let signature = ed25519_sign(&key, "wallet-info");
    let resp = login(&client, &base_url, &address, &signature, "wallet-info", "phantom").await;
    let body: serde_json::Value = resp.json().await.unwrap();
    let token = body["token"].as_str().unwrap();

    let resp = client
        .get(format!("{}/api/user/wallet", base_url))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["walletAddress"].as_str().unwrap(), address);
    assert_eq!(body["walletType"].as_str().unwrap(), "phantom");
}

// ============================================================================
// Profile Tests
// ============================================================================

#[tokio::test]
async fn test_update_profile() {
    let (base_url, _store, _state) = spawn_default_server().await;
    let client = reqwest::Client::new();

    let (key, address) = ed25519_wallet();
    let signature = ed25519_sign(&key, "patch-me");
    let resp = login(&client, &base_url, &address, &signature, "patch-me", "phantom").await;
    let body: serde_json::Value = resp.json().await.unwrap();
    let token = body["token"].as_str().unwrap().to_string();

    let resp = client
        .patch(format!("{}/api/user/profile", base_url))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({"username": "renamed", "avatarUrl": "https://cdn/avatar.png"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["username"].as_str().unwrap(), "renamed");
    assert_eq!(body["avatarUrl"].as_str().unwrap(), "https://cdn/avatar.png");

    // Invalid username shape is a 400
    let resp = client
        .patch(format!("{}/api/user/profile", base_url))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({"username": "x"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_update_profile_username_conflict() {
    let (base_url, store, state) = spawn_default_server().await;
    let client = reqwest::Client::new();

    store
        .create(NewUser {
            username: "taken".to_string(),
            wallet_address: None,
            wallet_type: None,
            avatar_url: None,
        })
        .await
        .unwrap();
    let victim = store
        .create(NewUser {
            username: "victim".to_string(),
            wallet_address: None,
            wallet_type: None,
            avatar_url: None,
        })
        .await
        .unwrap();
    let token = state.token_keys.mint(victim.id, None, TTL).unwrap();

    let resp = client
        .patch(format!("{}/api/user/profile", base_url))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({"username": "taken"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"].as_str().unwrap(), "bad_request");
}

// ============================================================================
// Security Header Tests
// ============================================================================

#[tokio::test]
async fn test_security_headers_on_api() {
    let (base_url, _store, _state) = spawn_default_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{}/api/user/profile", base_url))
        .send()
        .await
        .unwrap();

    let headers = resp.headers();
    assert_eq!(headers.get("cache-control").unwrap(), "no-store");
    assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
    assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
}
