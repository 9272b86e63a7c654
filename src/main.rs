//! Nebula CDN auth service entry point.
//!
//! Bootstraps the server:
//! 1. Load configuration from environment
//! 2. Build the in-memory user store (with a sample user outside production)
//! 3. Build router with API routes
//! 4. Apply security headers middleware
//! 5. Start Axum server
//!
//! Also supports a `keygen` subcommand for generating dev wallet keypairs.

use nebula_cdn::{
    auth::middleware::AppState,
    config::Config,
    middleware::security_headers,
    models::{NewUser, WalletProvider},
    routes,
    storage::{MemUserStore, UserStore},
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Generate an Ed25519 wallet keypair for exercising the login flow locally.
fn keygen() {
    use ed25519_dalek::SigningKey;

    let mut seed = [0u8; 32];
    rand::fill(&mut seed);
    let signing_key = SigningKey::from_bytes(&seed);

    println!(
        "address: {}",
        bs58::encode(signing_key.verifying_key().as_bytes()).into_string()
    );
    println!("seed:    {}", hex::encode(seed));
}

fn print_keygen_usage() {
    eprintln!("Usage: nebula-cdn keygen");
    eprintln!();
    eprintln!("Generate a random Ed25519 wallet keypair (base58 address + hex seed)");
    eprintln!("for signing test login messages against /api/auth/wallet.");
}

#[tokio::main]
async fn main() {
    // Check for keygen subcommand
    let args: Vec<String> = std::env::args().collect();
    if args.len() >= 2 && args[1] == "keygen" {
        if args.len() != 2 {
            print_keygen_usage();
            std::process::exit(1);
        }
        keygen();
        return;
    }

    // Initialize tracing with env filter support (RUST_LOG)
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load config from environment
    let config = Config::from_env().expect("Failed to load config");
    tracing::info!("Starting nebula-cdn on {}", config.bind_addr);

    let store: Arc<dyn UserStore> = Arc::new(MemUserStore::new());

    // Seed the sample user outside production so the development identity
    // and the store agree on user 1
    if !config.production {
        store
            .create(NewUser {
                username: "demo".to_string(),
                wallet_address: Some(
                    "0x1234567890abcdef1234567890abcdef12345678".to_string(),
                ),
                wallet_type: Some(WalletProvider::Metamask),
                avatar_url: None,
            })
            .await
            .expect("Failed to seed sample user");
        tracing::info!("Sample user 'demo' seeded");
    }

    let bind_addr = config.bind_addr;
    let state = AppState::new(store, config);

    // Explicit CORS: deny all cross-origin requests (single-origin deployment).
    // CorsLayer::new() with no allowed origins rejects all CORS preflight requests.
    let cors = CorsLayer::new();

    let app = routes::api_router()
        .layer(cors)
        .layer(axum::middleware::from_fn(security_headers))
        .with_state(state);

    // Bind to configured address
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .expect("Failed to bind");
    tracing::info!("Listening on {}", bind_addr);

    axum::serve(listener, app).await.expect("Server error");
}
