//! Wallet authentication endpoint.

use crate::auth::middleware::AppState;
use crate::auth::verify::verify_wallet_signature;
use crate::error::AppError;
use crate::models::{
    NewUser, SignatureScheme, User, UserUpdate, UserView, WalletAuthRequest, WalletAuthResponse,
    WalletProvider,
};
use crate::storage::StoreError;
use axum::{extract::State, response::IntoResponse, Json};
use rand::Rng;

/// POST /api/auth/wallet — Verify a wallet signature and issue a credential
pub async fn wallet_login(
    State(state): State<AppState>,
    Json(req): Json<WalletAuthRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (Some(wallet_address), Some(signature), Some(message)) =
        (req.wallet_address, req.signature, req.message)
    else {
        return Err(AppError::MissingFields(
            "Wallet address, signature, and message are required".to_string(),
        ));
    };
    if wallet_address.is_empty() || signature.is_empty() || message.is_empty() {
        return Err(AppError::MissingFields(
            "Wallet address, signature, and message are required".to_string(),
        ));
    }

    // Resolve the signature scheme once at the boundary. Unknown provider
    // strings fall through to the ECDSA branch like any Ethereum wallet.
    let provider = req
        .wallet_type
        .as_deref()
        .and_then(|s| s.parse::<WalletProvider>().ok());
    let scheme = match provider {
        Some(WalletProvider::Phantom) => SignatureScheme::Ed25519,
        _ => SignatureScheme::EcdsaRecover,
    };

    let valid = verify_wallet_signature(
        scheme,
        &wallet_address,
        &message,
        &signature,
        !state.config.production,
    );
    if !valid {
        tracing::warn!(action = "auth_failed", wallet_address = %wallet_address, "Invalid signature");
        return Err(AppError::InvalidSignature);
    }

    let user = match state.store.get_by_wallet_address(&wallet_address).await? {
        Some(user) => {
            // Last-writer-wins on the provider tag: only the wallet holder
            // can produce a valid signature, so no conflict detection needed
            if provider.is_some() && user.wallet_type != provider {
                state
                    .store
                    .update(
                        user.id,
                        UserUpdate {
                            wallet_type: provider,
                            ..Default::default()
                        },
                    )
                    .await?
                    .ok_or_else(|| {
                        AppError::Internal(format!("User {} vanished during login", user.id))
                    })?
            } else {
                user
            }
        }
        None => create_wallet_user(&state, &wallet_address, provider).await?,
    };

    let token = state
        .token_keys
        .mint(
            user.id,
            user.wallet_address.as_deref(),
            state.config.token_ttl_secs,
        )
        .map_err(|e| AppError::Internal(format!("Token signing failed: {}", e)))?;

    tracing::info!(
        action = "auth_success",
        user_id = user.id,
        username = %user.username,
        "Wallet authenticated"
    );

    Ok(Json(WalletAuthResponse {
        token,
        user: UserView::from(&user),
    }))
}

/// Create a user for a first-time wallet, retrying generated usernames on
/// collision. The store's create is insert-if-absent on the wallet address,
/// so a concurrent first login resolves to whichever record won.
async fn create_wallet_user(
    state: &AppState,
    wallet_address: &str,
    wallet_type: Option<WalletProvider>,
) -> Result<User, AppError> {
    const MAX_ATTEMPTS: usize = 8;

    for attempt in 0..MAX_ATTEMPTS {
        let username = if attempt < 4 {
            format!("user_{:04}", rand::rng().random_range(0..10_000u32))
        } else {
            // Repeated collisions: widen the namespace
            format!("user_{}", nanoid::nanoid!(8))
        };

        match state
            .store
            .create(NewUser {
                username,
                wallet_address: Some(wallet_address.to_string()),
                wallet_type,
                avatar_url: None,
            })
            .await
        {
            Ok(user) => {
                tracing::info!(
                    action = "user_created",
                    user_id = user.id,
                    username = %user.username,
                    "New user from wallet login"
                );
                return Ok(user);
            }
            Err(StoreError::UsernameTaken(_)) => continue,
            Err(e) => return Err(e.into()),
        }
    }

    Err(AppError::Internal(
        "Could not generate a unique username".to_string(),
    ))
}
