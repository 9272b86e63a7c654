//! User profile endpoints.

use crate::auth::middleware::{AppState, AuthUser, WalletUser};
use crate::error::AppError;
use crate::models::{UserUpdate, UserView, WalletInfo};
use crate::storage::StoreError;
use axum::{extract::State, response::IntoResponse, Json};
use serde::Deserialize;

/// GET /api/user/profile — Current user's public view
pub async fn get_profile(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    // Re-read from the store so the view reflects updates made after the
    // credential was minted
    let user = state
        .store
        .get_by_id(user.id)
        .await?
        .ok_or_else(|| AppError::Forbidden("User not found".to_string()))?;

    Ok(Json(UserView::from(&user)))
}

/// Fields a user may change about themselves.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub avatar_url: Option<String>,
}

/// PATCH /api/user/profile — Update username and/or avatar
pub async fn update_profile(
    user: AuthUser,
    State(state): State<AppState>,
    Json(req): Json<ProfileUpdate>,
) -> Result<impl IntoResponse, AppError> {
    if let Some(username) = &req.username {
        if username.len() < 2 || username.len() > 64 {
            return Err(AppError::BadRequest(
                "Username must be 2-64 characters".to_string(),
            ));
        }
        if !username
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
        {
            return Err(AppError::BadRequest(
                "Username may only contain alphanumeric characters, hyphens, and underscores"
                    .to_string(),
            ));
        }
    }

    let updated = state
        .store
        .update(
            user.id,
            UserUpdate {
                username: req.username,
                wallet_type: None,
                avatar_url: req.avatar_url,
            },
        )
        .await
        .map_err(|e| match e {
            StoreError::UsernameTaken(name) => {
                AppError::BadRequest(format!("Username '{}' is already taken", name))
            }
            other => other.into(),
        })?
        .ok_or_else(|| AppError::Forbidden("User not found".to_string()))?;

    tracing::info!(action = "profile_updated", user_id = updated.id, "Profile updated");

    Ok(Json(UserView::from(&updated)))
}

/// GET /api/user/wallet — Wallet details, requires a bound wallet
pub async fn get_wallet(user: WalletUser) -> Result<impl IntoResponse, AppError> {
    Ok(Json(WalletInfo {
        wallet_address: user.wallet_address,
        wallet_type: user.user.wallet_type,
    }))
}
