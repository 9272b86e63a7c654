//! Request/response and storage models for the API.
//!
//! Wire formats use camelCase JSON to match the original Nebula client.

use serde::{Deserialize, Serialize};

// ============================================================================
// Wallet Providers & Signature Schemes
// ============================================================================

/// Wallet families the platform accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletProvider {
    Phantom,
    Metamask,
    Brave,
}

/// Signature scheme per wallet family, resolved once at the request boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureScheme {
    /// Base58-encoded Ed25519 keys and signatures (Phantom).
    Ed25519,
    /// EIP-191 personal-sign recovery over secp256k1 (MetaMask, Brave).
    EcdsaRecover,
}

impl WalletProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            WalletProvider::Phantom => "phantom",
            WalletProvider::Metamask => "metamask",
            WalletProvider::Brave => "brave",
        }
    }

    pub fn scheme(&self) -> SignatureScheme {
        match self {
            WalletProvider::Phantom => SignatureScheme::Ed25519,
            WalletProvider::Metamask | WalletProvider::Brave => SignatureScheme::EcdsaRecover,
        }
    }
}

impl std::fmt::Display for WalletProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for WalletProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "phantom" => Ok(WalletProvider::Phantom),
            "metamask" => Ok(WalletProvider::Metamask),
            "brave" => Ok(WalletProvider::Brave),
            _ => Err(format!("Invalid wallet provider: {}", s)),
        }
    }
}

// ============================================================================
// Auth Models
// ============================================================================

/// Request to authenticate with a signed wallet message.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletAuthRequest {
    #[serde(default)]
    pub wallet_address: Option<String>,
    #[serde(default)]
    pub signature: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub wallet_type: Option<String>,
}

/// Response after successful wallet authentication.
#[derive(Debug, Serialize)]
pub struct WalletAuthResponse {
    pub token: String,
    pub user: UserView,
}

// ============================================================================
// User Models
// ============================================================================

/// User account as held by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub username: String,
    pub wallet_address: Option<String>,
    pub wallet_type: Option<WalletProvider>,
    pub avatar_url: Option<String>,
    pub created_at: u64,
}

/// Fields accepted when creating a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub wallet_address: Option<String>,
    pub wallet_type: Option<WalletProvider>,
    pub avatar_url: Option<String>,
}

/// Partial update applied to an existing user.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    pub username: Option<String>,
    pub wallet_type: Option<WalletProvider>,
    pub avatar_url: Option<String>,
}

/// Public view of a user, safe to return to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: i64,
    pub username: String,
    pub wallet_address: Option<String>,
    pub wallet_type: Option<WalletProvider>,
    pub avatar_url: Option<String>,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        UserView {
            id: user.id,
            username: user.username.clone(),
            wallet_address: user.wallet_address.clone(),
            wallet_type: user.wallet_type,
            avatar_url: user.avatar_url.clone(),
        }
    }
}

/// Wallet details for the wallet-gated endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletInfo {
    pub wallet_address: String,
    pub wallet_type: Option<WalletProvider>,
}
