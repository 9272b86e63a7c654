//! Bearer credential minting and validation (HS256 JWT).

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

const JWT_ALGORITHM: Algorithm = Algorithm::HS256;

/// Claims embedded in a bearer credential.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenClaims {
    pub id: i64,
    pub wallet_address: Option<String>,
    pub iat: usize,
    pub exp: usize,
}

/// Why a presented credential was not accepted.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Token expired")]
    Expired,

    #[error("Invalid token")]
    Invalid,
}

/// Signing and verification keys derived from the process secret.
///
/// Built once at startup and shared through `AppState`; the secret itself is
/// never attached to requests.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenKeys {
    pub fn from_secret(secret: &str) -> Self {
        TokenKeys {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Mint a credential for a user, valid for `ttl_secs` from now.
    pub fn mint(
        &self,
        user_id: i64,
        wallet_address: Option<&str>,
        ttl_secs: u64,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        self.mint_at(user_id, wallet_address, ttl_secs, unix_now())
    }

    /// Mint with an explicit issuance time. Used by `mint` and by tests
    /// exercising the expiry boundary.
    pub fn mint_at(
        &self,
        user_id: i64,
        wallet_address: Option<&str>,
        ttl_secs: u64,
        iat: usize,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let claims = TokenClaims {
            id: user_id,
            wallet_address: wallet_address.map(str::to_string),
            iat,
            exp: iat + ttl_secs as usize,
        };
        encode(&Header::new(JWT_ALGORITHM), &claims, &self.encoding)
    }

    /// Validate signature and expiry, returning the embedded claims.
    pub fn decode(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let mut validation = Validation::new(JWT_ALGORITHM);
        // No leeway: the validity window boundary is exact
        validation.leeway = 0;

        let token_data =
            decode::<TokenClaims>(token, &self.decoding, &validation).map_err(|e| {
                match e.kind() {
                    ErrorKind::ExpiredSignature => TokenError::Expired,
                    _ => TokenError::Invalid,
                }
            })?;

        Ok(token_data.claims)
    }
}

/// Current unix time in seconds.
pub fn unix_now() -> usize {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as usize)
        .unwrap_or(0)
}
