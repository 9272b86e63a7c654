//! Authentication layer: wallet signature verification, bearer credentials,
//! and request authorization.

pub mod middleware;
pub mod token;
pub mod verify;

pub use middleware::{AppState, AuthUser, WalletUser};
pub use token::{TokenClaims, TokenError, TokenKeys};
pub use verify::{verify_wallet_signature, SIMULATED_SIGNATURE};
