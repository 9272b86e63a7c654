//! Wallet signature verification.
//!
//! Two schemes are supported: Ed25519 over base58-encoded keys (Phantom) and
//! EIP-191 personal-sign recovery over secp256k1 (MetaMask, Brave). Both are
//! pure checks: every decode or verification fault collapses to `false`,
//! nothing is ever raised to the caller.

use crate::models::SignatureScheme;
use ed25519_dalek::{Signature as Ed25519Signature, Verifier, VerifyingKey as Ed25519VerifyingKey};
use k256::ecdsa::{RecoveryId, Signature as EcdsaSignature, VerifyingKey as EcdsaVerifyingKey};
use sha3::{Digest, Keccak256};

/// Development bypass value accepted in place of a real signature.
///
/// Only honored when the caller explicitly allows it (i.e. the process is not
/// running with the production flag set).
pub const SIMULATED_SIGNATURE: &str = "simulated_signature";

/// Verify that `signature` proves control of `wallet_address` over `message`.
///
/// `allow_simulated` must be derived from configuration (`!config.production`);
/// it enables the development bypass value and is logged whenever exercised.
pub fn verify_wallet_signature(
    scheme: SignatureScheme,
    wallet_address: &str,
    message: &str,
    signature: &str,
    allow_simulated: bool,
) -> bool {
    if allow_simulated && signature == SIMULATED_SIGNATURE {
        tracing::warn!(
            action = "simulated_signature",
            wallet_address = %wallet_address,
            "Accepting simulated signature (non-production only)"
        );
        return true;
    }

    match scheme {
        SignatureScheme::Ed25519 => verify_ed25519(wallet_address, message, signature),
        SignatureScheme::EcdsaRecover => verify_ecdsa_recover(wallet_address, message, signature),
    }
}

/// Ed25519 check: the base58-decoded wallet address is the public key.
fn verify_ed25519(wallet_address: &str, message: &str, signature: &str) -> bool {
    let Ok(pubkey_bytes) = bs58::decode(wallet_address).into_vec() else {
        return false;
    };
    let Ok(signature_bytes) = bs58::decode(signature).into_vec() else {
        return false;
    };

    let Ok(pubkey_array) = <[u8; 32]>::try_from(pubkey_bytes.as_slice()) else {
        return false;
    };
    let Ok(signature_array) = <[u8; 64]>::try_from(signature_bytes.as_slice()) else {
        return false;
    };

    let Ok(verifying_key) = Ed25519VerifyingKey::from_bytes(&pubkey_array) else {
        return false;
    };
    let signature = Ed25519Signature::from_bytes(&signature_array);

    verifying_key.verify(message.as_bytes(), &signature).is_ok()
}

/// ECDSA-recover check: recover the signer address from a 65-byte (r, s, v)
/// personal-sign signature and compare it to the claimed address.
fn verify_ecdsa_recover(wallet_address: &str, message: &str, signature: &str) -> bool {
    let sig_hex = signature.strip_prefix("0x").unwrap_or(signature);
    let Ok(sig_bytes) = hex::decode(sig_hex) else {
        return false;
    };
    if sig_bytes.len() != 65 {
        return false;
    }

    // v is 27/28 per the Ethereum convention; raw recovery ids also accepted
    let recovery_byte = match sig_bytes[64] {
        v @ (0 | 1) => v,
        v @ (27 | 28) => v - 27,
        _ => return false,
    };
    let Some(recovery_id) = RecoveryId::from_byte(recovery_byte) else {
        return false;
    };

    let Ok(sig) = EcdsaSignature::from_slice(&sig_bytes[..64]) else {
        return false;
    };

    let digest = personal_sign_hash(message);
    let Ok(recovered) = EcdsaVerifyingKey::recover_from_prehash(&digest, &sig, recovery_id) else {
        return false;
    };

    let claimed = wallet_address.strip_prefix("0x").unwrap_or(wallet_address);
    eth_address(&recovered).eq_ignore_ascii_case(claimed)
}

/// Keccak-256 of the EIP-191 prefixed message.
fn personal_sign_hash(message: &str) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(format!("\x19Ethereum Signed Message:\n{}", message.len()));
    hasher.update(message.as_bytes());
    hasher.finalize().into()
}

/// Lowercase hex Ethereum address (no 0x prefix) for a recovered public key.
fn eth_address(key: &EcdsaVerifyingKey) -> String {
    use k256::elliptic_curve::sec1::ToEncodedPoint;

    let point = key.to_encoded_point(false);
    // Skip the uncompressed-point tag byte, keep the last 20 digest bytes
    let digest = Keccak256::digest(&point.as_bytes()[1..]);
    hex::encode(&digest[12..])
}
