use thiserror::Error;

/// Error type for password operations.
///
/// A plain mismatch is not an error: `verify` reports it as `Ok(false)`.
/// Every variant here indicates a fault in the stored data or the crypto
/// backend.
#[derive(Debug, Clone, Error)]
pub enum PasswordError {
    #[error("Password hashing failed: {0}")]
    HashingFailed(String),

    #[error("Invalid password hash: {0}")]
    InvalidHash(String),

    #[error("Password verification failed: {0}")]
    VerificationFailed(String),

    #[error("Invalid hashing cost: {0}")]
    InvalidCost(String),
}
