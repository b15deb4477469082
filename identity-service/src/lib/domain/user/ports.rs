use async_trait::async_trait;

use crate::domain::user::models::AccessToken;
use crate::domain::user::models::Credential;
use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::NewUser;
use crate::domain::user::models::User;
use crate::user::errors::UserError;

/// Port for authentication operations consumed by the HTTP layer.
#[async_trait]
pub trait AuthServicePort: Send + Sync + 'static {
    /// Register a new account.
    ///
    /// # Arguments
    /// * `credential` - Email and plaintext password
    ///
    /// # Returns
    /// Created user entity. No token is issued.
    ///
    /// # Errors
    /// * `EmailAlreadyExists` - Email is already registered
    /// * `Internal` - Store or hashing failure
    async fn register(&self, credential: Credential) -> Result<User, UserError>;

    /// Verify a credential and issue an access token.
    ///
    /// # Arguments
    /// * `credential` - Email and plaintext password
    ///
    /// # Returns
    /// Signed access token valid for one hour
    ///
    /// # Errors
    /// * `UserNotFound` - No account for this email
    /// * `WrongPassword` - Password does not match
    /// * `Internal` - Store, verification or signing failure
    async fn login(&self, credential: Credential) -> Result<AccessToken, UserError>;

    /// Resolve the account a bearer token was issued to.
    ///
    /// The identity is looked up in the store on every call, so accounts
    /// removed after issuance lose access immediately.
    ///
    /// # Arguments
    /// * `token` - Bearer token without the scheme prefix
    ///
    /// # Returns
    /// Current user entity for the token subject
    ///
    /// # Errors
    /// * `InvalidToken` - Malformed, wrongly signed, wrong algorithm or expired
    /// * `UserNotFound` - Subject no longer exists
    /// * `Internal` - Store failure
    async fn authorize(&self, token: &str) -> Result<User, UserError>;
}

/// Credential store contract.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync + 'static {
    /// Retrieve user by email address.
    ///
    /// # Returns
    /// Optional user entity (None if not found)
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn find_by_email(&self, email: &EmailAddress) -> Result<Option<User>, UserError>;

    /// Check whether an account exists for an email address.
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn exists_by_email(&self, email: &EmailAddress) -> Result<bool, UserError>;

    /// Persist a new user.
    ///
    /// # Returns
    /// Stored user entity with its assigned id and timestamps
    ///
    /// # Errors
    /// * `EmailAlreadyExists` - Unique constraint on email was violated
    /// * `DatabaseError` - Database operation failed
    async fn insert(&self, user: NewUser) -> Result<User, UserError>;
}
