use std::sync::Arc;

use async_trait::async_trait;
use auth::AuthenticationError;
use auth::Authenticator;

use crate::domain::user::models::AccessToken;
use crate::domain::user::models::Credential;
use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::NewUser;
use crate::domain::user::models::User;
use crate::user::errors::UserError;
use crate::user::ports::AuthServicePort;
use crate::user::ports::UserRepository;

/// Domain service implementation for registration, login and authorization.
///
/// Hashing and verification run on the blocking pool so Argon2 never stalls
/// the request-handling workers.
pub struct AuthService<UR>
where
    UR: UserRepository,
{
    repository: Arc<UR>,
    authenticator: Arc<Authenticator>,
}

impl<UR> AuthService<UR>
where
    UR: UserRepository,
{
    /// Create a new auth service with injected dependencies.
    ///
    /// # Arguments
    /// * `repository` - Credential store implementation
    /// * `authenticator` - Hasher and token handler built from startup configuration
    pub fn new(repository: Arc<UR>, authenticator: Arc<Authenticator>) -> Self {
        Self {
            repository,
            authenticator,
        }
    }

    async fn hash_password(&self, credential: Credential) -> Result<NewUser, UserError> {
        let authenticator = Arc::clone(&self.authenticator);
        let Credential { email, password } = credential;

        let password_hash =
            tokio::task::spawn_blocking(move || authenticator.hash_password(password.expose()))
                .await
                .map_err(|e| {
                    tracing::error!(
                        email = %email,
                        operation = "register",
                        error = %e,
                        "Password hashing task failed"
                    );
                    UserError::Internal(format!("hashing task failed for {}: {}", email, e))
                })?
                .map_err(|e| {
                    tracing::error!(
                        email = %email,
                        operation = "register",
                        error = %e,
                        "Failed while generating hashed password"
                    );
                    UserError::Internal(format!(
                        "failed while hashing password for {}: {}",
                        email, e
                    ))
                })?;

        Ok(NewUser {
            email,
            password_hash,
        })
    }
}

#[async_trait]
impl<UR> AuthServicePort for AuthService<UR>
where
    UR: UserRepository,
{
    async fn register(&self, credential: Credential) -> Result<User, UserError> {
        let email = credential.email.clone();

        match self.repository.exists_by_email(&email).await {
            Ok(false) => {}
            Ok(true) => {
                tracing::info!(
                    email = %email,
                    operation = "register",
                    "User registration blocked: email already exists"
                );
                return Err(UserError::EmailAlreadyExists(email.to_string()));
            }
            Err(e) => {
                tracing::error!(
                    email = %email,
                    operation = "register",
                    error = %e,
                    "Failed to check email availability"
                );
                return Err(UserError::Internal(format!(
                    "failed while checking email availability for {}: {}",
                    email, e
                )));
            }
        }

        let new_user = self.hash_password(credential).await?;

        match self.repository.insert(new_user).await {
            Ok(user) => {
                tracing::info!(user_id = %user.id, email = %email, "User registered");
                Ok(user)
            }
            // The availability check above is advisory; the unique constraint decides.
            Err(UserError::EmailAlreadyExists(_)) => {
                tracing::info!(
                    email = %email,
                    operation = "register",
                    "User registration blocked: email registered concurrently"
                );
                Err(UserError::EmailAlreadyExists(email.to_string()))
            }
            Err(e) => {
                tracing::error!(
                    email = %email,
                    operation = "register",
                    error = %e,
                    "Failed while inserting new user"
                );
                Err(UserError::Internal(format!(
                    "failed while inserting new user {}: {}",
                    email, e
                )))
            }
        }
    }

    async fn login(&self, credential: Credential) -> Result<AccessToken, UserError> {
        let Credential { email, password } = credential;

        let user = match self.repository.find_by_email(&email).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                tracing::info!(
                    email = %email,
                    operation = "login",
                    "User login blocked: user with this email does not exist"
                );
                return Err(UserError::UserNotFound(email.to_string()));
            }
            Err(e) => {
                tracing::error!(
                    email = %email,
                    operation = "login",
                    error = %e,
                    "Failed while getting hashed password"
                );
                return Err(UserError::Internal(format!(
                    "failed while getting hashed password for {}: {}",
                    email, e
                )));
            }
        };

        let authenticator = Arc::clone(&self.authenticator);
        let subject = email.to_string();
        let result = tokio::task::spawn_blocking(move || {
            authenticator.authenticate(password.expose(), &user.password_hash, &subject)
        })
        .await
        .map_err(|e| {
            tracing::error!(
                email = %email,
                operation = "login",
                error = %e,
                "Password verification task failed"
            );
            UserError::Internal(format!("verification task failed for {}: {}", email, e))
        })?;

        let result = match result {
            Ok(result) => result,
            Err(AuthenticationError::InvalidCredentials) => {
                tracing::info!(
                    email = %email,
                    operation = "login",
                    "User login blocked: wrong password"
                );
                return Err(UserError::WrongPassword);
            }
            Err(AuthenticationError::PasswordError(e)) => {
                tracing::error!(
                    email = %email,
                    operation = "login",
                    error = %e,
                    "Failed while comparing hash and password"
                );
                return Err(UserError::Internal(format!(
                    "failed while comparing hash and password for {}: {}",
                    email, e
                )));
            }
            Err(AuthenticationError::JwtError(e)) => {
                tracing::error!(
                    email = %email,
                    operation = "login",
                    error = %e,
                    "Failed while signing access token"
                );
                return Err(UserError::Internal(format!(
                    "failed while signing access token for {}: {}",
                    email, e
                )));
            }
        };

        let claims = &result.claims;
        let (issued_at, expires_at) = match (claims.issue_time(), claims.expires_at()) {
            (Some(issued_at), Some(expires_at)) => (issued_at, expires_at),
            _ => {
                tracing::error!(
                    email = %email,
                    operation = "login",
                    iat = claims.iat,
                    exp = claims.exp,
                    "Issued token carries out of range timestamps"
                );
                return Err(UserError::Internal(format!(
                    "issued token for {} carries out of range timestamps",
                    email
                )));
            }
        };

        tracing::info!(email = %email, expires_at = %expires_at, "Access token issued");

        Ok(AccessToken {
            token: result.access_token,
            subject: result.claims.sub,
            issued_at,
            expires_at,
        })
    }

    async fn authorize(&self, token: &str) -> Result<User, UserError> {
        let claims = self.authenticator.validate_token(token).map_err(|e| {
            tracing::info!(error = %e, operation = "authorize", "Invalid JWT");
            UserError::InvalidToken
        })?;

        let email = EmailAddress::new(claims.sub).map_err(|e| {
            tracing::info!(error = %e, operation = "authorize", "Invalid token subject");
            UserError::InvalidToken
        })?;

        match self.repository.find_by_email(&email).await {
            Ok(Some(user)) => Ok(user),
            Ok(None) => {
                tracing::info!(
                    email = %email,
                    operation = "authorize",
                    "Token subject no longer exists"
                );
                Err(UserError::UserNotFound(email.to_string()))
            }
            Err(e) => {
                tracing::error!(
                    email = %email,
                    operation = "authorize",
                    error = %e,
                    "Failed while resolving token subject"
                );
                Err(UserError::Internal(format!(
                    "failed while resolving token subject {}: {}",
                    email, e
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use auth::Claims;
    use auth::HashingCost;
    use auth::JwtHandler;
    use auth::PasswordHasher;
    use chrono::Duration;
    use chrono::Utc;

    use super::*;
    use crate::domain::user::models::Password;
    use crate::domain::user::models::UserId;
    use crate::user::ports::MockUserRepository;

    const SECRET: &[u8] = b"test-secret-key-for-jwt-signing-at-least-32-bytes";

    fn authenticator(secret: &[u8]) -> Arc<Authenticator> {
        let hasher = PasswordHasher::with_cost(HashingCost::minimum()).unwrap();
        Arc::new(Authenticator::with_hasher(secret, hasher))
    }

    fn credential(email: &str, password: &str) -> Credential {
        Credential::new(
            EmailAddress::new(email.to_string()).unwrap(),
            Password::new(password.to_string()).unwrap(),
        )
    }

    fn stored_user(email: &str, password: &str) -> User {
        let hasher = PasswordHasher::with_cost(HashingCost::minimum()).unwrap();
        User {
            id: UserId(1),
            email: EmailAddress::new(email.to_string()).unwrap(),
            password_hash: hasher.hash(password).unwrap(),
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    fn persisted(new_user: NewUser) -> User {
        User {
            id: UserId(42),
            email: new_user.email,
            password_hash: new_user.password_hash,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_register_success() {
        let mut repository = MockUserRepository::new();

        repository
            .expect_exists_by_email()
            .withf(|email| email.as_str() == "newemail@gmail.com")
            .times(1)
            .returning(|_| Ok(false));

        repository
            .expect_insert()
            .withf(|user| {
                let hasher = PasswordHasher::new();
                user.email.as_str() == "newemail@gmail.com"
                    && user.password_hash != "thisisapassword"
                    && user.password_hash.starts_with("$argon2id$")
                    && hasher
                        .verify("thisisapassword", &user.password_hash)
                        .unwrap_or(false)
            })
            .times(1)
            .returning(|user| Ok(persisted(user)));

        let service = AuthService::new(Arc::new(repository), authenticator(SECRET));

        let user = service
            .register(credential("newemail@gmail.com", "thisisapassword"))
            .await
            .expect("registration should succeed");

        assert_eq!(user.id, UserId(42));
        assert_eq!(user.email.as_str(), "newemail@gmail.com");
        assert_ne!(user.password_hash, "thisisapassword");
    }

    #[tokio::test]
    async fn test_register_email_already_exists() {
        let mut repository = MockUserRepository::new();

        repository
            .expect_exists_by_email()
            .times(1)
            .returning(|_| Ok(true));
        repository.expect_insert().times(0);

        let service = AuthService::new(Arc::new(repository), authenticator(SECRET));

        let result = service
            .register(credential("newemail@gmail.com", "thisisapassword"))
            .await;

        assert!(matches!(result, Err(UserError::EmailAlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_register_concurrent_duplicate_maps_to_email_already_exists() {
        let mut repository = MockUserRepository::new();

        repository
            .expect_exists_by_email()
            .times(1)
            .returning(|_| Ok(false));
        repository
            .expect_insert()
            .times(1)
            .returning(|user| Err(UserError::EmailAlreadyExists(user.email.to_string())));

        let service = AuthService::new(Arc::new(repository), authenticator(SECRET));

        let result = service
            .register(credential("race@example.com", "thisisapassword"))
            .await;

        assert!(matches!(result, Err(UserError::EmailAlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_register_availability_check_failure_is_internal() {
        let mut repository = MockUserRepository::new();

        repository
            .expect_exists_by_email()
            .times(1)
            .returning(|_| Err(UserError::DatabaseError("connection refused".to_string())));
        repository.expect_insert().times(0);

        let service = AuthService::new(Arc::new(repository), authenticator(SECRET));

        let result = service
            .register(credential("newemail@gmail.com", "thisisapassword"))
            .await;

        match result {
            Err(UserError::Internal(message)) => assert!(message.contains("connection refused")),
            other => panic!("expected internal error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_register_insert_failure_is_internal() {
        let mut repository = MockUserRepository::new();

        repository
            .expect_exists_by_email()
            .times(1)
            .returning(|_| Ok(false));
        repository
            .expect_insert()
            .times(1)
            .returning(|_| Err(UserError::DatabaseError("disk full".to_string())));

        let service = AuthService::new(Arc::new(repository), authenticator(SECRET));

        let result = service
            .register(credential("newemail@gmail.com", "thisisapassword"))
            .await;

        assert!(matches!(result, Err(UserError::Internal(_))));
    }

    #[tokio::test]
    async fn test_login_unknown_email() {
        let mut repository = MockUserRepository::new();

        repository
            .expect_find_by_email()
            .times(1)
            .returning(|_| Ok(None));

        let service = AuthService::new(Arc::new(repository), authenticator(SECRET));

        let result = service
            .login(credential("ghost@example.com", "whatever"))
            .await;

        assert!(matches!(result, Err(UserError::UserNotFound(_))));
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let mut repository = MockUserRepository::new();
        let user = stored_user("alice@example.com", "correct-password");

        repository
            .expect_find_by_email()
            .times(1)
            .returning(move |_| Ok(Some(user.clone())));

        let service = AuthService::new(Arc::new(repository), authenticator(SECRET));

        let result = service
            .login(credential("alice@example.com", "wrong-password"))
            .await;

        assert!(matches!(result, Err(UserError::WrongPassword)));
    }

    #[tokio::test]
    async fn test_login_success_issues_one_hour_token() {
        let mut repository = MockUserRepository::new();
        let user = stored_user("alice@example.com", "correct-password");

        repository
            .expect_find_by_email()
            .withf(|email| email.as_str() == "alice@example.com")
            .times(1)
            .returning(move |_| Ok(Some(user.clone())));

        let authenticator = authenticator(SECRET);
        let service = AuthService::new(Arc::new(repository), Arc::clone(&authenticator));

        let token = service
            .login(credential("alice@example.com", "correct-password"))
            .await
            .expect("login should succeed");

        assert_eq!(token.subject, "alice@example.com");
        assert_eq!(token.expires_at - token.issued_at, Duration::hours(1));

        let claims = authenticator.validate_token(&token.token).unwrap();
        assert_eq!(claims.sub, "alice@example.com");
        assert_eq!(claims.iss, "app");
        assert_eq!(claims.exp, claims.iat + 3600);
    }

    #[tokio::test]
    async fn test_login_corrupt_hash_is_internal() {
        let mut repository = MockUserRepository::new();
        let mut user = stored_user("alice@example.com", "correct-password");
        user.password_hash = "not-a-phc-string".to_string();

        repository
            .expect_find_by_email()
            .times(1)
            .returning(move |_| Ok(Some(user.clone())));

        let service = AuthService::new(Arc::new(repository), authenticator(SECRET));

        let result = service
            .login(credential("alice@example.com", "correct-password"))
            .await;

        assert!(matches!(result, Err(UserError::Internal(_))));
    }

    #[tokio::test]
    async fn test_login_store_failure_is_internal() {
        let mut repository = MockUserRepository::new();

        repository
            .expect_find_by_email()
            .times(1)
            .returning(|_| Err(UserError::DatabaseError("timeout".to_string())));

        let service = AuthService::new(Arc::new(repository), authenticator(SECRET));

        let result = service
            .login(credential("alice@example.com", "correct-password"))
            .await;

        assert!(matches!(result, Err(UserError::Internal(_))));
    }

    #[tokio::test]
    async fn test_authorize_resolves_same_identity_every_time() {
        let mut repository = MockUserRepository::new();
        let user = stored_user("alice@example.com", "correct-password");
        let expected = user.clone();

        repository
            .expect_find_by_email()
            .withf(|email| email.as_str() == "alice@example.com")
            .times(2)
            .returning(move |_| Ok(Some(user.clone())));

        let authenticator = authenticator(SECRET);
        let token = authenticator
            .issue_token("alice@example.com")
            .unwrap()
            .access_token;
        let service = AuthService::new(Arc::new(repository), authenticator);

        let first = service.authorize(&token).await.unwrap();
        let second = service.authorize(&token).await.unwrap();

        assert_eq!(first, expected);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_authorize_token_from_other_secret() {
        let mut repository = MockUserRepository::new();
        repository.expect_find_by_email().times(0);

        let token = authenticator(b"a-completely-different-secret-of-32-bytes")
            .issue_token("alice@example.com")
            .unwrap()
            .access_token;
        let service = AuthService::new(Arc::new(repository), authenticator(SECRET));

        let result = service.authorize(&token).await;
        assert!(matches!(result, Err(UserError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_authorize_expired_token() {
        let mut repository = MockUserRepository::new();
        repository.expect_find_by_email().times(0);

        let claims = Claims::issued_at("alice@example.com", Utc::now() - Duration::hours(2));
        let token = JwtHandler::new(SECRET).encode(&claims).unwrap();
        let service = AuthService::new(Arc::new(repository), authenticator(SECRET));

        let result = service.authorize(&token).await;
        assert!(matches!(result, Err(UserError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_authorize_deleted_user() {
        let mut repository = MockUserRepository::new();
        repository
            .expect_find_by_email()
            .times(1)
            .returning(|_| Ok(None));

        let authenticator = authenticator(SECRET);
        let token = authenticator
            .issue_token("gone@example.com")
            .unwrap()
            .access_token;
        let service = AuthService::new(Arc::new(repository), authenticator);

        let result = service.authorize(&token).await;
        assert!(matches!(result, Err(UserError::UserNotFound(_))));
    }

    #[tokio::test]
    async fn test_authorize_store_failure_is_internal() {
        let mut repository = MockUserRepository::new();
        repository
            .expect_find_by_email()
            .times(1)
            .returning(|_| Err(UserError::DatabaseError("connection reset".to_string())));

        let authenticator = authenticator(SECRET);
        let token = authenticator
            .issue_token("alice@example.com")
            .unwrap()
            .access_token;
        let service = AuthService::new(Arc::new(repository), authenticator);

        let result = service.authorize(&token).await;
        assert!(matches!(result, Err(UserError::Internal(_))));
    }
}
