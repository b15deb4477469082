use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use auth::Authenticator;
use auth::HashingCost;
use auth::JwtHandler;
use auth::PasswordHasher;
use chrono::Utc;
use identity_service::domain::user::models::EmailAddress;
use identity_service::domain::user::models::NewUser;
use identity_service::domain::user::models::User;
use identity_service::domain::user::models::UserId;
use identity_service::domain::user::ports::UserRepository;
use identity_service::domain::user::service::AuthService;
use identity_service::inbound::http::router::create_router;
use identity_service::user::errors::UserError;

pub const JWT_SECRET: &[u8] = b"test-secret-key-for-jwt-signing-at-least-32-bytes";

/// Credential store double keeping users in memory.
///
/// Enforces email uniqueness on insert the way the users table does.
#[derive(Default)]
pub struct InMemoryUserRepository {
    users: Mutex<HashMap<String, User>>,
    next_id: Mutex<i64>,
}

impl InMemoryUserRepository {
    pub fn get(&self, email: &str) -> Option<User> {
        self.users.lock().unwrap().get(email).cloned()
    }

    pub fn remove(&self, email: &str) -> Option<User> {
        self.users.lock().unwrap().remove(email)
    }

    pub fn len(&self) -> usize {
        self.users.lock().unwrap().len()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_email(&self, email: &EmailAddress) -> Result<Option<User>, UserError> {
        Ok(self.get(email.as_str()))
    }

    async fn exists_by_email(&self, email: &EmailAddress) -> Result<bool, UserError> {
        Ok(self.users.lock().unwrap().contains_key(email.as_str()))
    }

    async fn insert(&self, user: NewUser) -> Result<User, UserError> {
        let mut users = self.users.lock().unwrap();
        if users.contains_key(user.email.as_str()) {
            return Err(UserError::EmailAlreadyExists(user.email.to_string()));
        }

        let mut next_id = self.next_id.lock().unwrap();
        *next_id += 1;

        let stored = User {
            id: UserId(*next_id),
            email: user.email,
            password_hash: user.password_hash,
            created_at: Utc::now(),
            updated_at: None,
        };
        users.insert(stored.email.to_string(), stored.clone());

        Ok(stored)
    }
}

/// Test application that spawns a real server
pub struct TestApp {
    pub address: String,
    pub repository: Arc<InMemoryUserRepository>,
    pub api_client: reqwest::Client,
    pub jwt_handler: JwtHandler,
}

impl TestApp {
    /// Spawn the application in a background task and return TestApp
    pub async fn spawn() -> Self {
        // Use random port (0 = OS assigns)
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind random port");
        let port = listener.local_addr().unwrap().port();
        let address = format!("http://127.0.0.1:{}", port);

        let repository = Arc::new(InMemoryUserRepository::default());

        let password_hasher =
            PasswordHasher::with_cost(HashingCost::minimum()).expect("minimum cost is valid");
        let authenticator = Arc::new(Authenticator::with_hasher(JWT_SECRET, password_hasher));

        let auth_service = Arc::new(AuthService::new(Arc::clone(&repository), authenticator));

        let router = create_router(auth_service);

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("Server error");
        });

        Self {
            address,
            repository,
            api_client: reqwest::Client::new(),
            jwt_handler: JwtHandler::new(JWT_SECRET),
        }
    }

    /// Helper to make GET request
    pub fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.get(&format!("{}{}", self.address, path))
    }

    /// Helper to make POST request
    pub fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.post(&format!("{}{}", self.address, path))
    }

    /// Helper to make GET request with Bearer token
    pub fn get_authenticated(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.get(path).bearer_auth(token)
    }

    /// Register an account and return the raw response
    pub async fn register(&self, email: &str, password: &str) -> reqwest::Response {
        self.post("/api/v1/register")
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Log in and return the raw response
    pub async fn login(&self, email: &str, password: &str) -> reqwest::Response {
        self.post("/api/v1/login")
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Register, log in and return the issued token
    pub async fn token_for(&self, email: &str, password: &str) -> String {
        self.register(email, password).await;
        let body: serde_json::Value = self
            .login(email, password)
            .await
            .json()
            .await
            .expect("Failed to parse response");
        body["data"]["token"]
            .as_str()
            .expect("login response has a token")
            .to_string()
    }
}
