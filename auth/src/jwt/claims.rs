use chrono::DateTime;
use chrono::Duration;
use chrono::TimeZone;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

/// Issuer written into every token and required on validation.
pub const TOKEN_ISSUER: &str = "app";

/// Lifetime of an access token.
pub const TOKEN_TTL_SECONDS: i64 = 60 * 60;

/// Access token claims.
///
/// Field names follow RFC 7519 so tokens interoperate with any service that
/// shares the signing secret.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// Subject (email of the authenticated user)
    pub sub: String,

    /// Issuer
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    /// Claims for a token issued now.
    ///
    /// # Arguments
    /// * `subject` - Identity asserted by the token
    ///
    /// # Returns
    /// Claims with the fixed issuer and `exp = iat + 1 hour`
    pub fn for_subject(subject: impl ToString) -> Self {
        Self::issued_at(subject, Utc::now())
    }

    /// Claims for a token issued at an arbitrary instant.
    pub fn issued_at(subject: impl ToString, issued_at: DateTime<Utc>) -> Self {
        let expiration = issued_at + Duration::seconds(TOKEN_TTL_SECONDS);

        Self {
            sub: subject.to_string(),
            iss: TOKEN_ISSUER.to_string(),
            iat: issued_at.timestamp(),
            exp: expiration.timestamp(),
        }
    }

    /// Issue time as a UTC datetime, `None` if `iat` is out of range.
    pub fn issue_time(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.iat, 0).single()
    }

    /// Expiration as a UTC datetime, `None` if `exp` is out of range.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.exp, 0).single()
    }
}
