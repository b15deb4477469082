pub mod claims;
pub mod errors;
pub mod handler;

pub use claims::Claims;
pub use claims::TOKEN_ISSUER;
pub use claims::TOKEN_TTL_SECONDS;
pub use errors::JwtError;
pub use handler::JwtHandler;
