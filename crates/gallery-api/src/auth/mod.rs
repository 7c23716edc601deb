pub mod models;
pub mod verifier;

pub use models::{Caller, JwtClaims};
pub use verifier::{Identity, JwtVerifier, TokenVerifier};
