/// Authentication module
///
/// Password hashing, opaque bearer tokens, token persistence, and the
/// authenticator that ties them together.

mod authenticator;
mod headers;
mod password;
mod token;
mod token_store;

pub use authenticator::{Authenticator, Credentials, IssuedToken};
pub use headers::{extract_bearer, RequestHeaders, AUTHORIZATION};
pub use password::{hash_password, verify_password, MAX_PASSWORD_BYTES, PASSWORD_COST};
pub use token::{generate_plaintext, generate_token, hash_token, TOKEN_LENGTH};
pub use token_store::TokenStore;
