/// Middleware module
///
/// Bearer-token authentication for protected scopes.

mod token_middleware;

pub use token_middleware::TokenAuth;
