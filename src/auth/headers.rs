/// Inbound request accessor and bearer-credential extraction.

use actix_web::http::header::HeaderMap;
use actix_web::HttpRequest;

use crate::error::AuthError;

pub const AUTHORIZATION: &str = "Authorization";

const BEARER_SCHEME: &str = "Bearer";

/// Read access to a request's headers.
pub trait RequestHeaders {
    /// Value of the header `name`, if present and valid text.
    fn header_value(&self, name: &str) -> Option<&str>;
}

impl RequestHeaders for HeaderMap {
    fn header_value(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|value| value.to_str().ok())
    }
}

impl RequestHeaders for HttpRequest {
    fn header_value(&self, name: &str) -> Option<&str> {
        self.headers().header_value(name)
    }
}

/// Pull the plaintext token out of an `Authorization` header value.
///
/// The value must be exactly `Bearer <token>`: two parts split on a single
/// space, with the scheme spelled exactly.
pub fn extract_bearer(header: Option<&str>) -> Result<&str, AuthError> {
    let header = match header {
        Some(value) if !value.is_empty() => value,
        _ => return Err(AuthError::MissingHeader),
    };

    let parts: Vec<&str> = header.split(' ').collect();
    match parts.as_slice() {
        [scheme, token] if *scheme == BEARER_SCHEME => Ok(*token),
        _ => Err(AuthError::MalformedHeader),
    }
}
