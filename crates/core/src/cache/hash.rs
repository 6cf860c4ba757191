//! Cache key derivation for normalized requests.

use sha2::{Digest, Sha256};

use crate::http::Request;

/// Compute the store key for a method and absolute URL.
///
/// The URL is expected to be fragment-free already; [`Request::new`] takes
/// care of that.
pub fn compute_cache_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.to_ascii_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

/// Store key for an intercepted request.
pub fn request_key(request: &Request) -> String {
    compute_cache_key(&request.method, request.url.as_str())
}
