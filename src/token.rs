//! Public review tokens.
//!
//! A token is the base64url form of the request id. It is not a secret:
//! anyone can derive it, so it only locates a request.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

pub fn encode(request_id: &str) -> String {
    URL_SAFE_NO_PAD.encode(request_id)
}

/// Recover the request id a token was minted from
pub fn decode(token: &str) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(token).ok()?;
    String::from_utf8(bytes).ok()
}
