//! Client-side HTTP Digest authentication (RFC 7616) against the camera.
//!
//! ```text
//! HA1 = MD5(username:realm:password)
//! HA2 = MD5(method:uri)
//! response = MD5(HA1:nonce:nc:cnonce:qop:HA2)
//! ```

use std::collections::HashMap;

use md5::{Digest, Md5};
use rand::Rng;

/// The server's `WWW-Authenticate: Digest ...` challenge, parsed into its
/// `key="value"` parameters.
#[derive(Debug, Clone)]
pub struct DigestChallenge {
    pub realm: String,
    pub nonce: String,
    pub qop: Option<String>,
    pub opaque: Option<String>,
    pub algorithm: Option<String>,
}

impl DigestChallenge {
    /// Parse a `WWW-Authenticate` header value. Returns `None` if it is not
    /// a `Digest` challenge or is missing required fields.
    pub fn parse(header_value: &str) -> Option<Self> {
        let params_str = header_value
            .strip_prefix("Digest ")
            .or_else(|| header_value.strip_prefix("digest "))?;

        let mut params: HashMap<String, String> = HashMap::new();
        for part in params_str.split(',') {
            let part = part.trim();
            if let Some((key, value)) = part.split_once('=') {
                params.insert(key.trim().to_lowercase(), value.trim().trim_matches('"').to_string());
            }
        }

        Some(Self {
            realm: params.remove("realm")?,
            nonce: params.remove("nonce")?,
            qop: params.remove("qop"),
            opaque: params.remove("opaque"),
            algorithm: params.remove("algorithm"),
        })
    }
}

fn md5_hex(input: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

fn random_cnonce() -> String {
    let bytes: [u8; 8] = rand::thread_rng().gen();
    hex::encode(bytes)
}

/// Build the `Authorization: Digest ...` header value for one request, per
/// the challenge the camera just issued. Nonce count is fixed at
/// `00000001` — a fresh Forwarder call always re-challenges rather than
/// reusing a nonce across requests, so there is never a second count to
/// track.
pub fn build_authorization_header(
    challenge: &DigestChallenge,
    username: &str,
    password: &str,
    method: &str,
    uri: &str,
) -> String {
    let ha1 = md5_hex(&format!("{username}:{}:{password}", challenge.realm));
    let ha2 = md5_hex(&format!("{method}:{uri}"));

    let nc = "00000001";
    let cnonce = random_cnonce();

    let (response, qop_fragment) = match challenge.qop.as_deref() {
        Some(qop) if qop.contains("auth") => {
            let response = md5_hex(&format!("{ha1}:{}:{nc}:{cnonce}:auth:{ha2}", challenge.nonce));
            (response, format!(r#", qop=auth, nc={nc}, cnonce="{cnonce}""#))
        }
        _ => {
            let response = md5_hex(&format!("{ha1}:{}:{ha2}", challenge.nonce));
            (response, String::new())
        }
    };

    let opaque_fragment = challenge
        .opaque
        .as_ref()
        .map(|o| format!(r#", opaque="{o}""#))
        .unwrap_or_default();

    format!(
        r#"Digest username="{username}", realm="{realm}", nonce="{nonce}", uri="{uri}", response="{response}"{qop_fragment}{opaque_fragment}"#,
        realm = challenge.realm,
        nonce = challenge.nonce,
    )
}
