//! Request signing.
//!
//! Every request after installation carries an RSA PKCS#1 v1.5 / SHA-256
//! signature over a canonical string:
//!
//! ```text
//! POST /v1/session-server
//!
//! {"secret":"..."}
//! ```
//!
//! i.e. `"<METHOD> /<version><path>\n\n<body>"`. The body is the exact byte
//! sequence sent on the wire, so callers must serialize once and reuse it.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rsa::pkcs1v15::{Signature, SigningKey, VerifyingKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::sha2::Sha256;
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use rsa::{RsaPrivateKey, RsaPublicKey};
use tracing::debug;

/// API version prefix shared by URLs and signing strings.
pub const API_VERSION: &str = "v1";

/// Ensure the path starts with exactly one `/`.
pub fn normalize_path(path: &str) -> String {
    format!("/{}", path.trim_start_matches('/'))
}

/// Build the canonical signing string.
pub fn signing_string(method: &str, path: &str, body: &str) -> String {
    format!(
        "{} /{}{}\n\n{}",
        method.to_ascii_uppercase(),
        API_VERSION,
        normalize_path(path),
        body
    )
}

/// Sign a request with a PEM private key.
///
/// Returns `None` when there is no key or signing fails for any reason; the
/// request then goes out unsigned. Only the installation call is accepted
/// unsigned by the API, so later calls fail remotely, not here.
pub fn sign(method: &str, path: &str, body: &str, private_key: Option<&str>) -> Option<String> {
    let pem = private_key?;

    let key = match RsaPrivateKey::from_pkcs8_pem(pem) {
        Ok(key) => key,
        Err(e) => {
            debug!(error = %e, "private key unusable, sending unsigned");
            return None;
        }
    };

    let message = signing_string(method, path, body);
    match SigningKey::<Sha256>::new(key).try_sign(message.as_bytes()) {
        Ok(signature) => Some(STANDARD.encode(signature.to_bytes())),
        Err(e) => {
            debug!(error = %e, "signing failed, sending unsigned");
            None
        }
    }
}

/// Check a base64 signature over `message` against a PEM (SPKI) public key.
///
/// Any decoding problem counts as an invalid signature.
pub fn verify_signature(message: &str, signature_b64: &str, public_key: &str) -> bool {
    let Ok(key) = RsaPublicKey::from_public_key_pem(public_key) else {
        return false;
    };
    let Ok(raw) = STANDARD.decode(signature_b64) else {
        return false;
    };
    let Ok(signature) = Signature::try_from(raw.as_slice()) else {
        return false;
    };

    VerifyingKey::<Sha256>::new(key)
        .verify(message.as_bytes(), &signature)
        .is_ok()
}
