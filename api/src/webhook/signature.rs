//! Webhook signature verification, one scheme per vendor.
//!
//! - GitHub: `X-Hub-Signature-256` (or `X-Hub-Signature`), value
//!   `sha256=<hex>`, HMAC-SHA256 over the raw payload, constant-time
//!   comparison.
//! - GitLab: `X-Gitlab-Token` compared against the shared secret.
//! - Gitea: `X-Gitea-Signature`, bare hex HMAC-SHA256, constant-time
//!   comparison.
//!
//! An empty configured secret disables verification entirely.

use axum::http::HeaderMap;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::webhook::events::WebhookVendor;

type HmacSha256 = Hmac<Sha256>;

/// Verifies the request against the configured secret.
///
/// Returns the rejection reason on failure; the handler maps it to 400.
pub fn verify(
    vendor: WebhookVendor,
    headers: &HeaderMap,
    payload: &[u8],
    secret: &str,
) -> Result<(), &'static str> {
    if secret.is_empty() {
        return Ok(());
    }

    match vendor {
        WebhookVendor::GitHub => {
            let signature = headers
                .get("x-hub-signature-256")
                .or_else(|| headers.get("x-hub-signature"))
                .and_then(|v| v.to_str().ok())
                .ok_or("missing hub signature header")?;
            if verify_prefixed_sha256(secret, payload, signature) {
                Ok(())
            } else {
                Err("invalid hub signature")
            }
        }
        WebhookVendor::GitLab => {
            let token = headers
                .get("x-gitlab-token")
                .and_then(|v| v.to_str().ok())
                .ok_or("missing gitlab token header")?;
            if token == secret {
                Ok(())
            } else {
                Err("invalid gitlab token")
            }
        }
        WebhookVendor::Gitea => {
            let signature = headers
                .get("x-gitea-signature")
                .and_then(|v| v.to_str().ok())
                .ok_or("missing gitea signature header")?;
            if verify_hex_sha256(secret, payload, signature) {
                Ok(())
            } else {
                Err("invalid gitea signature")
            }
        }
    }
}

/// GitHub-style signature: `sha256=` prefix plus hex HMAC.
fn verify_prefixed_sha256(secret: &str, payload: &[u8], signature: &str) -> bool {
    let Some(signature_hex) = signature.strip_prefix("sha256=") else {
        return false;
    };
    verify_hex_sha256(secret, payload, signature_hex)
}

fn verify_hex_sha256(secret: &str, payload: &[u8], signature_hex: &str) -> bool {
    let Ok(signature_bytes) = hex::decode(signature_hex) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(payload);
    // Constant-time verification.
    mac.verify_slice(&signature_bytes).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, payload: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("mac");
        mac.update(payload);
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn github_signature_accepts_and_rejects_single_bit_mutations() {
        let secret = "s3cret";
        let payload = b"{\"action\":\"opened\"}";
        let good = format!("sha256={}", sign(secret, payload));

        let mut headers = HeaderMap::new();
        headers.insert("x-hub-signature-256", good.parse().expect("header"));
        assert!(verify(WebhookVendor::GitHub, &headers, payload, secret).is_ok());

        // Flip one hex digit of the signature.
        let mut bad = good.clone().into_bytes();
        let last = *bad.last().expect("digit");
        *bad.last_mut().expect("digit") = if last == b'0' { b'1' } else { b'0' };
        let bad = String::from_utf8(bad).expect("utf8");
        let mut headers = HeaderMap::new();
        headers.insert("x-hub-signature-256", bad.parse().expect("header"));
        assert!(verify(WebhookVendor::GitHub, &headers, payload, secret).is_err());
    }

    #[test]
    fn github_falls_back_to_the_legacy_header() {
        let secret = "s";
        let payload = b"payload";
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-hub-signature",
            format!("sha256={}", sign(secret, payload))
                .parse()
                .expect("header"),
        );
        assert!(verify(WebhookVendor::GitHub, &headers, payload, secret).is_ok());
    }

    #[test]
    fn gitlab_token_is_compared_for_equality() {
        let mut headers = HeaderMap::new();
        headers.insert("x-gitlab-token", "topsecret".parse().expect("header"));
        assert!(verify(WebhookVendor::GitLab, &headers, b"x", "topsecret").is_ok());
        assert!(verify(WebhookVendor::GitLab, &headers, b"x", "other").is_err());
    }

    #[test]
    fn gitea_signature_is_bare_hex() {
        let secret = "giteasecret";
        let payload = b"{\"action\":\"opened\"}";
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-gitea-signature",
            sign(secret, payload).parse().expect("header"),
        );
        assert!(verify(WebhookVendor::Gitea, &headers, payload, secret).is_ok());
        assert!(verify(WebhookVendor::Gitea, &headers, b"tampered", secret).is_err());
    }

    #[test]
    fn empty_secret_disables_verification() {
        let headers = HeaderMap::new();
        assert!(verify(WebhookVendor::GitHub, &headers, b"x", "").is_ok());
        assert!(verify(WebhookVendor::GitLab, &headers, b"x", "").is_ok());
    }

    #[test]
    fn missing_headers_are_rejected_when_a_secret_is_set() {
        let headers = HeaderMap::new();
        assert!(verify(WebhookVendor::GitHub, &headers, b"x", "s").is_err());
        assert!(verify(WebhookVendor::Gitea, &headers, b"x", "s").is_err());
    }
}
