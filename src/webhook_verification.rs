//! # Webhook Signature Verification
//!
//! Verifies Stripe webhook signatures: HMAC-SHA256 over `"{t}.{payload}"`
//! compared in constant time against every `v1` entry of the
//! `Stripe-Signature` header.

use axum::http::StatusCode;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::{debug, warn};

use crate::error::ApiError;

type HmacSha256 = Hmac<Sha256>;

/// Name of the header Stripe sends the signature in.
pub const STRIPE_SIGNATURE_HEADER: &str = "Stripe-Signature";

/// Errors that can occur during webhook signature verification
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum VerificationError {
    #[error("Missing required signature header: {header}")]
    MissingSignature { header: String },

    #[error("Invalid signature format: {reason}")]
    InvalidSignatureFormat { reason: String },

    #[error("Signature verification failed")]
    VerificationFailed,

    #[error("Timestamp too old: {seconds}s old, max allowed: {max_seconds}s")]
    TimestampTooOld { seconds: u64, max_seconds: u64 },

    #[error("Timestamp too far in future: {seconds}s in future, max allowed: {max_seconds}s")]
    TimestampTooFuture { seconds: u64, max_seconds: u64 },

    #[error("Webhook verification not configured")]
    NotConfigured,
}

impl VerificationError {
    /// Returns the appropriate HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            VerificationError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<VerificationError> for ApiError {
    fn from(error: VerificationError) -> Self {
        let code = match error {
            VerificationError::NotConfigured => "SERVICE_UNAVAILABLE",
            _ => "VALIDATION_FAILED",
        };
        ApiError::new(error.status_code(), code, error.to_string())
    }
}

/// Result type for webhook verification
pub type VerificationResult<T> = Result<T, VerificationError>;

/// Parsed `Stripe-Signature` header.
#[derive(Debug, PartialEq, Eq)]
struct SignatureHeader {
    timestamp: i64,
    signatures: Vec<Vec<u8>>,
}

fn parse_signature_header(header: &str) -> VerificationResult<SignatureHeader> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => {
                timestamp = Some(value.parse::<i64>().map_err(|_| {
                    VerificationError::InvalidSignatureFormat {
                        reason: "timestamp must be a unix timestamp".to_string(),
                    }
                })?);
            }
            "v1" => {
                // Unknown schemes (v0) are ignored; malformed v1 entries never match
                if let Ok(bytes) = hex::decode(value) {
                    signatures.push(bytes);
                }
            }
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or_else(|| VerificationError::InvalidSignatureFormat {
        reason: "missing t= element".to_string(),
    })?;

    if signatures.is_empty() {
        return Err(VerificationError::InvalidSignatureFormat {
            reason: "missing v1 signature".to_string(),
        });
    }

    Ok(SignatureHeader {
        timestamp,
        signatures,
    })
}

/// Compute the hex `v1` signature Stripe would send for `payload` at `timestamp`.
pub fn compute_stripe_signature(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Verifies a Stripe webhook signature header against the raw payload.
///
/// `now` is the current unix time in seconds; timestamps further than
/// `tolerance_seconds` from it in either direction are rejected.
pub fn verify_stripe_signature(
    payload: &[u8],
    signature_header: &str,
    secret: &str,
    tolerance_seconds: u64,
    now: i64,
) -> VerificationResult<()> {
    debug!(
        body_size = payload.len(),
        tolerance_seconds, "Starting Stripe signature verification"
    );

    if secret.is_empty() {
        return Err(VerificationError::NotConfigured);
    }

    if signature_header.trim().is_empty() {
        return Err(VerificationError::MissingSignature {
            header: STRIPE_SIGNATURE_HEADER.to_string(),
        });
    }

    let parsed = parse_signature_header(signature_header)?;

    let time_diff = now.abs_diff(parsed.timestamp);
    if time_diff > tolerance_seconds {
        warn!(time_diff, tolerance_seconds, "Stripe webhook timestamp outside tolerance");
        if now > parsed.timestamp {
            return Err(VerificationError::TimestampTooOld {
                seconds: time_diff,
                max_seconds: tolerance_seconds,
            });
        }
        return Err(VerificationError::TimestampTooFuture {
            seconds: time_diff,
            max_seconds: tolerance_seconds,
        });
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| VerificationError::VerificationFailed)?;
    mac.update(parsed.timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    let expected = mac.finalize().into_bytes();
    let expected: &[u8] = expected.as_ref();

    let matched = parsed
        .signatures
        .iter()
        .any(|candidate| bool::from(subtle::ConstantTimeEq::ct_eq(expected, &candidate[..])));

    if matched {
        Ok(())
    } else {
        Err(VerificationError::VerificationFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";
    const PAYLOAD: &[u8] = br#"{"id":"evt_1","type":"invoice.payment_failed"}"#;

    fn header_for(timestamp: i64) -> String {
        format!(
            "t={},v1={}",
            timestamp,
            compute_stripe_signature(PAYLOAD, SECRET, timestamp)
        )
    }

    #[test]
    fn valid_signature_passes() {
        let now = 1_700_000_000;
        assert_eq!(
            verify_stripe_signature(PAYLOAD, &header_for(now), SECRET, 300, now),
            Ok(())
        );
    }

    #[test]
    fn any_matching_v1_entry_passes() {
        let now = 1_700_000_000;
        let header = format!(
            "t={},v1={},v1={}",
            now,
            "00".repeat(32),
            compute_stripe_signature(PAYLOAD, SECRET, now)
        );
        assert!(verify_stripe_signature(PAYLOAD, &header, SECRET, 300, now).is_ok());
    }

    #[test]
    fn tampered_payload_fails() {
        let now = 1_700_000_000;
        let result = verify_stripe_signature(
            br#"{"id":"evt_2"}"#,
            &header_for(now),
            SECRET,
            300,
            now,
        );
        assert_eq!(result, Err(VerificationError::VerificationFailed));
    }

    #[test]
    fn wrong_secret_fails() {
        let now = 1_700_000_000;
        let result = verify_stripe_signature(PAYLOAD, &header_for(now), "whsec_other", 300, now);
        assert_eq!(result, Err(VerificationError::VerificationFailed));
    }

    #[test]
    fn stale_and_future_timestamps_rejected() {
        let signed_at = 1_700_000_000;
        let header = header_for(signed_at);

        assert!(matches!(
            verify_stripe_signature(PAYLOAD, &header, SECRET, 300, signed_at + 301),
            Err(VerificationError::TimestampTooOld { seconds: 301, .. })
        ));
        assert!(matches!(
            verify_stripe_signature(PAYLOAD, &header, SECRET, 300, signed_at - 400),
            Err(VerificationError::TimestampTooFuture { seconds: 400, .. })
        ));
        assert!(verify_stripe_signature(PAYLOAD, &header, SECRET, 300, signed_at + 300).is_ok());
    }

    #[test]
    fn malformed_headers_rejected() {
        let now = 1_700_000_000;
        for header in ["v1=abcd", "t=abc,v1=abcd", &format!("t={}", now), ""] {
            let err = verify_stripe_signature(PAYLOAD, header, SECRET, 300, now).unwrap_err();
            assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn missing_secret_is_not_configured() {
        let now = 1_700_000_000;
        let err = verify_stripe_signature(PAYLOAD, &header_for(now), "", 300, now).unwrap_err();
        assert_eq!(err, VerificationError::NotConfigured);
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
