//! Time-based one-time-password second factor.
//!
//! RFC 6238 with SHA-256 derivation, 6-digit codes, and a 30-second
//! period. Verification tolerates one period of clock skew in either
//! direction. Codes inside that window are not tracked after use, so a
//! captured code stays redeemable for up to ~90 seconds; callers that
//! need anti-replay must record consumed codes per secret themselves.

use data_encoding::BASE32_NOPAD;
use hmac::{Hmac, Mac};
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::Sha256;
use thiserror::Error;
use url::Url;

type HmacSha256 = Hmac<Sha256>;

/// Code length in digits.
const DIGITS: u32 = 6;

/// Time-step length in seconds.
const PERIOD_SECS: i64 = 30;

/// Accepted skew, in steps, on either side of the current one.
const SKEW_STEPS: i64 = 1;

/// Secret length in bytes.
const SECRET_BYTES: usize = 20;

/// Rejected base32 secret encoding.
#[derive(Debug, Error)]
#[error("Invalid TOTP secret encoding")]
pub struct InvalidTotpSecret;

/// A per-identity TOTP secret.
///
/// Created once per user identity and persisted by an external store.
/// Regeneration is an explicit user action that invalidates the previous
/// secret; nothing here regenerates automatically.
#[derive(Clone, PartialEq, Eq)]
pub struct TotpSecret {
    bytes: Vec<u8>,
}

impl TotpSecret {
    /// Generate a fresh random secret.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = vec![0u8; SECRET_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Decode a secret from its base32 form.
    ///
    /// # Errors
    /// Returns an error if `encoded` is not unpadded RFC 4648 base32.
    pub fn from_base32(encoded: &str) -> Result<Self, InvalidTotpSecret> {
        let bytes = BASE32_NOPAD
            .decode(encoded.trim().to_ascii_uppercase().as_bytes())
            .map_err(|_| InvalidTotpSecret)?;
        if bytes.is_empty() {
            return Err(InvalidTotpSecret);
        }
        Ok(Self { bytes })
    }

    /// Base32 form, as entered into an authenticator app.
    #[must_use]
    pub fn to_base32(&self) -> String {
        BASE32_NOPAD.encode(&self.bytes)
    }

    /// Provisioning URI renderable as a scannable code.
    ///
    /// Standard otpauth shape: issuer and label in the path, then
    /// `secret`, `issuer`, `algorithm=SHA256`, `digits=6`, `period=30`.
    ///
    /// # Panics
    /// Panics if the otpauth URL skeleton fails to parse, which cannot
    /// happen.
    #[must_use]
    pub fn provisioning_uri(&self, issuer: &str, label: &str) -> String {
        let mut url = Url::parse("otpauth://totp/").expect("static otpauth skeleton parses");
        url.set_path(&format!("/{issuer}:{label}"));
        url.query_pairs_mut()
            .append_pair("secret", &self.to_base32())
            .append_pair("issuer", issuer)
            .append_pair("algorithm", "SHA256")
            .append_pair("digits", &DIGITS.to_string())
            .append_pair("period", &PERIOD_SECS.to_string());
        url.to_string()
    }

    /// The code an authenticator shows for the step containing `time`.
    #[must_use]
    pub fn code_at(&self, time: i64) -> String {
        let step = (time / PERIOD_SECS) as u64;

        let mut mac =
            HmacSha256::new_from_slice(&self.bytes).expect("HMAC accepts any key length");
        mac.update(&step.to_be_bytes());
        let digest = mac.finalize().into_bytes();

        // RFC 4226 dynamic truncation, applied to the SHA-256 digest.
        let offset = (digest[digest.len() - 1] & 0x0f) as usize;
        let binary = (u32::from(digest[offset] & 0x7f) << 24)
            | (u32::from(digest[offset + 1]) << 16)
            | (u32::from(digest[offset + 2]) << 8)
            | u32::from(digest[offset + 3]);

        let code = binary % 10u32.pow(DIGITS);
        format!("{code:0width$}", width = DIGITS as usize)
    }

    /// Check a submitted code against the current step and one adjacent
    /// step on either side.
    #[must_use]
    pub fn verify(&self, submitted: &str, now: i64) -> bool {
        let submitted = submitted.trim();
        if submitted.len() != DIGITS as usize || !submitted.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }

        (-SKEW_STEPS..=SKEW_STEPS)
            .any(|skew| self.code_at(now + skew * PERIOD_SECS) == submitted)
    }
}

impl std::fmt::Debug for TotpSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TotpSecret(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_secret() -> TotpSecret {
        TotpSecret::from_base32("GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ").unwrap()
    }

    #[test]
    fn base32_round_trip() {
        let secret = TotpSecret::generate();
        let decoded = TotpSecret::from_base32(&secret.to_base32()).unwrap();
        assert_eq!(secret, decoded);
    }

    #[test]
    fn lowercase_base32_is_accepted() {
        let secret = fixed_secret();
        let lower = secret.to_base32().to_ascii_lowercase();
        assert_eq!(TotpSecret::from_base32(&lower).unwrap(), secret);
    }

    #[test]
    fn invalid_base32_is_rejected() {
        assert!(TotpSecret::from_base32("not base32 !!").is_err());
        assert!(TotpSecret::from_base32("").is_err());
    }

    #[test]
    fn codes_are_six_digits_and_stable_within_a_step() {
        let secret = fixed_secret();
        let code = secret.code_at(1_700_000_010);

        assert_eq!(code.len(), 6);
        assert!(code.bytes().all(|b| b.is_ascii_digit()));
        // Same 30s step, same code.
        assert_eq!(secret.code_at(1_700_000_000), secret.code_at(1_700_000_029));
    }

    #[test]
    fn current_and_adjacent_steps_verify() {
        let secret = fixed_secret();
        let now = 1_700_000_015;

        assert!(secret.verify(&secret.code_at(now), now));
        assert!(secret.verify(&secret.code_at(now - PERIOD_SECS), now));
        assert!(secret.verify(&secret.code_at(now + PERIOD_SECS), now));
    }

    #[test]
    fn codes_two_steps_away_are_rejected() {
        let secret = fixed_secret();
        let now = 1_700_000_015;

        let stale = secret.code_at(now - 2 * PERIOD_SECS);
        let early = secret.code_at(now + 2 * PERIOD_SECS);
        // Guard against the rare collision where distant steps share a code.
        if stale != secret.code_at(now)
            && stale != secret.code_at(now - PERIOD_SECS)
            && stale != secret.code_at(now + PERIOD_SECS)
        {
            assert!(!secret.verify(&stale, now));
        }
        if early != secret.code_at(now)
            && early != secret.code_at(now - PERIOD_SECS)
            && early != secret.code_at(now + PERIOD_SECS)
        {
            assert!(!secret.verify(&early, now));
        }
    }

    #[test]
    fn malformed_codes_are_rejected() {
        let secret = fixed_secret();
        for bad in ["", "12345", "1234567", "12345a", "......"] {
            assert!(!secret.verify(bad, 1_700_000_015), "accepted {bad:?}");
        }
    }

    #[test]
    fn provisioning_uri_carries_standard_parameters() {
        let secret = fixed_secret();
        let uri = secret.provisioning_uri("DaemonLink", "alice@example.com");

        assert!(uri.starts_with("otpauth://totp/"));
        assert!(uri.contains("DaemonLink"));
        assert!(uri.contains(&format!("secret={}", secret.to_base32())));
        assert!(uri.contains("issuer=DaemonLink"));
        assert!(uri.contains("algorithm=SHA256"));
        assert!(uri.contains("digits=6"));
        assert!(uri.contains("period=30"));
    }

    #[test]
    fn different_secrets_produce_different_codes() {
        let a = TotpSecret::generate();
        let b = TotpSecret::generate();
        // Overwhelmingly likely with 6-digit codes; tolerate the 1-in-1e6
        // collision by checking two distinct steps.
        let now = 1_700_000_015;
        assert!(a.code_at(now) != b.code_at(now) || a.code_at(now + 30) != b.code_at(now + 30));
    }
}
