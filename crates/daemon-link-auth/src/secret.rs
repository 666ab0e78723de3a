//! Process-wide bearer signing secret.

use std::io;
use std::path::Path;

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use rand::RngCore;
use rand::rngs::OsRng;

/// Secret length in bytes.
const SECRET_BYTES: usize = 32;

/// The key that signs and validates bearer tokens.
///
/// Loaded once at process start and passed by reference to auth
/// operations; it is never mutated afterwards, so concurrent
/// verifications read it without locking. Once a persisted value exists
/// it is never regenerated silently - that would invalidate every
/// outstanding token.
#[derive(Clone)]
pub struct SigningSecret([u8; SECRET_BYTES]);

impl SigningSecret {
    /// Generate a fresh random secret without persisting it.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; SECRET_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Build a secret from raw bytes.
    #[must_use]
    pub fn from_bytes(bytes: [u8; SECRET_BYTES]) -> Self {
        Self(bytes)
    }

    /// Load the persisted secret at `path`, or generate and persist one
    /// if the file does not exist.
    ///
    /// An existing but unreadable/corrupt file is an error, not a trigger
    /// for regeneration.
    ///
    /// # Errors
    /// Returns an I/O error if the file cannot be read, decoded, or
    /// written.
    pub fn load_or_generate(path: &Path) -> io::Result<Self> {
        if path.exists() {
            let encoded = std::fs::read_to_string(path)?;
            let bytes = BASE64
                .decode(encoded.trim())
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            let bytes: [u8; SECRET_BYTES] = bytes.try_into().map_err(|_| {
                io::Error::new(io::ErrorKind::InvalidData, "signing secret has wrong length")
            })?;
            return Ok(Self(bytes));
        }

        let secret = Self::generate();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, BASE64.encode(secret.0))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }
        tracing::debug!(path = %path.display(), "Generated new signing secret");
        Ok(secret)
    }

    /// Raw key material for MAC construction.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SigningSecret(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_or_generate_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("signing-secret");

        let first = SigningSecret::load_or_generate(&path).unwrap();
        let second = SigningSecret::load_or_generate(&path).unwrap();

        assert_eq!(first.as_bytes(), second.as_bytes());
    }

    #[test]
    fn corrupt_file_is_an_error_not_a_regeneration() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("signing-secret");
        std::fs::write(&path, "not base64 at all!!!").unwrap();

        assert!(SigningSecret::load_or_generate(&path).is_err());
        // The corrupt file is left untouched for the operator to inspect.
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "not base64 at all!!!"
        );
    }

    #[test]
    fn generated_secrets_differ() {
        assert_ne!(
            SigningSecret::generate().as_bytes(),
            SigningSecret::generate().as_bytes()
        );
    }

    #[test]
    fn debug_does_not_leak_key_material() {
        let secret = SigningSecret::from_bytes([7u8; 32]);
        assert_eq!(format!("{secret:?}"), "SigningSecret(..)");
    }
}
