//! Authentication for the client/daemon relationship.
//!
//! Two mechanisms, both independent of everything else in the workspace:
//! - `TokenAuthority` - HMAC-SHA256 bearer tokens signed with a
//!   process-wide `SigningSecret` that is loaded (or generated once and
//!   persisted) at startup
//! - TOTP - an optional time-based second factor with standard otpauth
//!   provisioning

pub mod bearer;
pub mod secret;
pub mod totp;

pub use bearer::{AuthError, BearerClaims, TokenAuthority};
pub use secret::SigningSecret;
pub use totp::TotpSecret;
