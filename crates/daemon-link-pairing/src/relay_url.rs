//! Relay WebSocket URL construction.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use url::Url;

/// Relay URL failure.
#[derive(Debug, Error)]
pub enum RelayUrlError {
    #[error("Unsupported relay protocol version `{0}`")]
    UnsupportedVersion(String),
    #[error("Relay role `client` requires a client session key")]
    MissingClientSessionKey,
    #[error("Invalid relay endpoint `{endpoint}`: {source}")]
    InvalidEndpoint {
        endpoint: String,
        #[source]
        source: url::ParseError,
    },
}

/// Protocol version negotiated with the relay.
///
/// Only versions 1 and 2 exist; every other input is rejected outright
/// rather than clamped or coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RelayProtocolVersion {
    V1,
    #[default]
    V2,
}

impl RelayProtocolVersion {
    /// The version used when a caller does not pin one.
    pub const CURRENT: Self = Self::V2;

    /// Normalize a loosely-typed version value (JSON number or string).
    ///
    /// # Errors
    /// Returns [`RelayUrlError::UnsupportedVersion`] for anything but
    /// `1`, `"1"`, `2`, or `"2"`.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, RelayUrlError> {
        match value {
            serde_json::Value::Number(n) => n
                .as_u64()
                .ok_or_else(|| RelayUrlError::UnsupportedVersion(value.to_string()))
                .and_then(Self::try_from),
            serde_json::Value::String(s) => s.parse(),
            other => Err(RelayUrlError::UnsupportedVersion(other.to_string())),
        }
    }

    /// Wire form of the version, as it appears in the `v` parameter.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::V1 => "1",
            Self::V2 => "2",
        }
    }
}

impl fmt::Display for RelayProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelayProtocolVersion {
    type Err = RelayUrlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1" => Ok(Self::V1),
            "2" => Ok(Self::V2),
            other => Err(RelayUrlError::UnsupportedVersion(other.to_string())),
        }
    }
}

impl TryFrom<u64> for RelayProtocolVersion {
    type Error = RelayUrlError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::V1),
            2 => Ok(Self::V2),
            other => Err(RelayUrlError::UnsupportedVersion(other.to_string())),
        }
    }
}

/// Which side of a relay session a connection acts as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayRole {
    Client,
    Server,
}

impl RelayRole {
    /// Wire form of the role, as it appears in the `role` parameter.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Server => "server",
        }
    }
}

impl fmt::Display for RelayRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs for one relay connection attempt. Never persisted.
#[derive(Debug, Clone)]
pub struct RelayConnectionParams {
    /// Relay host, with or without a scheme. `wss://` is assumed when
    /// none is given.
    pub endpoint: String,
    /// Relay session id, shared out of band between daemon and relay.
    pub server_id: String,
    /// Side this connection takes.
    pub role: RelayRole,
    /// Protocol version; [`RelayProtocolVersion::CURRENT`] when `None`.
    pub version: Option<RelayProtocolVersion>,
    /// Session key the relay uses to route server frames back to this
    /// client. Required when `role` is [`RelayRole::Client`].
    pub client_session_key: Option<String>,
}

/// Build the relay-reachable WebSocket address for `params`.
///
/// Query parameters are explicit and ordered (`v`, `clientId`,
/// `serverId`, `role`) so built URLs are reproducible byte for byte.
///
/// # Errors
/// Fails when the endpoint does not parse as a URL or when a client
/// connection is missing its session key.
pub fn build_relay_url(params: &RelayConnectionParams) -> Result<String, RelayUrlError> {
    let version = params.version.unwrap_or(RelayProtocolVersion::CURRENT);

    let client_session_key = match params.role {
        RelayRole::Client => Some(
            params
                .client_session_key
                .as_deref()
                .filter(|k| !k.is_empty())
                .ok_or(RelayUrlError::MissingClientSessionKey)?,
        ),
        RelayRole::Server => None,
    };

    let base = if params.endpoint.contains("://") {
        params.endpoint.trim_end_matches('/').to_string()
    } else {
        format!("wss://{}", params.endpoint.trim_end_matches('/'))
    };
    // Validation only. The final URL is assembled by hand so the
    // endpoint survives byte for byte (Url would elide default ports).
    Url::parse(&base).map_err(|source| RelayUrlError::InvalidEndpoint {
        endpoint: params.endpoint.clone(),
        source,
    })?;

    let mut query = url::form_urlencoded::Serializer::new(String::new());
    query.append_pair("v", version.as_str());
    if let Some(key) = client_session_key {
        query.append_pair("clientId", key);
    }
    query.append_pair("serverId", &params.server_id);
    query.append_pair("role", params.role.as_str());

    Ok(format!("{base}/?{}", query.finish()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_params() -> RelayConnectionParams {
        RelayConnectionParams {
            endpoint: "relay.x:443".to_string(),
            server_id: "srv1".to_string(),
            role: RelayRole::Client,
            version: None,
            client_session_key: Some("csk1".to_string()),
        }
    }

    #[test]
    fn client_url_defaults_to_v2_with_ordered_query() {
        let url = build_relay_url(&client_params()).unwrap();
        assert_eq!(url, "wss://relay.x:443/?v=2&clientId=csk1&serverId=srv1&role=client");
    }

    #[test]
    fn server_url_omits_client_id() {
        let params = RelayConnectionParams {
            endpoint: "relay.x:443".to_string(),
            server_id: "srv1".to_string(),
            role: RelayRole::Server,
            version: Some(RelayProtocolVersion::V1),
            client_session_key: None,
        };
        let url = build_relay_url(&params).unwrap();
        assert_eq!(url, "wss://relay.x:443/?v=1&serverId=srv1&role=server");
    }

    #[test]
    fn explicit_scheme_is_preserved() {
        let mut params = client_params();
        params.endpoint = "ws://localhost:8787".to_string();
        let url = build_relay_url(&params).unwrap();
        assert!(url.starts_with("ws://localhost:8787/?v=2"));
    }

    #[test]
    fn client_role_requires_session_key() {
        let mut params = client_params();
        params.client_session_key = None;
        assert!(matches!(
            build_relay_url(&params),
            Err(RelayUrlError::MissingClientSessionKey)
        ));

        params.client_session_key = Some(String::new());
        assert!(matches!(
            build_relay_url(&params),
            Err(RelayUrlError::MissingClientSessionKey)
        ));
    }

    #[test]
    fn query_values_are_escaped() {
        let mut params = client_params();
        params.server_id = "srv 1&x".to_string();
        let url = build_relay_url(&params).unwrap();
        assert!(url.contains("serverId=srv+1%26x"));
    }

    #[test]
    fn version_normalization_is_total_over_supported_forms() {
        use serde_json::json;

        assert_eq!(
            RelayProtocolVersion::from_value(&json!(1)).unwrap(),
            RelayProtocolVersion::V1
        );
        assert_eq!(
            RelayProtocolVersion::from_value(&json!("1")).unwrap(),
            RelayProtocolVersion::V1
        );
        assert_eq!(
            RelayProtocolVersion::from_value(&json!(2)).unwrap(),
            RelayProtocolVersion::V2
        );
        assert_eq!(
            RelayProtocolVersion::from_value(&json!("2")).unwrap(),
            RelayProtocolVersion::V2
        );
    }

    #[test]
    fn version_normalization_rejects_everything_else() {
        use serde_json::json;

        for value in [json!("3"), json!(0), json!("v2"), json!(-1), json!(2.5), json!(null)] {
            assert!(
                RelayProtocolVersion::from_value(&value).is_err(),
                "accepted {value}"
            );
        }
    }

    #[test]
    fn invalid_endpoint_is_reported() {
        let mut params = client_params();
        params.endpoint = "wss://".to_string();
        assert!(matches!(
            build_relay_url(&params),
            Err(RelayUrlError::InvalidEndpoint { .. })
        ));
    }
}
