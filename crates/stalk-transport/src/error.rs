use stalk_client::ClientError;

use crate::config::OptionSource;

/// Invalid DSN or options. Raised while constructing a connection, never by
/// an operation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("the given DSN is invalid: {0}")]
    InvalidDsn(#[from] url::ParseError),

    #[error("the given DSN has no host")]
    MissingHost,

    #[error(
        "unknown option found in {origin}: [{}]. Allowed options are [{}]",
        .keys.join(", "),
        .allowed.join(", ")
    )]
    UnknownOptions {
        origin: OptionSource,
        keys: Vec<String>,
        allowed: &'static [&'static str],
    },

    #[error("invalid value {value:?} for option {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Failure of a single transport operation. The caller owns retry policy.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("failed to encode message envelope: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("message headers must serialize to a map, got {kind}")]
    InvalidHeaders { kind: &'static str },

    #[error("job {id} does not hold a valid message envelope: {source}")]
    Decode {
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid job id {id:?}: expected a decimal job number")]
    InvalidJobId {
        id: String,
        #[source]
        source: Option<std::num::ParseIntError>,
    },

    #[error(transparent)]
    Client(#[from] ClientError),
}
