//! DSN and option resolution.
//!
//! Explicit options take precedence over DSN query parameters, which take
//! precedence over defaults. Each source is checked against the allowed key
//! set on its own before anything is merged.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ConfigurationError;

pub const TUBE_NAME: &str = "tube_name";
pub const TIMEOUT: &str = "timeout";
pub const TTR: &str = "ttr";

/// Every key a DSN query or the explicit options may carry.
pub const ALLOWED_KEYS: &[&str] = &[TUBE_NAME, TIMEOUT, TTR];

/// Resolved, immutable connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Tube all operations target.
    pub tube_name: String,
    /// Seconds a reservation waits for a job; 0 returns at once.
    pub timeout: u32,
    /// Seconds a reserved job may stay unacknowledged before the server
    /// makes it ready again.
    pub ttr: u32,
}

impl ConnectionConfig {
    pub const DEFAULT_TUBE_NAME: &'static str = "default";
    pub const DEFAULT_TIMEOUT: u32 = 0;
    pub const DEFAULT_TTR: u32 = 90;

    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.timeout))
    }

    pub fn ttr_duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.ttr))
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        ConfigBuilder::default().build()
    }
}

/// Host and port of the queue server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Where a set of key/value pairs came from, for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionSource {
    Options,
    Dsn,
}

impl fmt::Display for OptionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionSource::Options => f.write_str("options"),
            OptionSource::Dsn => f.write_str("DSN"),
        }
    }
}

/// An explicit option value. Integers and text are both accepted; text is
/// parsed where a number is expected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Integer(i64),
    Text(String),
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Integer(value) => write!(f, "{value}"),
            OptionValue::Text(value) => f.write_str(value),
        }
    }
}

impl From<i64> for OptionValue {
    fn from(value: i64) -> Self {
        OptionValue::Integer(value)
    }
}

impl From<u32> for OptionValue {
    fn from(value: u32) -> Self {
        OptionValue::Integer(i64::from(value))
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        OptionValue::Text(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        OptionValue::Text(value)
    }
}

/// Explicit options passed next to the DSN. Keys are not checked until the
/// options are resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransportOptions(BTreeMap<String, OptionValue>);

impl TransportOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<OptionValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value))
    }
}

impl<K: Into<String>, V: Into<OptionValue>> FromIterator<(K, V)> for TransportOptions {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

/// One layer of settings. Unset fields fall through to the next layer in
/// [`ConfigBuilder::or`], then to the defaults in [`ConfigBuilder::build`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigBuilder {
    tube_name: Option<String>,
    timeout: Option<u32>,
    ttr: Option<u32>,
}

impl ConfigBuilder {
    /// Build a layer from raw pairs. Unknown keys are collected and rejected
    /// together before any value is looked at; later duplicates win.
    pub fn from_pairs<K, I>(origin: OptionSource, pairs: I) -> Result<Self, ConfigurationError>
    where
        K: AsRef<str>,
        I: IntoIterator<Item = (K, OptionValue)>,
    {
        let pairs: Vec<(K, OptionValue)> = pairs.into_iter().collect();

        let mut unknown: Vec<String> = Vec::new();
        for (key, _) in &pairs {
            let key = key.as_ref();
            if !ALLOWED_KEYS.contains(&key) && !unknown.iter().any(|k| k == key) {
                unknown.push(key.to_string());
            }
        }
        if !unknown.is_empty() {
            return Err(ConfigurationError::UnknownOptions {
                origin,
                keys: unknown,
                allowed: ALLOWED_KEYS,
            });
        }

        let mut layer = Self::default();
        for (key, value) in pairs {
            match key.as_ref() {
                TUBE_NAME => layer.tube_name = Some(parse_tube_name(&value)?),
                TIMEOUT => layer.timeout = Some(parse_seconds(TIMEOUT, &value)?),
                TTR => layer.ttr = Some(parse_seconds(TTR, &value)?),
                _ => {}
            }
        }
        Ok(layer)
    }

    /// Set the tube, checking it against the protocol naming rules.
    pub fn tube_name(mut self, tube_name: impl Into<String>) -> Result<Self, ConfigurationError> {
        let tube_name = tube_name.into();
        stalk_proto::validate_tube_name(&tube_name).map_err(|e| ConfigurationError::InvalidValue {
            key: TUBE_NAME,
            value: tube_name.clone(),
            reason: e.to_string(),
        })?;
        self.tube_name = Some(tube_name);
        Ok(self)
    }

    pub fn timeout(mut self, seconds: u32) -> Self {
        self.timeout = Some(seconds);
        self
    }

    pub fn ttr(mut self, seconds: u32) -> Self {
        self.ttr = Some(seconds);
        self
    }

    /// Fill fields unset in `self` from `lower`.
    pub fn or(self, lower: ConfigBuilder) -> Self {
        Self {
            tube_name: self.tube_name.or(lower.tube_name),
            timeout: self.timeout.or(lower.timeout),
            ttr: self.ttr.or(lower.ttr),
        }
    }

    /// Apply defaults to whatever is still unset.
    pub fn build(self) -> ConnectionConfig {
        ConnectionConfig {
            tube_name: self
                .tube_name
                .unwrap_or_else(|| ConnectionConfig::DEFAULT_TUBE_NAME.to_string()),
            timeout: self.timeout.unwrap_or(ConnectionConfig::DEFAULT_TIMEOUT),
            ttr: self.ttr.unwrap_or(ConnectionConfig::DEFAULT_TTR),
        }
    }
}

/// Resolve a DSN and explicit options into settings and an endpoint.
/// `default_port` applies when the DSN names none. Performs no I/O.
pub fn resolve(
    dsn: &str,
    options: &TransportOptions,
    default_port: u16,
) -> Result<(ConnectionConfig, Endpoint), ConfigurationError> {
    let url = Url::parse(dsn)?;
    let host = url
        .host_str()
        .filter(|host| !host.is_empty())
        .ok_or(ConfigurationError::MissingHost)?;
    let endpoint = Endpoint {
        host: host.to_string(),
        port: url.port().unwrap_or(default_port),
    };

    let explicit = ConfigBuilder::from_pairs(
        OptionSource::Options,
        options.iter().map(|(key, value)| (key, value.clone())),
    )?;
    let query = ConfigBuilder::from_pairs(
        OptionSource::Dsn,
        url.query_pairs()
            .map(|(key, value)| (key.into_owned(), OptionValue::Text(value.into_owned()))),
    )?;

    Ok((explicit.or(query).build(), endpoint))
}

fn parse_tube_name(value: &OptionValue) -> Result<String, ConfigurationError> {
    let name = value.to_string();
    stalk_proto::validate_tube_name(&name).map_err(|e| ConfigurationError::InvalidValue {
        key: TUBE_NAME,
        value: name.clone(),
        reason: e.to_string(),
    })?;
    Ok(name)
}

fn parse_seconds(key: &'static str, value: &OptionValue) -> Result<u32, ConfigurationError> {
    let parsed = match value {
        OptionValue::Integer(seconds) => u32::try_from(*seconds).ok(),
        OptionValue::Text(text) => text.trim().parse::<u32>().ok(),
    };
    parsed.ok_or_else(|| ConfigurationError::InvalidValue {
        key,
        value: value.to_string(),
        reason: format!("expected whole seconds between 0 and {}", u32::MAX),
    })
}
