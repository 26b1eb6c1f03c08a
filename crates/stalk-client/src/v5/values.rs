use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use stalk_proto::{validate_tube_name, InvalidTubeName};

/// A tube name known to satisfy the server's naming rules.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TubeName(String);

impl TubeName {
    pub fn new(name: impl Into<String>) -> Result<Self, InvalidTubeName> {
        let name = name.into();
        validate_tube_name(&name)?;
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TubeName {
    fn default() -> Self {
        Self(crate::session::DEFAULT_TUBE.to_string())
    }
}

impl fmt::Display for TubeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TubeName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for TubeName {
    type Err = InvalidTubeName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Server-assigned job identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(u64);

impl JobId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for JobId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tube_name_validates() {
        assert_eq!(TubeName::new("emails").unwrap().as_str(), "emails");
        assert_eq!(TubeName::new("has space"), Err(InvalidTubeName::InvalidChar(' ')));
        assert_eq!("".parse::<TubeName>(), Err(InvalidTubeName::Empty));
        assert_eq!(TubeName::default().as_str(), "default");
    }

    #[test]
    fn job_id_parses_and_displays() {
        let id: JobId = "42".parse().unwrap();
        assert_eq!(id, JobId::new(42));
        assert_eq!(id.to_string(), "42");
        assert!("-1".parse::<JobId>().is_err());
        assert!("abc".parse::<JobId>().is_err());
    }
}
