use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// Body of a `stats-tube` reply.
///
/// Fields missing from the document default to zero, so older servers that
/// report fewer counters still parse.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct TubeStats {
    pub name: String,
    pub current_jobs_urgent: u64,
    pub current_jobs_ready: u64,
    pub current_jobs_reserved: u64,
    pub current_jobs_delayed: u64,
    pub current_jobs_buried: u64,
    pub total_jobs: u64,
    pub current_using: u64,
    pub current_waiting: u64,
    pub current_watching: u64,
    pub pause: u64,
    pub cmd_delete: u64,
    pub cmd_pause_tube: u64,
    pub pause_time_left: u64,
}

impl TubeStats {
    pub fn parse(document: &[u8]) -> Result<Self, ProtocolError> {
        Ok(serde_yaml::from_slice(document)?)
    }

    /// Render the document the way beanstalkd does, with a leading `---`.
    pub fn to_yaml(&self) -> Result<Vec<u8>, ProtocolError> {
        let body = serde_yaml::to_string(self)?;
        let body = body.strip_prefix("---\n").unwrap_or(&body);
        Ok(format!("---\n{body}").into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BEANSTALKD_OUTPUT: &str = "---\n\
name: emails\n\
current-jobs-urgent: 0\n\
current-jobs-ready: 3\n\
current-jobs-reserved: 1\n\
current-jobs-delayed: 2\n\
current-jobs-buried: 0\n\
total-jobs: 9\n\
current-using: 1\n\
current-waiting: 0\n\
current-watching: 1\n\
pause: 0\n\
cmd-delete: 3\n\
cmd-pause-tube: 0\n\
pause-time-left: 0\n";

    #[test]
    fn parses_server_document() {
        let stats = TubeStats::parse(BEANSTALKD_OUTPUT.as_bytes()).unwrap();
        assert_eq!(stats.name, "emails");
        assert_eq!(stats.current_jobs_ready, 3);
        assert_eq!(stats.current_jobs_reserved, 1);
        assert_eq!(stats.current_jobs_delayed, 2);
        assert_eq!(stats.total_jobs, 9);
        assert_eq!(stats.cmd_delete, 3);
    }

    #[test]
    fn missing_counters_default_to_zero() {
        let stats = TubeStats::parse(b"---\nname: default\ncurrent-jobs-ready: 1\n").unwrap();
        assert_eq!(stats.current_jobs_ready, 1);
        assert_eq!(stats.current_jobs_buried, 0);
    }

    #[test]
    fn numeric_tube_name_stays_a_string() {
        let stats = TubeStats {
            name: "2024".to_string(),
            current_jobs_ready: 5,
            ..TubeStats::default()
        };
        let yaml = stats.to_yaml().unwrap();
        assert!(yaml.starts_with(b"---\n"));
        assert_eq!(TubeStats::parse(&yaml).unwrap(), stats);
    }

    #[test]
    fn rejects_non_mapping_document() {
        assert!(matches!(
            TubeStats::parse(b"- just\n- a list\n"),
            Err(ProtocolError::Stats(_))
        ));
    }
}
