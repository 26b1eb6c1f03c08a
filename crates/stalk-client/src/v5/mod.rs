//! The v5 client API: publishing, subscribing and managing are separate
//! contracts, and tube names and job ids are value types.

mod client;
mod values;

use std::time::Duration;

pub use client::{Client, SocketFactory};
pub use values::{JobId, TubeName};

use crate::error::ClientError;
use crate::TubeStats;

/// A reserved job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: JobId,
    pub data: Vec<u8>,
}

/// Inserting jobs.
pub trait Publisher {
    const DEFAULT_PRIORITY: u32 = stalk_proto::DEFAULT_PRIORITY;
    const DEFAULT_DELAY: Duration = Duration::ZERO;
    const DEFAULT_TTR: Duration = Duration::from_secs(60);

    fn use_tube(&mut self, tube: &TubeName) -> Result<(), ClientError>;

    /// Insert a job into the used tube. `delay` and `ttr` travel as whole
    /// seconds, rounded up.
    fn put(
        &mut self,
        data: &[u8],
        priority: u32,
        delay: Duration,
        ttr: Duration,
    ) -> Result<JobId, ClientError>;
}

/// Reserving and finishing jobs.
pub trait Subscriber {
    fn watch(&mut self, tube: &TubeName) -> Result<u32, ClientError>;

    fn ignore(&mut self, tube: &TubeName) -> Result<u32, ClientError>;

    /// Watch `tube` and ignore every other tube.
    fn watch_only(&mut self, tube: &TubeName) -> Result<(), ClientError>;

    /// Wait at most `timeout` for a job. Sub-second timeouts round up.
    fn reserve_with_timeout(&mut self, timeout: Duration) -> Result<Option<Job>, ClientError>;

    fn delete(&mut self, job: &JobId) -> Result<(), ClientError>;
}

/// Server and tube inspection.
pub trait Manager {
    fn stats_tube(&mut self, tube: &TubeName) -> Result<TubeStats, ClientError>;
}
