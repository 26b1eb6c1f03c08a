//! The v4 client API: a single client type, tube names as `&str`, job ids as
//! plain `u64`.

use std::fmt;
use std::time::Duration;

use crate::error::ClientError;
use crate::session::Session;
use crate::TubeStats;

pub const DEFAULT_PORT: u16 = stalk_proto::DEFAULT_PORT;
pub const DEFAULT_PRIORITY: u32 = stalk_proto::DEFAULT_PRIORITY;
pub const DEFAULT_DELAY: Duration = Duration::ZERO;
pub const DEFAULT_TTR: Duration = Duration::from_secs(60);

/// A reserved job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    id: u64,
    data: Vec<u8>,
}

impl Job {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}

pub struct Client {
    session: Session,
}

impl Client {
    /// Create a client for `host:port`. No connection is made until the first
    /// command. `connect_timeout` of `None` waits for the OS default.
    pub fn create(host: &str, port: u16, connect_timeout: Option<Duration>) -> Self {
        Self {
            session: Session::new(host, port, connect_timeout),
        }
    }

    /// Select the tube subsequent `put` calls insert into.
    pub fn use_tube(&mut self, tube: &str) -> Result<(), ClientError> {
        self.session.use_tube(tube)
    }

    /// Add a tube to the watch list. Returns the number of watched tubes.
    pub fn watch(&mut self, tube: &str) -> Result<u32, ClientError> {
        self.session.watch(tube)
    }

    /// Make `tube` the only watched tube.
    pub fn watch_only(&mut self, tube: &str) -> Result<(), ClientError> {
        self.session.watch_only(tube)
    }

    /// Remove a tube from the watch list. Returns the number of watched tubes.
    pub fn ignore(&mut self, tube: &str) -> Result<u32, ClientError> {
        self.session.ignore(tube)
    }

    /// Insert a job into the used tube and return its id.
    ///
    /// `delay` and `ttr` travel as whole seconds, rounded up.
    pub fn put(
        &mut self,
        data: &[u8],
        priority: u32,
        delay: Duration,
        ttr: Duration,
    ) -> Result<u64, ClientError> {
        self.session.put(data, priority, delay, ttr)
    }

    /// Reserve a job from the watched tubes, waiting at most `timeout`
    /// seconds. `Ok(None)` when nothing became ready in time.
    pub fn reserve_with_timeout(&mut self, timeout: u32) -> Result<Option<Job>, ClientError> {
        Ok(self
            .session
            .reserve_with_timeout(timeout)?
            .map(|raw| Job {
                id: raw.id,
                data: raw.data,
            }))
    }

    pub fn delete(&mut self, id: u64) -> Result<(), ClientError> {
        self.session.delete(id)
    }

    pub fn stats_tube(&mut self, tube: &str) -> Result<TubeStats, ClientError> {
        self.session.stats_tube(tube)
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("addr", &self.session.addr())
            .finish_non_exhaustive()
    }
}
