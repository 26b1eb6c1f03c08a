use std::fmt;
use std::time::Duration;

use stalk_proto::whole_seconds;

use super::{Job, JobId, Manager, Publisher, Subscriber, TubeName};
use crate::error::ClientError;
use crate::session::Session;
use crate::TubeStats;

/// Where and how to open the client's socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketFactory {
    host: String,
    port: u16,
    connect_timeout: Duration,
}

impl SocketFactory {
    pub const DEFAULT_PORT: u16 = stalk_proto::DEFAULT_PORT;
    pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            connect_timeout: Self::DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

/// Client implementing all three v5 contracts over one session.
pub struct Client {
    session: Session,
}

impl Client {
    /// No connection is made until the first command.
    pub fn new(factory: SocketFactory) -> Self {
        Self {
            session: Session::new(&factory.host, factory.port, Some(factory.connect_timeout)),
        }
    }
}

impl Publisher for Client {
    fn use_tube(&mut self, tube: &TubeName) -> Result<(), ClientError> {
        self.session.use_tube(tube.as_str())
    }

    fn put(
        &mut self,
        data: &[u8],
        priority: u32,
        delay: Duration,
        ttr: Duration,
    ) -> Result<JobId, ClientError> {
        self.session.put(data, priority, delay, ttr).map(JobId::new)
    }
}

impl Subscriber for Client {
    fn watch(&mut self, tube: &TubeName) -> Result<u32, ClientError> {
        self.session.watch(tube.as_str())
    }

    fn ignore(&mut self, tube: &TubeName) -> Result<u32, ClientError> {
        self.session.ignore(tube.as_str())
    }

    fn watch_only(&mut self, tube: &TubeName) -> Result<(), ClientError> {
        self.session.watch_only(tube.as_str())
    }

    fn reserve_with_timeout(&mut self, timeout: Duration) -> Result<Option<Job>, ClientError> {
        Ok(self
            .session
            .reserve_with_timeout(whole_seconds(timeout))?
            .map(|raw| Job {
                id: JobId::new(raw.id),
                data: raw.data,
            }))
    }

    fn delete(&mut self, job: &JobId) -> Result<(), ClientError> {
        self.session.delete(job.get())
    }
}

impl Manager for Client {
    fn stats_tube(&mut self, tube: &TubeName) -> Result<TubeStats, ClientError> {
        self.session.stats_tube(tube.as_str())
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("addr", &self.session.addr())
            .finish_non_exhaustive()
    }
}
