use std::time::Duration;

use stalk_client::v5::{Client, JobId, Manager, Publisher, SocketFactory, Subscriber, TubeName};
use stalk_client::{ClientError, TubeStats};

use super::{ReservedJob, TubeClient};
use crate::config::Endpoint;

/// [`TubeClient`] over the v5 client. The socket factory brings its own
/// connect timeout; tube names are validated into [`TubeName`] on every call.
#[derive(Debug)]
pub struct V5Binding {
    client: Client,
}

impl V5Binding {
    pub fn new(endpoint: &Endpoint) -> Self {
        Self {
            client: Client::new(SocketFactory::new(endpoint.host.clone(), endpoint.port)),
        }
    }
}

fn tube_name(tube: &str) -> Result<TubeName, ClientError> {
    TubeName::new(tube).map_err(|e| ClientError::InvalidArgument(e.to_string()))
}

impl TubeClient for V5Binding {
    fn use_tube(&mut self, tube: &str) -> Result<(), ClientError> {
        self.client.use_tube(&tube_name(tube)?)
    }

    fn watch(&mut self, tube: &str) -> Result<(), ClientError> {
        self.client.watch_only(&tube_name(tube)?)
    }

    fn put(
        &mut self,
        data: &[u8],
        priority: u32,
        delay: Duration,
        ttr: Duration,
    ) -> Result<u64, ClientError> {
        Publisher::put(&mut self.client, data, priority, delay, ttr).map(|id| id.get())
    }

    fn reserve_with_timeout(&mut self, timeout: Duration) -> Result<Option<ReservedJob>, ClientError> {
        Ok(self.client.reserve_with_timeout(timeout)?.map(|job| ReservedJob {
            id: job.id.get(),
            data: job.data,
        }))
    }

    fn delete(&mut self, id: u64) -> Result<(), ClientError> {
        self.client.delete(&JobId::new(id))
    }

    fn stats_tube(&mut self, tube: &str) -> Result<TubeStats, ClientError> {
        self.client.stats_tube(&tube_name(tube)?)
    }
}
