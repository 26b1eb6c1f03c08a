use std::time::Duration;

use stalk_client::v4::Client;
use stalk_client::{ClientError, TubeStats};
use stalk_proto::whole_seconds;

use super::{ReservedJob, TubeClient, CONNECT_TIMEOUT};
use crate::config::Endpoint;

/// [`TubeClient`] over the v4 client. v4 leaves the connect timeout to the
/// caller and takes the reserve timeout in whole seconds.
#[derive(Debug)]
pub struct V4Binding {
    client: Client,
}

impl V4Binding {
    pub fn new(endpoint: &Endpoint) -> Self {
        Self {
            client: Client::create(&endpoint.host, endpoint.port, Some(CONNECT_TIMEOUT)),
        }
    }
}

impl TubeClient for V4Binding {
    fn use_tube(&mut self, tube: &str) -> Result<(), ClientError> {
        self.client.use_tube(tube)
    }

    fn watch(&mut self, tube: &str) -> Result<(), ClientError> {
        self.client.watch_only(tube)
    }

    fn put(
        &mut self,
        data: &[u8],
        priority: u32,
        delay: Duration,
        ttr: Duration,
    ) -> Result<u64, ClientError> {
        self.client.put(data, priority, delay, ttr)
    }

    fn reserve_with_timeout(&mut self, timeout: Duration) -> Result<Option<ReservedJob>, ClientError> {
        Ok(self
            .client
            .reserve_with_timeout(whole_seconds(timeout))?
            .map(|job| ReservedJob {
                id: job.id(),
                data: job.into_data(),
            }))
    }

    fn delete(&mut self, id: u64) -> Result<(), ClientError> {
        self.client.delete(id)
    }

    fn stats_tube(&mut self, tube: &str) -> Result<TubeStats, ClientError> {
        self.client.stats_tube(tube)
    }
}
