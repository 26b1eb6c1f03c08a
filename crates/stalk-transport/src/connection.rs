use std::fmt;
use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use crate::capability::{Generation, TubeClient};
use crate::config::{self, ConnectionConfig, TransportOptions};
use crate::envelope::{self, Headers};
use crate::error::{ConfigurationError, TransportError};

/// A message handed out by [`Connection::get`].
#[derive(Debug, Clone, PartialEq)]
pub struct ReceivedMessage {
    /// Job id as assigned by the server, in decimal.
    pub id: String,
    pub body: String,
    pub headers: Headers,
}

/// One client session bound to one tube.
///
/// Every operation takes `&mut self`: a connection belongs to a single
/// consumer or producer and is never shared. Failures are returned as they
/// happen; nothing is retried.
pub struct Connection {
    configuration: ConnectionConfig,
    generation: Generation,
    priority: u32,
    client: Box<dyn TubeClient>,
}

impl Connection {
    /// Build a connection for `dsn` on the client generation this build
    /// targets. No socket is opened until the first operation.
    pub fn from_dsn(dsn: &str, options: &TransportOptions) -> Result<Self, ConfigurationError> {
        Self::from_dsn_with(dsn, options, Generation::detect())
    }

    /// Build a connection for `dsn` on an explicit client generation.
    pub fn from_dsn_with(
        dsn: &str,
        options: &TransportOptions,
        generation: Generation,
    ) -> Result<Self, ConfigurationError> {
        let (configuration, endpoint) = config::resolve(dsn, options, generation.default_port())?;
        debug!(
            %endpoint,
            %generation,
            tube = %configuration.tube_name,
            timeout = configuration.timeout,
            ttr = configuration.ttr,
            "connection configured"
        );
        let client = generation.connect(&endpoint);
        Ok(Self::new(configuration, generation, client))
    }

    /// Build a connection over an existing client.
    pub fn new(
        configuration: ConnectionConfig,
        generation: Generation,
        client: Box<dyn TubeClient>,
    ) -> Self {
        Self {
            configuration,
            generation,
            priority: generation.default_priority(),
            client,
        }
    }

    pub fn configuration(&self) -> &ConnectionConfig {
        &self.configuration
    }

    pub fn tube(&self) -> &str {
        &self.configuration.tube_name
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Put a message on the tube and return its job id. The message becomes
    /// ready after `delay_ms` milliseconds.
    #[tracing::instrument(skip_all, fields(tube = %self.configuration.tube_name, delay_ms = delay_ms))]
    pub fn send<H: Serialize + ?Sized>(
        &mut self,
        body: &str,
        headers: &H,
        delay_ms: u64,
    ) -> Result<String, TransportError> {
        let data = envelope::encode(body, headers)?;
        let delay = Duration::from_millis(delay_ms);

        self.client.use_tube(&self.configuration.tube_name)?;
        let id = self.client.put(
            &data,
            self.priority,
            delay,
            self.configuration.ttr_duration(),
        )?;
        debug!(id, bytes = data.len(), "message sent");
        Ok(id.to_string())
    }

    /// Reserve the next ready message, waiting up to the configured timeout.
    /// `Ok(None)` when nothing became ready in time.
    #[tracing::instrument(skip_all, fields(tube = %self.configuration.tube_name))]
    pub fn get(&mut self) -> Result<Option<ReceivedMessage>, TransportError> {
        self.client.watch(&self.configuration.tube_name)?;
        let Some(job) = self
            .client
            .reserve_with_timeout(self.configuration.timeout_duration())?
        else {
            debug!(timeout = self.configuration.timeout, "no message ready");
            return Ok(None);
        };

        let (body, headers) = envelope::decode(job.id, &job.data)?;
        debug!(id = job.id, "message received");
        Ok(Some(ReceivedMessage {
            id: job.id.to_string(),
            body,
            headers,
        }))
    }

    /// Acknowledge a message: the job is deleted.
    #[tracing::instrument(skip_all, fields(tube = %self.configuration.tube_name, id = %id))]
    pub fn ack(&mut self, id: &str) -> Result<(), TransportError> {
        self.delete(id)?;
        debug!("message acknowledged");
        Ok(())
    }

    /// Reject a message. The job is deleted, not released, so a rejected
    /// message is never delivered again.
    #[tracing::instrument(skip_all, fields(tube = %self.configuration.tube_name, id = %id))]
    pub fn reject(&mut self, id: &str) -> Result<(), TransportError> {
        self.delete(id)?;
        debug!("message rejected");
        Ok(())
    }

    /// Number of ready jobs in the tube. Delayed and reserved jobs are not
    /// counted.
    #[tracing::instrument(skip_all, fields(tube = %self.configuration.tube_name))]
    pub fn message_count(&mut self) -> Result<u64, TransportError> {
        let stats = self.client.stats_tube(&self.configuration.tube_name)?;
        Ok(stats.current_jobs_ready)
    }

    fn delete(&mut self, id: &str) -> Result<(), TransportError> {
        if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
            return Err(TransportError::InvalidJobId {
                id: id.to_string(),
                source: None,
            });
        }
        let job = id
            .parse::<u64>()
            .map_err(|source| TransportError::InvalidJobId {
                id: id.to_string(),
                source: Some(source),
            })?;

        self.client.use_tube(&self.configuration.tube_name)?;
        self.client.delete(job)?;
        Ok(())
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("configuration", &self.configuration)
            .field("generation", &self.generation)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}
