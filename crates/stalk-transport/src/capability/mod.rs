//! The operations a connection needs from a queue client, and the two
//! client generations that provide them.

mod v4;
mod v5;

use std::fmt;
use std::time::Duration;

use stalk_client::{ClientError, TubeStats};

use crate::config::Endpoint;

pub use v4::V4Binding;
pub use v5::V5Binding;

/// Connect timeout handed to the v4 client, which has no default of its own.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// A job handed out by a reservation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservedJob {
    pub id: u64,
    pub data: Vec<u8>,
}

/// Client operations a [`Connection`](crate::Connection) is written against.
pub trait TubeClient: Send {
    /// Select the tube `put` inserts into.
    fn use_tube(&mut self, tube: &str) -> Result<(), ClientError>;

    /// Make `tube` the only tube reservations draw from.
    fn watch(&mut self, tube: &str) -> Result<(), ClientError>;

    /// Insert a job into the used tube and return its id. The binding decides
    /// how `delay` and `ttr` are rounded on the wire.
    fn put(
        &mut self,
        data: &[u8],
        priority: u32,
        delay: Duration,
        ttr: Duration,
    ) -> Result<u64, ClientError>;

    /// Reserve from the watched tube, waiting at most `timeout`.
    fn reserve_with_timeout(&mut self, timeout: Duration) -> Result<Option<ReservedJob>, ClientError>;

    fn delete(&mut self, id: u64) -> Result<(), ClientError>;

    fn stats_tube(&mut self, tube: &str) -> Result<TubeStats, ClientError>;
}

/// Client library generation. Chosen once, when a connection is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Generation {
    V4,
    V5,
}

impl Generation {
    pub const ALL: [Generation; 2] = [Generation::V4, Generation::V5];

    /// The generation this build targets: v4 with the `legacy-client`
    /// feature, v5 otherwise.
    pub fn detect() -> Self {
        if cfg!(feature = "legacy-client") {
            Generation::V4
        } else {
            Generation::V5
        }
    }

    pub fn default_port(self) -> u16 {
        match self {
            Generation::V4 => stalk_client::v4::DEFAULT_PORT,
            Generation::V5 => stalk_client::v5::SocketFactory::DEFAULT_PORT,
        }
    }

    pub fn default_priority(self) -> u32 {
        use stalk_client::v5::Publisher;

        match self {
            Generation::V4 => stalk_client::v4::DEFAULT_PRIORITY,
            Generation::V5 => <stalk_client::v5::Client as Publisher>::DEFAULT_PRIORITY,
        }
    }

    /// Build a client for `endpoint`. No I/O happens until the first call.
    pub fn connect(self, endpoint: &Endpoint) -> Box<dyn TubeClient> {
        match self {
            Generation::V4 => Box::new(V4Binding::new(endpoint)),
            Generation::V5 => Box::new(V5Binding::new(endpoint)),
        }
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Generation::V4 => f.write_str("v4"),
            Generation::V5 => f.write_str("v5"),
        }
    }
}
