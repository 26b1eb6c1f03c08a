//! Work-queue transport over a beanstalkd server.
//!
//! A [`Connection`] is built from a DSN such as
//! `beanstalkd://localhost:11300?tube_name=emails&timeout=5&ttr=120`, owns one
//! client session bound to one tube, and exposes `send`, `get`, `ack`,
//! `reject` and `message_count` to a message-dispatch loop.
//!
//! The client generation behind the connection is picked once, at
//! construction, through [`Generation`].

pub mod capability;
pub mod config;
mod connection;
mod envelope;
pub mod error;
pub mod telemetry;

pub use capability::{Generation, ReservedJob, TubeClient};
pub use config::{ConfigBuilder, ConnectionConfig, Endpoint, OptionSource, OptionValue, TransportOptions};
pub use connection::{Connection, ReceivedMessage};
pub use envelope::Headers;
pub use error::{ConfigurationError, TransportError};
