//! Codec for the beanstalkd text protocol.
//!
//! Requests and responses are CRLF-terminated ASCII lines; `put`, `RESERVED`
//! and `OK` are followed by a data block of the announced length plus CRLF.
//! Both directions are covered so the same codec backs clients and the
//! in-process test server.

pub mod command;
pub mod error;
pub mod response;
pub mod stats;
pub mod tube;
mod wire;

pub use command::{whole_seconds, Command};
pub use error::ProtocolError;
pub use response::Response;
pub use stats::TubeStats;
pub use tube::{validate_tube_name, InvalidTubeName, MAX_TUBE_NAME_LEN};

/// Port a beanstalkd server listens on unless told otherwise.
pub const DEFAULT_PORT: u16 = 11300;

/// Priority used by clients that do not pick one. Lower values are more urgent.
pub const DEFAULT_PRIORITY: u32 = 1024;

/// Longest request or response line, excluding the trailing CRLF.
pub const MAX_LINE_LEN: usize = 222;

/// Default `max-job-size` of a beanstalkd server, in bytes.
pub const DEFAULT_MAX_JOB_SIZE: usize = 65_535;
