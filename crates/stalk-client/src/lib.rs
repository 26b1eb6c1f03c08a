//! Blocking client for beanstalkd servers.
//!
//! Two API generations ship side by side:
//!
//! - [`v4`]: one [`v4::Client`] with tube names as `&str` and job ids as
//!   `u64`; defaults are module constants and the caller supplies every
//!   connection setting.
//! - [`v5`]: [`v5::Client`] implements the split [`v5::Publisher`],
//!   [`v5::Subscriber`] and [`v5::Manager`] contracts over the validated
//!   [`v5::TubeName`] and [`v5::JobId`] value types, and
//!   [`v5::SocketFactory`] fills in its own connection defaults.
//!
//! Both open their socket lazily on the first command, so constructing a
//! client never performs I/O.

mod error;
mod session;
pub mod v4;
pub mod v5;

pub use error::ClientError;
pub use stalk_proto::TubeStats;
