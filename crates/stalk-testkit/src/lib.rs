//! Test support: an in-memory server speaking the subset of the beanstalkd
//! protocol the clients use, on a random loopback port.

mod server;
mod state;

pub use server::TestServer;
pub use state::{JobStatus, PutRecord};
