//! Session plumbing around the decoder.
//!
//! A decode session asks the external load service to publish a dataset
//! into named shared memory, maps that memory read-only, runs a decode
//! strategy over the bytes, unmaps, and finally asks the service to unload.
//! The column aggregations in [`aggregate`] are the downstream consumers
//! the entry points run inside that bracket.

#![warn(clippy::pedantic)]

#[cfg(not(unix))]
compile_error!("wisent-session needs POSIX shared memory");

pub mod aggregate;
pub mod config;
pub mod error;
pub mod remote;
pub mod session;
pub mod shm;

pub use aggregate::{Aggregate, sum_column_eager, sum_column_lazy};
pub use config::SessionConfig;
pub use error::SessionError;
pub use remote::{ControlPlane, HttpControlPlane};
pub use session::Session;
pub use shm::{PosixShm, RegionSource, SharedRegion};
