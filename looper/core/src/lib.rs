#![no_std]
#![forbid(unsafe_code)]

//! # Looper Core
//!
//! Core types for the Looper message framework: message records and tags,
//! wrap-aware tick instants, and the tick-source abstraction. The queue,
//! handler, and dispatcher machinery lives in `looper-mq`; this crate is the
//! vocabulary they share.

#[cfg(feature = "std")]
extern crate std;

use core::fmt;

pub mod message;
pub mod time;

pub use message::*;
pub use time::*;

/// Framework version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Result type used throughout the Looper framework
pub type Result<T> = core::result::Result<T, Error>;

/// Error types for Looper framework operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Message pool has no free slot
    PoolExhausted,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::PoolExhausted => write!(f, "Message pool has no free slot"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Error::PoolExhausted => defmt::write!(fmt, "PoolExhausted"),
        }
    }
}
