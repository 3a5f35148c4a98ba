#![no_std]
#![forbid(unsafe_code)]

//! # Looper MQ
//!
//! The message machinery of the Looper framework: a fixed pool of message
//! slots, a delivery queue ordered by due time, handlers that post into it,
//! and the dispatch loop that drains it.
//!
//! Everything shared lives in one [`MsgQueue`]: the context object holding
//! the slot arena, both lists threaded through it, and the tick source.
//! Producers (including interrupt handlers) reach it through [`Handler`];
//! the main loop drains it through [`Looper`]. All pool and queue mutation
//! happens inside a critical section; handler callbacks run with no
//! critical section held.

mod list;
mod pool;

pub mod handler;
pub mod looper;
pub mod queue;

pub use handler::*;
pub use looper::*;
pub use queue::*;

pub use pool::{PoolStats, SlotId};

/// Pool capacity used when the `MsgQueue` capacity parameter is left to its
/// default (the original firmware's `QUEUE_MAX_LEN`)
pub const DEFAULT_POOL_CAPACITY: usize = 20;
