//! Message records and tags

use core::fmt;

use crate::time::Instant;

/// Tag discriminating message kinds within a handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct What(pub u16);

impl What {
    /// Tag reserved as "no message"
    pub const NONE: What = What(0);
    /// First tag value free for application messages
    pub const USER: What = What(1);

    /// Create a new tag from a raw value
    pub const fn new(what: u16) -> Self {
        What(what)
    }

    /// Get the raw tag value
    pub const fn raw(self) -> u16 {
        self.0
    }
}

impl fmt::Display for What {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "What({})", self.0)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for What {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "What({})", self.0);
    }
}

/// A message as seen by the handler that receives it.
///
/// `arg1`/`arg2` carry small per-message data inline. `payload` stands in
/// for the original framework's nullable pointer argument: when `P` is a
/// reference type the sender must keep the referent alive until delivery,
/// since ownership is not transferred through the queue. `when` is the
/// absolute due time stamped at send.
#[derive(Debug, Clone, Copy)]
pub struct Message<P> {
    pub what: What,
    pub arg1: u16,
    pub arg2: u16,
    pub payload: Option<P>,
    pub when: Instant,
}

impl<P> Message<P> {
    /// Create an empty message carrying only a tag
    pub const fn new(what: What) -> Self {
        Self {
            what,
            arg1: 0,
            arg2: 0,
            payload: None,
            when: Instant::ZERO,
        }
    }
}

#[cfg(feature = "defmt")]
impl<P: defmt::Format> defmt::Format for Message<P> {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(
            fmt,
            "Message {{ what: {}, arg1: {}, arg2: {}, payload: {}, when: {} }}",
            self.what,
            self.arg1,
            self.arg2,
            self.payload,
            self.when
        );
    }
}
