//! Tick instants and the tick-source capability

use core::cell::Cell;
use core::fmt;

use critical_section::Mutex;

/// Absolute point on the system tick counter.
///
/// The counter wraps at the width of `u32`, so comparisons go through the
/// wrap-aware [`is_after`](Instant::is_after) and [`is_due`](Instant::is_due)
/// methods. This type deliberately implements no `Ord`: a derived ordering
/// would be wrong across the wrap. Two instants compare meaningfully as long
/// as they lie within half the counter range of each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instant(u32);

impl Instant {
    /// Tick zero
    pub const ZERO: Self = Self(0);

    /// Create an instant from a raw tick count
    pub const fn new(ticks: u32) -> Self {
        Self(ticks)
    }

    /// Get the raw tick count
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// The instant `ticks` later, wrapping at the counter width
    pub const fn plus_ticks(self, ticks: u32) -> Self {
        Self(self.0.wrapping_add(ticks))
    }

    /// Ticks elapsed since `earlier` (wrap-aware)
    pub const fn elapsed_since(self, earlier: Self) -> u32 {
        self.0.wrapping_sub(earlier.0)
    }

    /// Check if this instant is strictly later than `other` (wrap-aware)
    pub const fn is_after(self, other: Self) -> bool {
        (self.0.wrapping_sub(other.0) as i32) > 0
    }

    /// Check if this instant has been reached at time `now`
    pub const fn is_due(self, now: Self) -> bool {
        !self.is_after(now)
    }
}

impl fmt::Display for Instant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tick:{}", self.0)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Instant {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "tick:{}", self.0);
    }
}

/// Read access to a monotonic tick counter.
///
/// Implementations must tolerate being read from both task and interrupt
/// context.
pub trait Clock: Sync {
    /// The current tick count
    fn now(&self) -> Instant;
}

/// The system tick source: a counter advanced from a periodic timer
/// interrupt and read through [`Clock`] by everyone else.
///
/// `const fn new` lets the counter live in a `static` shared between the
/// timer interrupt and the main loop. Tests drive it manually through
/// [`advance_by`](TickCounter::advance_by).
pub struct TickCounter {
    ticks: Mutex<Cell<u32>>,
}

impl TickCounter {
    /// Create a counter starting at tick zero
    pub const fn new() -> Self {
        Self {
            ticks: Mutex::new(Cell::new(0)),
        }
    }

    /// Advance the counter by one tick; this is the timer interrupt body
    pub fn advance(&self) {
        self.advance_by(1);
    }

    /// Advance the counter by `ticks` at once
    pub fn advance_by(&self, ticks: u32) {
        critical_section::with(|cs| {
            let cell = self.ticks.borrow(cs);
            cell.set(cell.get().wrapping_add(ticks));
        });
    }
}

impl Clock for TickCounter {
    fn now(&self) -> Instant {
        critical_section::with(|cs| Instant::new(self.ticks.borrow(cs).get()))
    }
}

impl Default for TickCounter {
    fn default() -> Self {
        Self::new()
    }
}
