#![no_std]
#![forbid(unsafe_code)]

//! # Looper Button
//!
//! Debounced button sampling with click and long-click classification.
//!
//! Call [`Button::poll`] on a fixed period, typically every 10 ms from the
//! system tick. One signed counter per button is the whole state machine:
//! `0` while released, the number of consecutive pressed samples while
//! held, and a sentinel once the long click has fired so it cannot fire
//! again before release. Thresholds count poll periods and are fixed at
//! compile time.
//!
//! The button is independent of the message framework: it owns no shared
//! state and reports through plain callbacks from the polling context.
//! Wiring a callback to a [`Handler`] send is the caller's business.
//!
//! [`Handler`]: https://docs.rs/looper-mq

use embedded_hal::digital::InputPin;

/// Counter value marking "long click delivered, button still held"
const LONG_FIRED: i16 = -1;

/// A debounced push button on an active-low input pin.
///
/// `CLICK_TICKS` is the minimum hold, in poll periods, for a release to
/// count as a click; `LONG_TICKS` is the hold at which a long click fires
/// while still held. `0 < CLICK_TICKS <= LONG_TICKS < i16::MAX` must hold.
/// The defaults debounce at 2 periods and long-click at 100, one second at
/// a 10 ms poll.
///
/// All four callbacks are optional. Register them before the first poll;
/// changing them mid-gesture is a logic error, not a safety problem.
pub struct Button<'a, P, const CLICK_TICKS: u16 = 2, const LONG_TICKS: u16 = 100> {
    pin: P,
    counter: i16,
    on_click: Option<&'a dyn Fn()>,
    on_long_click: Option<&'a dyn Fn()>,
    on_down: Option<&'a dyn Fn()>,
    on_up: Option<&'a dyn Fn()>,
}

impl<'a, P: InputPin, const CLICK_TICKS: u16, const LONG_TICKS: u16>
    Button<'a, P, CLICK_TICKS, LONG_TICKS>
{
    /// Take ownership of `pin`; all callbacks start unset
    pub fn new(pin: P) -> Self {
        debug_assert!(CLICK_TICKS > 0);
        debug_assert!(CLICK_TICKS <= LONG_TICKS);
        debug_assert!(LONG_TICKS < i16::MAX as u16);
        Self {
            pin,
            counter: 0,
            on_click: None,
            on_long_click: None,
            on_down: None,
            on_up: None,
        }
    }

    /// Fired when a release qualifies as a click
    pub fn set_on_click(&mut self, callback: &'a dyn Fn()) {
        self.on_click = Some(callback);
    }

    /// Fired once per hold when `LONG_TICKS` is reached
    pub fn set_on_long_click(&mut self, callback: &'a dyn Fn()) {
        self.on_long_click = Some(callback);
    }

    /// Fired on the released-to-pressed transition
    pub fn set_on_down(&mut self, callback: &'a dyn Fn()) {
        self.on_down = Some(callback);
    }

    /// Fired on any pressed-to-released transition, before `on_click`
    pub fn set_on_up(&mut self, callback: &'a dyn Fn()) {
        self.on_up = Some(callback);
    }

    /// Sample the pin once and advance the state machine.
    ///
    /// While pressed the counter climbs until `LONG_TICKS`, where the long
    /// click fires exactly once and the sentinel stops further counting.
    /// On release, a hold of at least `CLICK_TICKS` samples fires a click;
    /// the sentinel never qualifies, so a long click swallows its release.
    pub fn poll(&mut self) -> Result<(), P::Error> {
        if self.pin.is_low()? {
            if self.counter == 0 {
                fire(self.on_down);
            }
            if self.counter == LONG_TICKS as i16 {
                fire(self.on_long_click);
                self.counter = LONG_FIRED;
            }
            if self.counter != LONG_FIRED {
                self.counter += 1;
            }
        } else if self.counter != 0 {
            fire(self.on_up);
            if self.counter >= CLICK_TICKS as i16 {
                fire(self.on_click);
            }
            self.counter = 0;
        }
        Ok(())
    }
}

fn fire(callback: Option<&dyn Fn()>) {
    if let Some(callback) = callback {
        callback();
    }
}

#[cfg(feature = "defmt")]
impl<'a, P, const CLICK_TICKS: u16, const LONG_TICKS: u16> defmt::Format
    for Button<'a, P, CLICK_TICKS, LONG_TICKS>
{
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "Button{{ counter: {} }}", self.counter);
    }
}
