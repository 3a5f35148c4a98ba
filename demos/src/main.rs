//! Blinky on the host.
//!
//! Runs the firmware main loop of the original board on a desktop machine:
//! a blink handler toggles a virtual LED and re-arms itself once a second,
//! a simulated button feeds click events into the same queue, and the timer
//! interrupt is played by advancing the tick counter by hand.
//!
//! One tick is one millisecond; one loop cycle advances ten ticks and
//! samples the button once, so the debounce thresholds below are counted
//! in 10 ms steps.

use std::cell::Cell;
use std::convert::Infallible;

use critical_section::Mutex;
use embedded_hal::digital::{ErrorType, InputPin};
use looper_button::Button;
use looper_core::{Clock, Message, TickCounter, What};
use looper_mq::{HandleMessage, Handler, Looper, MsgQueue};

const LED_SWITCH: What = What::new(1);
const BUTTON_CLICK: What = What::new(2);
const BUTTON_LONG_CLICK: What = What::new(3);

/// Blink period in ticks, the original firmware's 1 s.
const BLINK_PERIOD_TICKS: u32 = 1_000;
/// Ticks elapsed per main-loop cycle.
const TICKS_PER_CYCLE: u32 = 10;
/// Cycles to simulate before the demo exits.
const CYCLES: u32 = 600;

static CLOCK: TickCounter = TickCounter::new();
static QUEUE: MsgQueue<(), 16> = MsgQueue::new(&CLOCK);
static BLINK: BlinkHandler = BlinkHandler::new();
static GESTURES: GestureHandler = GestureHandler::new();

/// Toggles the LED and re-arms itself, one message per blink edge.
struct BlinkHandler {
    led_on: Mutex<Cell<bool>>,
}

impl BlinkHandler {
    const fn new() -> Self {
        Self {
            led_on: Mutex::new(Cell::new(false)),
        }
    }
}

impl HandleMessage<()> for BlinkHandler {
    fn on_message(&self, _msg: &Message<()>, handler: Handler<'_, ()>) {
        let led_on = critical_section::with(|cs| {
            let led = self.led_on.borrow(cs);
            led.set(!led.get());
            led.get()
        });
        println!("[{}] LED {}", CLOCK.now(), if led_on { "on" } else { "off" });
        if let Ok(token) = handler.obtain(LED_SWITCH) {
            token.send_delayed(BLINK_PERIOD_TICKS);
        }
    }
}

/// Reacts to button gestures: a click fires a quick extra blink burst, a
/// long click reports pool usage.
struct GestureHandler {
    clicks: Mutex<Cell<u32>>,
}

impl GestureHandler {
    const fn new() -> Self {
        Self {
            clicks: Mutex::new(Cell::new(0)),
        }
    }
}

impl HandleMessage<()> for GestureHandler {
    fn on_message(&self, msg: &Message<()>, _handler: Handler<'_, ()>) {
        match msg.what {
            BUTTON_CLICK => {
                let clicks = critical_section::with(|cs| {
                    let clicks = self.clicks.borrow(cs);
                    clicks.set(clicks.get() + 1);
                    clicks.get()
                });
                println!("[{}] click #{}: blink burst", CLOCK.now(), clicks);
                let blink = Handler::new(&QUEUE, &BLINK);
                for delay in [0, 120, 240] {
                    if let Ok(token) = blink.obtain(LED_SWITCH) {
                        token.send_delayed(delay);
                    }
                }
            }
            BUTTON_LONG_CLICK => {
                let stats = QUEUE.stats();
                println!(
                    "[{}] long click: pool {}/{} in use, min free {}",
                    CLOCK.now(),
                    stats.used(),
                    stats.capacity,
                    stats.min_free
                );
            }
            _ => {}
        }
    }
}

/// Input pin backed by a plain flag, low when the button is held.
struct SimPin<'a> {
    low: &'a Cell<bool>,
}

impl ErrorType for SimPin<'_> {
    type Error = Infallible;
}

impl InputPin for SimPin<'_> {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.low.get())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(self.low.get())
    }
}

fn main() {
    println!("looper blinky demo (1 tick = 1 ms, {} ticks per cycle)", TICKS_PER_CYCLE);

    let level = Cell::new(false);
    let on_down = || println!("[{}] button down", CLOCK.now());
    let on_up = || println!("[{}] button up", CLOCK.now());
    let on_click = || {
        let _ = Handler::new(&QUEUE, &GESTURES).send_empty(BUTTON_CLICK);
    };
    let on_long_click = || {
        let _ = Handler::new(&QUEUE, &GESTURES).send_empty(BUTTON_LONG_CLICK);
    };

    // Click after 3 samples (30 ms), long click after 80 (800 ms).
    let mut button: Button<'_, _, 3, 80> = Button::new(SimPin { low: &level });
    button.set_on_down(&on_down);
    button.set_on_up(&on_up);
    button.set_on_click(&on_click);
    button.set_on_long_click(&on_long_click);

    let looper = Looper::new(&QUEUE);

    Handler::new(&QUEUE, &BLINK)
        .send_empty(LED_SWITCH)
        .expect("initial message fits an empty pool");

    for cycle in 0..CYCLES {
        // Timer interrupt: one cycle worth of ticks.
        CLOCK.advance_by(TICKS_PER_CYCLE);

        // Gesture script: a short press around 1 s, a long hold from 2 s on.
        let pressed = (100..=103).contains(&cycle) || (200..=290).contains(&cycle);
        level.set(pressed);
        let _ = button.poll();

        // Drain everything that came due this cycle.
        while looper.step() {}
    }

    let stats = QUEUE.stats();
    println!(
        "done after {} cycles: pool {}/{} in use, min free {}",
        CYCLES,
        stats.used(),
        stats.capacity,
        stats.min_free
    );
}
