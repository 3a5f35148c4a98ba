//! The dispatch loop draining due messages into their handlers

use crate::handler::Handler;
use crate::queue::{MessageSink, MsgQueue};

/// The dispatcher for one [`MsgQueue`].
///
/// The original firmware ran this as its main loop: process one due
/// message, otherwise drop into a low-power wait until the next tick.
pub struct Looper<'q, P: 'static, const N: usize> {
    queue: &'q MsgQueue<P, N>,
}

impl<'q, P: Copy + Send + 'static, const N: usize> Looper<'q, P, N> {
    /// Create a dispatcher over `queue`
    pub const fn new(queue: &'q MsgQueue<P, N>) -> Self {
        Self { queue }
    }

    /// Dispatch the earliest due message, if any.
    ///
    /// The message is unlinked inside a critical section, the callback runs
    /// with no critical section held, and the slot is recycled afterwards.
    /// Returns whether a message was dispatched; with nothing due this
    /// changes no state.
    pub fn step(&self) -> bool {
        match self.queue.pop_due() {
            Some((slot, msg, target)) => {
                target.on_message(&msg, Handler::new(self.queue, target));
                self.queue.recycle(slot);
                true
            }
            None => false,
        }
    }

    /// Run the dispatch loop forever, idling between due messages
    pub fn run(&self) -> ! {
        loop {
            if !self.step() {
                Self::on_idle();
            }
        }
    }

    /// Idle wait until the next interrupt can make a message due
    fn on_idle() {
        #[cfg(target_arch = "arm")]
        cortex_m::asm::wfi();

        #[cfg(not(target_arch = "arm"))]
        core::hint::spin_loop();
    }
}
