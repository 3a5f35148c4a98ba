//! Handlers: the producer facade over a shared message queue

use looper_core::{Message, Result, What};

use crate::pool::SlotId;
use crate::queue::MessageSink;

/// Receives the messages a [`Handler`] posted.
///
/// This replaces the original's function-pointer callback plus `void*`
/// context pair: the context is the implementor itself. Delivery takes
/// `&self` so a handler reachable from interrupt producers keeps its
/// mutable state behind its own interior mutability (`Mutex<Cell<_>>` or
/// `Mutex<RefCell<_>>`).
pub trait HandleMessage<P: Copy>: Sync {
    /// Called once per delivered message, outside any critical section.
    ///
    /// `handler` is bound to this target and the delivering queue, so the
    /// callback can obtain and send follow-up messages.
    fn on_message(&self, msg: &Message<P>, handler: Handler<'_, P>);
}

/// Binds a [`HandleMessage`] target to a queue.
///
/// Handlers are small and `Copy`; make as many as needed. Everything a
/// handler sends is later delivered to its `target` by the dispatch loop.
#[derive(Clone, Copy)]
pub struct Handler<'q, P: Copy + 'static> {
    queue: &'q dyn MessageSink<P>,
    target: &'static dyn HandleMessage<P>,
}

impl<'q, P: Copy + 'static> Handler<'q, P> {
    /// Bind `target` to `queue`
    pub const fn new(queue: &'q dyn MessageSink<P>, target: &'static dyn HandleMessage<P>) -> Self {
        Self { queue, target }
    }

    /// Take a pool slot stamped with this handler and `what`.
    ///
    /// The returned token must be sent or dropped; dropping it returns the
    /// slot to the pool.
    pub fn obtain(&self, what: What) -> Result<MessageToken<'q, P>> {
        let slot = self.queue.obtain(self.target, what)?;
        Ok(MessageToken {
            queue: self.queue,
            slot: Some(slot),
            msg: Message::new(what),
        })
    }

    /// Obtain and send a message carrying only `what`
    pub fn send_empty(&self, what: What) -> Result<()> {
        self.obtain(what)?.send();
        Ok(())
    }

    /// Obtain and send a fully populated message in one call
    pub fn send_with(&self, what: What, arg1: u16, arg2: u16, payload: P) -> Result<()> {
        self.obtain(what)?.args(arg1, arg2).payload(payload).send();
        Ok(())
    }
}

/// An obtained, not-yet-sent message.
///
/// The slot is already reserved, so populating and sending cannot fail.
/// The message contents are staged here and written to the slot in one
/// critical section at send time. An unsent token recycles its slot on
/// drop.
pub struct MessageToken<'q, P: Copy> {
    queue: &'q dyn MessageSink<P>,
    slot: Option<SlotId>,
    msg: Message<P>,
}

impl<'q, P: Copy> MessageToken<'q, P> {
    /// Set both inline arguments
    pub fn args(mut self, arg1: u16, arg2: u16) -> Self {
        self.msg.arg1 = arg1;
        self.msg.arg2 = arg2;
        self
    }

    /// Attach the payload; the sender keeps any referent alive until
    /// delivery.
    pub fn payload(mut self, payload: P) -> Self {
        self.msg.payload = Some(payload);
        self
    }

    /// Send for delivery on the next dispatch step. Delivery is never
    /// synchronous, even with nothing ahead in the queue.
    pub fn send(self) {
        self.send_delayed(0);
    }

    /// Send with `due = now + delay_ticks`
    pub fn send_delayed(mut self, delay_ticks: u32) {
        if let Some(slot) = self.slot.take() {
            self.queue.send(slot, self.msg, delay_ticks);
        }
    }
}

impl<'q, P: Copy> Drop for MessageToken<'q, P> {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.take() {
            self.queue.recycle(slot);
        }
    }
}
