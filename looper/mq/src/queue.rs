//! The shared message queue behind one critical section

use core::cell::RefCell;

use critical_section::Mutex;
use looper_core::{Clock, Error, Instant, Message, Result, What};

use crate::handler::HandleMessage;
use crate::list::DueQueue;
use crate::pool::{MessagePool, PoolStats, SlotId};
use crate::DEFAULT_POOL_CAPACITY;

/// Producer view of a [`MsgQueue`].
///
/// Object-safe so [`Handler`](crate::Handler) and
/// [`MessageToken`](crate::MessageToken) carry a plain `&dyn MessageSink`
/// instead of the queue's capacity parameter. Users never call these
/// directly; the handler facade does.
pub trait MessageSink<P: Copy>: Sync {
    /// Take a free slot and stamp it with its target handler and tag.
    fn obtain(&self, target: &'static dyn HandleMessage<P>, what: What) -> Result<SlotId>;

    /// Stamp `msg` with `due = now + delay_ticks` and link the slot into
    /// the delivery list.
    fn send(&self, slot: SlotId, msg: Message<P>, delay_ticks: u32);

    /// Return an obtained-but-unsent slot to the pool.
    fn recycle(&self, slot: SlotId);
}

struct Inner<P: 'static, const N: usize> {
    pool: MessagePool<P, N>,
    queue: DueQueue,
}

/// The context object of the framework: message pool, due-ordered delivery
/// list, and tick source, constructed explicitly and shared by reference
/// with every [`Handler`](crate::Handler) and [`Looper`](crate::Looper).
///
/// `const fn new` lets a queue live in a `static` reachable from interrupt
/// handlers. Every pool/queue mutation runs inside a critical section;
/// nothing here is held across a handler callback. At any instant each of
/// the `N` slots is free, queued, or held by exactly one caller.
pub struct MsgQueue<P: 'static, const N: usize = DEFAULT_POOL_CAPACITY> {
    inner: Mutex<RefCell<Inner<P, N>>>,
    clock: &'static dyn Clock,
}

impl<P: Copy + 'static, const N: usize> MsgQueue<P, N> {
    /// Create an empty queue reading time from `clock`
    pub const fn new(clock: &'static dyn Clock) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(Inner {
                pool: MessagePool::new(),
                queue: DueQueue::new(),
            })),
            clock,
        }
    }

    fn with_inner<R>(&self, f: impl FnOnce(&mut Inner<P, N>) -> R) -> R {
        critical_section::with(|cs| f(&mut self.inner.borrow_ref_mut(cs)))
    }

    /// Get the maximum number of pooled messages
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Check if no messages are waiting for delivery
    pub fn is_empty(&self) -> bool {
        self.with_inner(|inner| inner.queue.is_empty())
    }

    /// Snapshot of the pool occupancy
    pub fn stats(&self) -> PoolStats {
        self.with_inner(|inner| inner.pool.stats())
    }

    /// Due time of the earliest queued message, for tickless idle loops
    pub fn next_due(&self) -> Option<Instant> {
        self.with_inner(|inner| inner.queue.head_due(&inner.pool))
    }

    /// Copy of the earliest queued message if it is already due, without
    /// unlinking it.
    pub fn peek_due(&self) -> Option<Message<P>> {
        let now = self.clock.now();
        self.with_inner(|inner| {
            let head = inner.queue.head_slot()?;
            let msg = inner.pool.entry(head.0).msg?;
            msg.when.is_due(now).then_some(msg)
        })
    }

    /// Unlink the earliest due message, leaving its slot caller-held until
    /// [`MessageSink::recycle`]. Returns the slot, a copy of the message,
    /// and the handler to deliver it to.
    pub(crate) fn pop_due(&self) -> Option<(SlotId, Message<P>, &'static dyn HandleMessage<P>)> {
        let now = self.clock.now();
        self.with_inner(|inner| {
            let slot = inner.queue.pop_due(&mut inner.pool, now)?;
            let entry = inner.pool.entry_mut(slot.0);
            debug_assert!(entry.msg.is_some() && entry.target.is_some());
            let msg = entry.msg.take()?;
            let target = entry.target.take()?;
            Some((slot, msg, target))
        })
    }
}

impl<P: Copy + Send + 'static, const N: usize> MessageSink<P> for MsgQueue<P, N> {
    fn obtain(&self, target: &'static dyn HandleMessage<P>, what: What) -> Result<SlotId> {
        self.with_inner(|inner| {
            let slot = inner.pool.obtain().ok_or(Error::PoolExhausted)?;
            let entry = inner.pool.entry_mut(slot.0);
            entry.msg = Some(Message::new(what));
            entry.target = Some(target);
            Ok(slot)
        })
    }

    fn send(&self, slot: SlotId, mut msg: Message<P>, delay_ticks: u32) {
        // past half the counter range the wrap-aware ordering inverts
        debug_assert!(delay_ticks < u32::MAX / 2);
        msg.when = self.clock.now().plus_ticks(delay_ticks);
        self.with_inner(|inner| {
            inner.pool.entry_mut(slot.0).msg = Some(msg);
            inner.queue.insert(&mut inner.pool, slot);
        });
    }

    fn recycle(&self, slot: SlotId) {
        self.with_inner(|inner| inner.pool.recycle(slot));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use looper_core::TickCounter;

    struct Sink;

    impl HandleMessage<()> for Sink {
        fn on_message(&self, _msg: &Message<()>, _handler: crate::Handler<'_, ()>) {}
    }

    static TARGET: Sink = Sink;

    #[test]
    fn test_obtain_exhaustion_is_an_error() {
        static CLOCK: TickCounter = TickCounter::new();
        let queue: MsgQueue<(), 2> = MsgQueue::new(&CLOCK);

        let a = queue.obtain(&TARGET, What::new(1)).unwrap();
        let _b = queue.obtain(&TARGET, What::new(2)).unwrap();
        assert_eq!(queue.obtain(&TARGET, What::new(3)), Err(Error::PoolExhausted));

        // recycling makes the pool whole again
        queue.recycle(a);
        assert!(queue.obtain(&TARGET, What::new(4)).is_ok());
    }

    #[test]
    fn test_send_orders_by_due_time() {
        static CLOCK: TickCounter = TickCounter::new();
        let queue: MsgQueue<(), 4> = MsgQueue::new(&CLOCK);

        for (tag, delay) in [(1, 50), (2, 10), (3, 30)] {
            let slot = queue.obtain(&TARGET, What::new(tag)).unwrap();
            queue.send(slot, Message::new(What::new(tag)), delay);
        }

        CLOCK.advance_by(100);
        let mut seen = [0u16; 3];
        for tag in seen.iter_mut() {
            let (slot, msg, _) = queue.pop_due().unwrap();
            *tag = msg.what.raw();
            queue.recycle(slot);
        }
        assert_eq!(seen, [2, 3, 1]);
        assert!(queue.pop_due().is_none());
    }

    #[test]
    fn test_nothing_pops_before_due() {
        static CLOCK: TickCounter = TickCounter::new();
        let queue: MsgQueue<(), 4> = MsgQueue::new(&CLOCK);

        let slot = queue.obtain(&TARGET, What::new(1)).unwrap();
        queue.send(slot, Message::new(What::new(1)), 10);

        CLOCK.advance_by(9);
        assert!(queue.pop_due().is_none());
        assert!(queue.peek_due().is_none());
        assert_eq!(queue.next_due(), Some(Instant::new(10)));

        CLOCK.advance();
        let peeked = queue.peek_due().unwrap();
        assert_eq!(peeked.what, What::new(1));
        // peek leaves the message queued
        assert!(queue.pop_due().is_some());
    }

    #[test]
    fn test_stats_track_held_slots() {
        static CLOCK: TickCounter = TickCounter::new();
        let queue: MsgQueue<(), 4> = MsgQueue::new(&CLOCK);

        let held = queue.obtain(&TARGET, What::new(1)).unwrap();
        let sent = queue.obtain(&TARGET, What::new(2)).unwrap();
        queue.send(sent, Message::new(What::new(2)), 0);

        assert_eq!(queue.capacity(), 4);
        let stats = queue.stats();
        assert_eq!(stats.capacity, 4);
        assert_eq!(stats.free, 2);
        assert_eq!(stats.used(), 2);
        assert_eq!(stats.min_free, 2);

        queue.recycle(held);
        let (slot, _, _) = queue.pop_due().unwrap();
        queue.recycle(slot);
        assert_eq!(queue.stats().free, 4);
        assert!(queue.is_empty());
    }
}
