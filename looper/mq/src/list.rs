//! Due-time-ordered delivery list

use looper_core::Instant;

use crate::pool::{MessagePool, SlotId, NIL};

/// Singly linked list of pool slots in ascending due-time order.
///
/// The links live inside the pool entries; this struct is only the head
/// index. The insert scan stops at the first node whose due time is
/// *strictly* later than the new message's, so messages with equal due
/// times keep their send order.
pub(crate) struct DueQueue {
    head: u16,
}

impl DueQueue {
    pub(crate) const fn new() -> Self {
        Self { head: NIL }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.head == NIL
    }

    /// Link `slot` into position by its stamped due time.
    pub(crate) fn insert<P: 'static, const N: usize>(
        &mut self,
        pool: &mut MessagePool<P, N>,
        slot: SlotId,
    ) {
        let when = pool.when_of(slot.0);

        let mut prev = NIL;
        let mut cursor = self.head;
        while cursor != NIL && !pool.when_of(cursor).is_after(when) {
            prev = cursor;
            cursor = pool.entry(cursor).next;
        }

        pool.entry_mut(slot.0).next = cursor;
        if prev == NIL {
            self.head = slot.0;
        } else {
            pool.entry_mut(prev).next = slot.0;
        }
    }

    /// Unlink and return the head if its due time has been reached.
    pub(crate) fn pop_due<P: 'static, const N: usize>(
        &mut self,
        pool: &mut MessagePool<P, N>,
        now: Instant,
    ) -> Option<SlotId> {
        if self.head == NIL {
            return None;
        }
        let head = self.head;
        if !pool.when_of(head).is_due(now) {
            return None;
        }
        self.head = pool.entry(head).next;
        pool.entry_mut(head).next = NIL;
        Some(SlotId(head))
    }

    /// Due time of the head without unlinking it
    pub(crate) fn head_due<P: 'static, const N: usize>(
        &self,
        pool: &MessagePool<P, N>,
    ) -> Option<Instant> {
        if self.head == NIL {
            None
        } else {
            Some(pool.when_of(self.head))
        }
    }

    /// Head slot without unlinking it
    pub(crate) fn head_slot(&self) -> Option<SlotId> {
        if self.head == NIL {
            None
        } else {
            Some(SlotId(self.head))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use looper_core::{Message, What};

    /// Obtain a slot and stamp it with a message due at `when`.
    fn put<const N: usize>(
        pool: &mut MessagePool<u16, N>,
        queue: &mut DueQueue,
        tag: u16,
        when: u32,
    ) -> SlotId {
        let slot = pool.obtain().unwrap();
        let mut msg = Message::new(What::new(tag));
        msg.when = Instant::new(when);
        pool.entry_mut(slot.0).msg = Some(msg);
        queue.insert(pool, slot);
        slot
    }

    fn pop_tag<const N: usize>(
        pool: &mut MessagePool<u16, N>,
        queue: &mut DueQueue,
        now: u32,
    ) -> Option<u16> {
        let slot = queue.pop_due(pool, Instant::new(now))?;
        let tag = match &pool.entry(slot.0).msg {
            Some(msg) => msg.what.raw(),
            None => unreachable!(),
        };
        pool.recycle(slot);
        Some(tag)
    }

    #[test]
    fn test_delivery_in_due_order() {
        let mut pool: MessagePool<u16, 8> = MessagePool::new();
        let mut queue = DueQueue::new();

        put(&mut pool, &mut queue, 1, 50);
        put(&mut pool, &mut queue, 2, 10);
        put(&mut pool, &mut queue, 3, 30);

        assert_eq!(pop_tag(&mut pool, &mut queue, 100), Some(2));
        assert_eq!(pop_tag(&mut pool, &mut queue, 100), Some(3));
        assert_eq!(pop_tag(&mut pool, &mut queue, 100), Some(1));
        assert_eq!(pop_tag(&mut pool, &mut queue, 100), None);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_equal_due_times_deliver_fifo() {
        let mut pool: MessagePool<u16, 8> = MessagePool::new();
        let mut queue = DueQueue::new();

        put(&mut pool, &mut queue, 1, 20);
        put(&mut pool, &mut queue, 2, 20);
        put(&mut pool, &mut queue, 3, 20);

        assert_eq!(pop_tag(&mut pool, &mut queue, 20), Some(1));
        assert_eq!(pop_tag(&mut pool, &mut queue, 20), Some(2));
        assert_eq!(pop_tag(&mut pool, &mut queue, 20), Some(3));
    }

    #[test]
    fn test_equal_due_head_keeps_fifo() {
        let mut pool: MessagePool<u16, 8> = MessagePool::new();
        let mut queue = DueQueue::new();

        // second message ties with the current head; it must go behind it
        put(&mut pool, &mut queue, 1, 20);
        put(&mut pool, &mut queue, 2, 20);
        put(&mut pool, &mut queue, 3, 10);

        assert_eq!(pop_tag(&mut pool, &mut queue, 100), Some(3));
        assert_eq!(pop_tag(&mut pool, &mut queue, 100), Some(1));
        assert_eq!(pop_tag(&mut pool, &mut queue, 100), Some(2));
    }

    #[test]
    fn test_nothing_delivered_early() {
        let mut pool: MessagePool<u16, 8> = MessagePool::new();
        let mut queue = DueQueue::new();

        put(&mut pool, &mut queue, 1, 10);

        assert_eq!(pop_tag(&mut pool, &mut queue, 9), None);
        assert_eq!(queue.head_due(&pool), Some(Instant::new(10)));
        assert_eq!(pop_tag(&mut pool, &mut queue, 10), Some(1));
    }

    #[test]
    fn test_due_comparison_across_wrap() {
        let mut pool: MessagePool<u16, 8> = MessagePool::new();
        let mut queue = DueQueue::new();

        let now = u32::MAX - 10;
        // due 20 ticks from now, which lands past the wrap
        let due = Instant::new(now).plus_ticks(20).raw();
        assert!(due < now);
        put(&mut pool, &mut queue, 1, due);

        assert_eq!(pop_tag(&mut pool, &mut queue, now), None);
        assert_eq!(pop_tag(&mut pool, &mut queue, due), Some(1));
    }

    #[test]
    fn test_insert_ahead_of_later_head() {
        let mut pool: MessagePool<u16, 8> = MessagePool::new();
        let mut queue = DueQueue::new();

        put(&mut pool, &mut queue, 1, 50);
        let early = put(&mut pool, &mut queue, 2, 10);

        assert_eq!(queue.head_slot(), Some(early));
    }
}
