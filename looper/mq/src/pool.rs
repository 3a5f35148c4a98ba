//! Fixed-capacity message arena with an index-linked free list

use looper_core::{Instant, Message};

use crate::handler::HandleMessage;

/// Sentinel index meaning "no next slot"
pub(crate) const NIL: u16 = u16::MAX;

/// Identity of a pool slot while it is held outside the pool (obtained but
/// not yet sent, or being dispatched). Opaque to users; only the framework
/// mints them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotId(pub(crate) u16);

/// One arena slot. `next` threads the slot into the free list or the
/// delivery list; a slot is never on both.
pub(crate) struct Entry<P: 'static> {
    pub(crate) msg: Option<Message<P>>,
    pub(crate) target: Option<&'static dyn HandleMessage<P>>,
    pub(crate) next: u16,
}

impl<P: 'static> Entry<P> {
    pub(crate) const EMPTY: Self = Self {
        msg: None,
        target: None,
        next: NIL,
    };
}

/// The message pool: `N` slots addressed by index.
///
/// Free slots are a LIFO list threaded through `next`, topped up from a
/// high-water mark so construction stays `const`. No synchronization here;
/// [`MsgQueue`](crate::MsgQueue) wraps the pool in a critical section.
pub(crate) struct MessagePool<P: 'static, const N: usize> {
    entries: [Entry<P>; N],
    free_head: u16,
    /// Slots at or above this index have never been handed out
    high_water: u16,
    free: u16,
    min_free: u16,
}

impl<P: 'static, const N: usize> MessagePool<P, N> {
    pub(crate) const fn new() -> Self {
        assert!(N < NIL as usize);
        Self {
            entries: [Entry::EMPTY; N],
            free_head: NIL,
            high_water: 0,
            free: N as u16,
            min_free: N as u16,
        }
    }

    /// Take a slot off the free list, or a never-used one.
    pub(crate) fn obtain(&mut self) -> Option<SlotId> {
        let index = if self.free_head != NIL {
            let index = self.free_head;
            self.free_head = self.entries[index as usize].next;
            index
        } else if (self.high_water as usize) < N {
            let index = self.high_water;
            self.high_water += 1;
            index
        } else {
            return None;
        };

        let entry = &mut self.entries[index as usize];
        debug_assert!(entry.msg.is_none() && entry.target.is_none());
        entry.next = NIL;

        self.free -= 1;
        if self.free < self.min_free {
            self.min_free = self.free;
        }
        Some(SlotId(index))
    }

    /// Clear `slot` and push it on the free-list head (LIFO reuse).
    pub(crate) fn recycle(&mut self, slot: SlotId) {
        let entry = &mut self.entries[slot.0 as usize];
        entry.msg = None;
        entry.target = None;
        entry.next = self.free_head;
        self.free_head = slot.0;
        self.free += 1;
        debug_assert!(self.free as usize <= N);
    }

    pub(crate) fn entry(&self, index: u16) -> &Entry<P> {
        &self.entries[index as usize]
    }

    pub(crate) fn entry_mut(&mut self, index: u16) -> &mut Entry<P> {
        &mut self.entries[index as usize]
    }

    /// Due time of the message in `index`; queued slots always carry one.
    pub(crate) fn when_of(&self, index: u16) -> Instant {
        let entry = self.entry(index);
        debug_assert!(entry.msg.is_some());
        match &entry.msg {
            Some(msg) => msg.when,
            None => Instant::ZERO,
        }
    }

    pub(crate) fn stats(&self) -> PoolStats {
        PoolStats {
            capacity: N,
            free: self.free as usize,
            min_free: self.min_free as usize,
        }
    }
}

/// Message pool statistics for debugging and capacity provisioning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Total number of slots in the pool
    pub capacity: usize,
    /// Number of free slots currently available
    pub free: usize,
    /// Minimum number of free slots ever reached
    pub min_free: usize,
}

impl PoolStats {
    /// Number of slots currently queued or caller-held
    pub const fn used(&self) -> usize {
        self.capacity - self.free
    }

    /// Check if the pool has no free slot left
    pub const fn is_full(&self) -> bool {
        self.free == 0
    }

    /// Get utilization as a percentage (0-100)
    pub fn utilization(&self) -> u8 {
        if self.capacity == 0 {
            0
        } else {
            ((self.used() * 100) / self.capacity) as u8
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for PoolStats {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(
            fmt,
            "PoolStats{{ capacity: {}, free: {}, min_free: {} }}",
            self.capacity,
            self.free,
            self.min_free
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_obtain_and_recycle() {
        let mut pool: MessagePool<(), 4> = MessagePool::new();
        assert_eq!(pool.stats().free, 4);

        let a = pool.obtain().unwrap();
        let b = pool.obtain().unwrap();
        assert_ne!(a, b);
        assert_eq!(pool.stats().free, 2);
        assert_eq!(pool.stats().used(), 2);

        pool.recycle(a);
        pool.recycle(b);
        assert_eq!(pool.stats().free, 4);
    }

    #[test]
    fn test_pool_exhaustion() {
        let mut pool: MessagePool<(), 2> = MessagePool::new();
        assert!(pool.obtain().is_some());
        assert!(pool.obtain().is_some());
        assert!(pool.obtain().is_none());
        assert!(pool.stats().is_full());
    }

    #[test]
    fn test_recycled_slot_is_reused_first() {
        let mut pool: MessagePool<(), 4> = MessagePool::new();
        let a = pool.obtain().unwrap();
        let _b = pool.obtain().unwrap();

        pool.recycle(a);
        assert_eq!(pool.obtain(), Some(a));
    }

    #[test]
    fn test_free_list_is_lifo() {
        let mut pool: MessagePool<(), 4> = MessagePool::new();
        let a = pool.obtain().unwrap();
        let b = pool.obtain().unwrap();

        pool.recycle(a);
        pool.recycle(b);
        assert_eq!(pool.obtain(), Some(b));
        assert_eq!(pool.obtain(), Some(a));
    }

    #[test]
    fn test_conservation_through_churn() {
        let mut pool: MessagePool<(), 3> = MessagePool::new();
        let mut held = [None; 3];

        for round in 0..4 {
            for slot in held.iter_mut() {
                *slot = pool.obtain();
                assert!(slot.is_some());
            }
            assert_eq!(pool.stats().free, 0);

            for slot in held.iter_mut() {
                pool.recycle(slot.take().unwrap());
            }
            assert_eq!(pool.stats().free, 3, "leak in round {round}");
        }
    }

    #[test]
    fn test_min_free_watermark() {
        let mut pool: MessagePool<(), 4> = MessagePool::new();
        let a = pool.obtain().unwrap();
        let b = pool.obtain().unwrap();
        let c = pool.obtain().unwrap();
        pool.recycle(b);
        pool.recycle(a);
        pool.recycle(c);

        let stats = pool.stats();
        assert_eq!(stats.free, 4);
        assert_eq!(stats.min_free, 1);
        assert_eq!(stats.utilization(), 0);
    }
}
