//! Shared sensor buffers.
//!
//! - `BoundedLatestSlot`: single-item, latest-wins buffer (one per camera)
//! - `OrderedQueue`: unbounded FIFO preserving arrival order (IMU)
//!
//! Every buffer owns its own lock. Each method takes that lock exactly once
//! and never calls out while holding it, so no operation here can nest two
//! buffer locks.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use contracts::{Frame, ImuSample, Timestamped};
use parking_lot::Mutex;

/// Single-item slot holding the most recent unconsumed item
pub struct BoundedLatestSlot<T> {
    item: Mutex<Option<T>>,
    /// Items replaced before anyone took them
    superseded: AtomicU64,
}

impl<T> fmt::Debug for BoundedLatestSlot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedLatestSlot")
            .field("occupied", &!self.is_empty())
            .field("superseded", &self.superseded_count())
            .finish()
    }
}

impl<T> Default for BoundedLatestSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> BoundedLatestSlot<T> {
    pub fn new() -> Self {
        Self {
            item: Mutex::new(None),
            superseded: AtomicU64::new(0),
        }
    }

    /// Store `item`, replacing whatever was held.
    ///
    /// Returns the superseded item so the caller decides where it is dropped
    /// (outside the lock).
    #[inline]
    pub fn put(&self, item: T) -> Option<T> {
        let previous = self.item.lock().replace(item);
        if previous.is_some() {
            self.superseded.fetch_add(1, Ordering::Relaxed);
        }
        previous
    }

    /// Remove and return the held item, if any
    #[inline]
    pub fn take(&self) -> Option<T> {
        self.item.lock().take()
    }

    /// Remove the held item only if `pred` accepts it
    ///
    /// Used by the consumer to take exactly the item it inspected earlier:
    /// if a producer overwrote the slot in between, nothing is taken.
    pub fn take_if(&self, pred: impl FnOnce(&T) -> bool) -> Option<T> {
        let mut guard = self.item.lock();
        if guard.as_ref().is_some_and(pred) {
            guard.take()
        } else {
            None
        }
    }

    /// Put back an item taken by the consumer, unless a newer one arrived.
    ///
    /// Returns `false` when the slot was already refilled; the restored item
    /// is then dropped (latest wins).
    pub fn restore(&self, item: T) -> bool {
        let mut guard = self.item.lock();
        if guard.is_some() {
            drop(guard);
            self.superseded.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        *guard = Some(item);
        true
    }

    /// Check if the slot is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.item.lock().is_none()
    }

    /// Number of held items (0 or 1)
    #[inline]
    pub fn len(&self) -> usize {
        usize::from(!self.is_empty())
    }

    /// Number of items evicted without being consumed
    #[inline]
    pub fn superseded_count(&self) -> u64 {
        self.superseded.load(Ordering::Relaxed)
    }
}

impl<T: Timestamped> BoundedLatestSlot<T> {
    /// Timestamp of the held item without removing it
    #[inline]
    pub fn peek_timestamp(&self) -> Option<f64> {
        self.item.lock().as_ref().map(Timestamped::timestamp)
    }
}

#[derive(Debug, Default)]
struct QueueState<T> {
    items: VecDeque<T>,
    /// Timestamp of the most recent push (survives draining)
    last_pushed: Option<f64>,
}

/// Unbounded FIFO preserving arrival order
pub struct OrderedQueue<T> {
    state: Mutex<QueueState<T>>,
    out_of_order: AtomicU64,
}

impl<T> fmt::Debug for OrderedQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderedQueue")
            .field("len", &self.len())
            .field("out_of_order", &self.out_of_order_count())
            .finish()
    }
}

impl<T: Timestamped> Default for OrderedQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Timestamped> OrderedQueue<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::new(),
                last_pushed: None,
            }),
            out_of_order: AtomicU64::new(0),
        }
    }

    /// Append an item
    ///
    /// Returns `false` if its timestamp is older than the previous push.
    /// Such an item is still appended in arrival order; it is never reordered.
    #[inline]
    pub fn push(&self, item: T) -> bool {
        let timestamp = item.timestamp();
        let in_order = {
            let mut state = self.state.lock();
            let in_order = state.last_pushed.map_or(true, |last| timestamp >= last);
            state.last_pushed = Some(timestamp);
            state.items.push_back(item);
            in_order
        };
        if !in_order {
            self.out_of_order.fetch_add(1, Ordering::Relaxed);
        }
        in_order
    }

    /// Timestamp of the oldest unconsumed item
    #[inline]
    pub fn front_timestamp(&self) -> Option<f64> {
        self.state.lock().items.front().map(Timestamped::timestamp)
    }

    /// Timestamp of the newest item
    #[inline]
    pub fn back_timestamp(&self) -> Option<f64> {
        self.state.lock().items.back().map(Timestamped::timestamp)
    }

    /// Remove and return the oldest item
    #[inline]
    pub fn pop_front(&self) -> Option<T> {
        self.state.lock().items.pop_front()
    }

    /// Pop every leading item with timestamp <= `cutoff`, in order.
    ///
    /// The whole drain runs under one lock acquisition; stops at the first
    /// item newer than `cutoff`.
    pub fn drain_up_to(&self, cutoff: f64) -> Vec<T> {
        let mut state = self.state.lock();
        let count = state
            .items
            .iter()
            .take_while(|item| item.timestamp() <= cutoff)
            .count();
        state.items.drain(..count).collect()
    }

}

impl<T> OrderedQueue<T> {
    /// Get the number of buffered items
    #[inline]
    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    /// Check if the queue is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.state.lock().items.is_empty()
    }

    /// Pushes whose timestamp went backwards
    #[inline]
    pub fn out_of_order_count(&self) -> u64 {
        self.out_of_order.load(Ordering::Relaxed)
    }
}

/// The three buffers shared by producers and the synchronizer
///
/// Created once at startup and handed to both sides as `Arc<SensorBuffers>`.
#[derive(Debug)]
pub struct SensorBuffers {
    pub left: BoundedLatestSlot<Frame>,
    pub right: BoundedLatestSlot<Frame>,
    pub imu: OrderedQueue<ImuSample>,
}

impl SensorBuffers {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Depths of (left, right, imu)
    pub fn depths(&self) -> (usize, usize, usize) {
        (self.left.len(), self.right.len(), self.imu.len())
    }
}

impl Default for SensorBuffers {
    fn default() -> Self {
        Self {
            left: BoundedLatestSlot::new(),
            right: BoundedLatestSlot::new(),
            imu: OrderedQueue::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::Vector3;
    use std::thread;

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Stamp(f64, u32);

    impl Timestamped for Stamp {
        fn timestamp(&self) -> f64 {
            self.0
        }
    }

    fn imu(t: f64) -> ImuSample {
        ImuSample::new(t, Vector3::new(0.0, 0.0, 9.81), Vector3::default())
    }

    #[test]
    fn test_slot_latest_wins() {
        let slot = BoundedLatestSlot::new();

        assert!(slot.put(Stamp(1.0, 1)).is_none());
        assert_eq!(slot.put(Stamp(2.0, 2)), Some(Stamp(1.0, 1)));
        assert_eq!(slot.put(Stamp(3.0, 3)), Some(Stamp(2.0, 2)));

        assert_eq!(slot.peek_timestamp(), Some(3.0));
        assert_eq!(slot.take(), Some(Stamp(3.0, 3)));
        assert!(slot.take().is_none());
        assert_eq!(slot.superseded_count(), 2);
    }

    #[test]
    fn test_slot_peek_does_not_consume() {
        let slot = BoundedLatestSlot::new();
        slot.put(Stamp(0.5, 0));

        assert_eq!(slot.peek_timestamp(), Some(0.5));
        assert_eq!(slot.peek_timestamp(), Some(0.5));
        assert_eq!(slot.len(), 1);
    }

    #[test]
    fn test_slot_take_if_rejects_overwritten_item() {
        let slot = BoundedLatestSlot::new();
        slot.put(Stamp(1.0, 0));
        let seen = slot.peek_timestamp().unwrap();

        // Producer overwrites between peek and take
        slot.put(Stamp(1.1, 1));

        assert!(slot.take_if(|s| s.0 == seen).is_none());
        assert_eq!(slot.peek_timestamp(), Some(1.1));
        assert_eq!(slot.take_if(|s| s.0 == 1.1), Some(Stamp(1.1, 1)));
    }

    #[test]
    fn test_slot_restore_only_when_empty() {
        let slot = BoundedLatestSlot::new();
        assert!(slot.restore(Stamp(1.0, 0)));
        assert_eq!(slot.peek_timestamp(), Some(1.0));

        assert!(!slot.restore(Stamp(0.9, 1)));
        assert_eq!(slot.peek_timestamp(), Some(1.0));
        assert_eq!(slot.superseded_count(), 1);
    }

    #[test]
    fn test_queue_front_back() {
        let queue = OrderedQueue::new();
        assert!(queue.front_timestamp().is_none());
        assert!(queue.back_timestamp().is_none());

        queue.push(imu(1.0));
        queue.push(imu(2.0));
        queue.push(imu(3.0));

        assert_eq!(queue.front_timestamp(), Some(1.0));
        assert_eq!(queue.back_timestamp(), Some(3.0));
        assert_eq!(queue.pop_front().unwrap().timestamp, 1.0);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_drain_up_to_inclusive_prefix() {
        let queue = OrderedQueue::new();
        for t in [0.1, 0.2, 0.3, 0.4] {
            queue.push(imu(t));
        }

        let window: Vec<f64> = queue.drain_up_to(0.3).iter().map(|s| s.timestamp).collect();
        assert_eq!(window, vec![0.1, 0.2, 0.3]);
        assert_eq!(queue.front_timestamp(), Some(0.4));

        // Nothing already drained comes back
        let again: Vec<f64> = queue.drain_up_to(0.5).iter().map(|s| s.timestamp).collect();
        assert_eq!(again, vec![0.4]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_drain_up_to_before_front_is_empty() {
        let queue = OrderedQueue::new();
        queue.push(imu(1.0));

        assert!(queue.drain_up_to(0.5).is_empty());
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_out_of_order_push_kept_in_arrival_order() {
        let queue = OrderedQueue::new();
        assert!(queue.push(imu(1.0)));
        assert!(queue.push(imu(3.0)));
        assert!(!queue.push(imu(2.0)));

        assert_eq!(queue.out_of_order_count(), 1);
        assert_eq!(queue.back_timestamp(), Some(2.0));

        // Drain stops at the first sample past the cutoff
        let window: Vec<f64> = queue.drain_up_to(2.5).iter().map(|s| s.timestamp).collect();
        assert_eq!(window, vec![1.0]);
    }

    #[test]
    fn test_concurrent_push_then_drain_loses_nothing() {
        let queue = Arc::new(OrderedQueue::new());
        let producers: Vec<_> = (0..4u32)
            .map(|p| {
                let queue = queue.clone();
                thread::spawn(move || {
                    for i in 0..250u32 {
                        queue.push(Stamp(f64::from(i), p));
                    }
                })
            })
            .collect();

        let mut drained = Vec::new();
        for handle in producers {
            handle.join().unwrap();
        }
        while !queue.is_empty() {
            drained.extend(queue.drain_up_to(f64::MAX));
        }

        assert_eq!(drained.len(), 1000);
        // Per-producer order survives interleaving
        for p in 0..4u32 {
            let seq: Vec<f64> = drained.iter().filter(|s| s.1 == p).map(|s| s.0).collect();
            assert!(seq.windows(2).all(|w| w[0] < w[1]));
        }
    }
}
