//! Bounded notification queue that keeps the newest entries.
//!
//! When the consumer falls behind, the oldest pending item is evicted to make
//! room. Intermediate changes may be lost; the latest one never is.

use crossbeam_channel::{Receiver, Sender, TrySendError};
use tracing::trace;

pub struct Publisher<T> {
    tx: Sender<T>,
    evict: Receiver<T>,
}

/// Creates a queue holding at most `capacity` items (at least one).
pub fn bounded<T>(capacity: usize) -> (Publisher<T>, Receiver<T>) {
    let (tx, rx) = crossbeam_channel::bounded(capacity.max(1));
    let publisher = Publisher {
        tx,
        evict: rx.clone(),
    };
    (publisher, rx)
}

impl<T> Publisher<T> {
    /// Enqueues `item`, returning how many older items were dropped for it.
    pub fn publish(&self, mut item: T) -> usize {
        let mut evicted = 0;
        loop {
            match self.tx.try_send(item) {
                Ok(()) => return evicted,
                Err(TrySendError::Full(rejected)) => {
                    item = rejected;
                    if self.evict.try_recv().is_ok() {
                        evicted += 1;
                        trace!("queue full, dropped oldest notification");
                    }
                }
                // The publisher holds a receiver, so the channel can't disconnect under it.
                Err(TrySendError::Disconnected(_)) => return evicted,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_arrival_order_below_capacity() {
        let (publisher, rx) = bounded(4);
        for value in 1..=3 {
            assert_eq!(publisher.publish(value), 0);
        }
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn full_queue_drops_the_oldest() {
        let (publisher, rx) = bounded(2);
        publisher.publish(1);
        publisher.publish(2);
        assert_eq!(publisher.publish(3), 1);
        assert_eq!(publisher.publish(4), 1);
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![3, 4]);
    }

    #[test]
    fn zero_capacity_still_buffers_one() {
        let (publisher, rx) = bounded(0);
        publisher.publish("a");
        publisher.publish("b");
        assert_eq!(rx.try_recv(), Ok("b"));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn dropping_publisher_disconnects_consumer() {
        let (publisher, rx) = bounded::<u8>(1);
        publisher.publish(7);
        drop(publisher);
        assert_eq!(rx.recv(), Ok(7));
        assert!(rx.recv().is_err());
    }
}
