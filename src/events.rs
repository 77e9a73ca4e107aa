use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

/// Fan-out queue for widget lifecycle events.
///
/// Emitters push into every live subscriber queue; subscribers drain their
/// queue from the frame thread with [`Subscription::poll`]. Events are
/// never delivered mid-update.
#[derive(Debug)]
pub struct EventHub<E> {
    inner: Arc<Mutex<HubInner<E>>>,
}

#[derive(Debug)]
struct HubInner<E> {
    queues: Vec<(u64, VecDeque<E>)>,
    next_id: u64,
}

impl<E> Clone for EventHub<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E> Default for EventHub<E> {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(HubInner {
                queues: Vec::new(),
                next_id: 0,
            })),
        }
    }
}

impl<E> EventHub<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a subscriber. The subscription unregisters itself when
    /// dropped, so attaching a widget cannot leak a queue.
    pub fn subscribe(&self) -> Subscription<E> {
        let mut inner = self.inner.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.queues.push((id, VecDeque::new()));
        Subscription {
            inner: Arc::clone(&self.inner),
            id,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().queues.len()
    }
}

impl<E: Clone> EventHub<E> {
    /// Queues the event for every current subscriber.
    pub fn emit(&self, event: E) {
        let mut inner = self.inner.lock();
        for (_, queue) in inner.queues.iter_mut() {
            queue.push_back(event.clone());
        }
    }
}

/// Handle to one subscriber queue of an [`EventHub`].
#[derive(Debug)]
pub struct Subscription<E> {
    inner: Arc<Mutex<HubInner<E>>>,
    id: u64,
}

impl<E> Subscription<E> {
    /// Pops the oldest undelivered event, if any.
    pub fn poll(&self) -> Option<E> {
        let mut inner = self.inner.lock();
        let (_, queue) = inner.queues.iter_mut().find(|(id, _)| *id == self.id)?;
        queue.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        let inner = self.inner.lock();
        inner
            .queues
            .iter()
            .find(|(id, _)| *id == self.id)
            .map_or(true, |(_, queue)| queue.is_empty())
    }
}

impl<E> Drop for Subscription<E> {
    fn drop(&mut self) {
        let mut inner = self.inner.lock();
        inner.queues.retain(|(id, _)| *id != self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_reach_every_subscriber_in_order() {
        let hub = EventHub::new();
        let first = hub.subscribe();
        let second = hub.subscribe();
        hub.emit(1);
        hub.emit(2);
        assert_eq!(first.poll(), Some(1));
        assert_eq!(first.poll(), Some(2));
        assert_eq!(first.poll(), None);
        assert_eq!(second.poll(), Some(1));
        assert_eq!(second.poll(), Some(2));
    }

    #[test]
    fn events_before_subscribing_are_not_replayed() {
        let hub = EventHub::new();
        hub.emit("early");
        let sub = hub.subscribe();
        assert!(sub.is_empty());
        assert_eq!(sub.poll(), None);
    }

    #[test]
    fn dropping_a_subscription_unregisters_it() {
        let hub = EventHub::new();
        let sub = hub.subscribe();
        assert_eq!(hub.subscriber_count(), 1);
        drop(sub);
        assert_eq!(hub.subscriber_count(), 0);
        hub.emit(());
    }

    #[test]
    fn hub_clones_share_subscribers() {
        let hub = EventHub::new();
        let sub = hub.subscribe();
        let writer = hub.clone();
        writer.emit(7);
        assert_eq!(sub.poll(), Some(7));
    }
}
