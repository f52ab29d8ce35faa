use std::sync::mpsc::{self, Receiver, Sender};

use crate::canvas::sizer::ContainerMetrics;

/// Broadcasts viewport resizes to every attached surface.
///
/// Subscribers are removed with [`ViewportEvents::unsubscribe`], or pruned
/// on the next publish once their [`ViewportSubscription`] is dropped.
#[derive(Debug, Default)]
pub struct ViewportEvents {
    next_id: u64,
    subscribers: Vec<(u64, Sender<ContainerMetrics>)>,
}

impl ViewportEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> ViewportSubscription {
        let id = self.next_id;
        self.next_id += 1;
        let (tx, rx) = mpsc::channel();
        self.subscribers.push((id, tx));
        tracing::debug!("viewport subscriber {id} attached");
        ViewportSubscription { id, rx }
    }

    pub fn unsubscribe(&mut self, id: u64) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub, _)| *sub != id);
        let removed = self.subscribers.len() != before;
        if removed {
            tracing::debug!("viewport subscriber {id} detached");
        }
        removed
    }

    /// Sends `metrics` to every live subscriber and returns how many received it.
    pub fn publish(&mut self, metrics: ContainerMetrics) -> usize {
        self.subscribers.retain(|(_, tx)| tx.send(metrics).is_ok());
        self.subscribers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

#[derive(Debug)]
pub struct ViewportSubscription {
    id: u64,
    rx: Receiver<ContainerMetrics>,
}

impl ViewportSubscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Drains pending notifications and keeps only the most recent, so a
    /// burst of resizes costs one redraw.
    pub fn latest(&self) -> Option<ContainerMetrics> {
        self.rx.try_iter().last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(width: f32) -> ContainerMetrics {
        ContainerMetrics {
            content_width: width,
            viewport_height: 600.0,
        }
    }

    #[test]
    fn bursts_coalesce_to_the_last_size() {
        let mut events = ViewportEvents::new();
        let sub = events.subscribe();
        events.publish(metrics(300.0));
        events.publish(metrics(350.0));
        events.publish(metrics(400.0));

        assert_eq!(sub.latest(), Some(metrics(400.0)));
        assert_eq!(sub.latest(), None);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let mut events = ViewportEvents::new();
        let first = events.subscribe();
        let second = events.subscribe();

        assert!(events.unsubscribe(first.id()));
        assert!(!events.unsubscribe(first.id()));
        assert_eq!(events.publish(metrics(500.0)), 1);
        assert_eq!(first.latest(), None);
        assert_eq!(second.latest(), Some(metrics(500.0)));
    }

    #[test]
    fn dropped_subscriptions_are_pruned_on_publish() {
        let mut events = ViewportEvents::new();
        let sub = events.subscribe();
        drop(sub);
        assert_eq!(events.subscriber_count(), 1);
        assert_eq!(events.publish(metrics(200.0)), 0);
        assert_eq!(events.subscriber_count(), 0);
    }
}
