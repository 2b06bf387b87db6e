//! Events published by the bridge and the bus that carries them.

use std::collections::BTreeMap;
use std::sync::Arc;

use lockbox_domain::Item;
use tokio::sync::broadcast;

use crate::error::DataStoreError;

/// A state change or failure reported by the bridge.
#[derive(Debug, Clone, PartialEq)]
pub enum DataStoreEvent {
    Opened(bool),
    Initialized(bool),
    Locked(bool),
    ItemsListed(BTreeMap<String, Item>),
    ItemUpdated(Item),
    Error(DataStoreError),
}

impl DataStoreEvent {
    pub fn is_error(&self) -> bool {
        matches!(self, DataStoreEvent::Error(_))
    }

    /// The error carried by this event, if any.
    pub fn error(&self) -> Option<&DataStoreError> {
        match self {
            DataStoreEvent::Error(e) => Some(e),
            _ => None,
        }
    }
}

/// Anything that accepts bridge events.
///
/// The application's central bus implements this; the bridge only ever
/// publishes to it.
pub trait Dispatcher: Send + Sync {
    fn dispatch(&self, event: DataStoreEvent);
}

impl<T: Dispatcher + ?Sized> Dispatcher for Arc<T> {
    fn dispatch(&self, event: DataStoreEvent) {
        (**self).dispatch(event)
    }
}

impl<T: Dispatcher + ?Sized> Dispatcher for Box<T> {
    fn dispatch(&self, event: DataStoreEvent) {
        self.as_ref().dispatch(event)
    }
}

/// A fan-out bus backed by a tokio broadcast channel.
///
/// Every subscriber sees every event published after it subscribed.
/// Subscribers that fall more than `capacity` events behind lose the
/// oldest ones.
#[derive(Debug, Clone)]
pub struct BroadcastDispatcher {
    tx: broadcast::Sender<DataStoreEvent>,
}

impl BroadcastDispatcher {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DataStoreEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Dispatcher for BroadcastDispatcher {
    fn dispatch(&self, event: DataStoreEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("no listeners for datastore event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fans_out_to_every_subscriber() {
        let bus = BroadcastDispatcher::new(8);
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        bus.dispatch(DataStoreEvent::Locked(true));

        assert_eq!(a.recv().await.unwrap(), DataStoreEvent::Locked(true));
        assert_eq!(b.recv().await.unwrap(), DataStoreEvent::Locked(true));
    }

    #[test]
    fn dispatch_without_listeners_is_fine() {
        let bus = BroadcastDispatcher::new(1);
        bus.dispatch(DataStoreEvent::Opened(false));
    }

    #[test]
    fn late_subscriber_misses_earlier_events() {
        let bus = BroadcastDispatcher::new(4);
        bus.dispatch(DataStoreEvent::Opened(true));
        let mut late = bus.subscribe();
        assert!(late.try_recv().is_err());
    }

    #[test]
    fn error_accessors() {
        let event = DataStoreEvent::Error(DataStoreError::Locked);
        assert!(event.is_error());
        assert_eq!(event.error(), Some(&DataStoreError::Locked));
        assert_eq!(DataStoreEvent::Initialized(true).error(), None);
    }
}
