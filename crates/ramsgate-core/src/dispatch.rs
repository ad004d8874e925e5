use crate::message::Message;
use crate::tracker::StateChange;

/// Pipeline output delivered to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Every accepted message, including stale ones.
    Message(Message),
    /// Value-level changes only.
    StateChange(StateChange),
}

pub type SubscriberId = u64;
pub type SubscriberError = Box<dyn std::error::Error + Send + Sync>;

type Callback = Box<dyn FnMut(&Event) -> Result<(), SubscriberError> + Send>;

/// Fan-out of events to subscriber callbacks in registration order.
///
/// A failing subscriber is reported and counted, never propagated: one
/// bad callback cannot block delivery to the rest or halt the pipeline.
#[derive(Default)]
pub struct Dispatcher {
    subscribers: Vec<(SubscriberId, Callback)>,
    next_id: SubscriberId,
    delivery_errors: u64,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, callback: F) -> SubscriberId
    where
        F: FnMut(&Event) -> Result<(), SubscriberError> + Send + 'static,
    {
        let id = self.next_id;
        self.next_id += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    /// Remove a subscriber by handle. Returns false for unknown handles.
    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub_id, _)| *sub_id != id);
        self.subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn delivery_errors(&self) -> u64 {
        self.delivery_errors
    }

    pub fn dispatch(&mut self, event: &Event) {
        for (id, callback) in &mut self.subscribers {
            if let Err(err) = callback(event) {
                self.delivery_errors += 1;
                tracing::warn!(subscriber = *id, %err, "subscriber delivery failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use time::macros::datetime;

    use super::{Dispatcher, Event};
    use crate::message::{Message, Payload};
    use crate::protocol::device::Address;
    use crate::protocol::frame::{Code, Verb};

    fn event() -> Event {
        Event::Message(Message {
            ts: datetime!(2021-01-01 12:00 UTC),
            seq: None,
            verb: Verb::Info,
            src: Address::parse("01:123456").unwrap(),
            dst: Address::UNSET,
            code: Code::SYNC_CYCLE,
            payload: Payload::Opaque(vec![0x00]),
        })
    }

    #[test]
    fn delivery_follows_registration_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = Dispatcher::new();
        for tag in ["a", "b", "c"] {
            let seen = Arc::clone(&seen);
            dispatcher.subscribe(move |_| {
                seen.lock().unwrap().push(tag);
                Ok(())
            });
        }
        dispatcher.dispatch(&event());
        assert_eq!(*seen.lock().unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn failing_subscriber_does_not_block_later_ones() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = Dispatcher::new();
        dispatcher.subscribe(|_| Err("boom".into()));
        {
            let seen = Arc::clone(&seen);
            dispatcher.subscribe(move |_| {
                seen.lock().unwrap().push("after");
                Ok(())
            });
        }
        dispatcher.dispatch(&event());
        assert_eq!(*seen.lock().unwrap(), vec!["after"]);
        assert_eq!(dispatcher.delivery_errors(), 1);
    }

    #[test]
    fn unsubscribe_by_handle() {
        let seen = Arc::new(Mutex::new(0u32));
        let mut dispatcher = Dispatcher::new();
        let id = {
            let seen = Arc::clone(&seen);
            dispatcher.subscribe(move |_| {
                *seen.lock().unwrap() += 1;
                Ok(())
            })
        };
        dispatcher.dispatch(&event());
        assert!(dispatcher.unsubscribe(id));
        assert!(!dispatcher.unsubscribe(id));
        dispatcher.dispatch(&event());
        assert_eq!(*seen.lock().unwrap(), 1);
    }
}
