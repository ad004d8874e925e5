//! Device registry and state tracker.
//!
//! Per (device, code) the tracker runs a two-state machine: Unknown until
//! the first value arrives, then Known(value, timestamp). A value is only
//! overwritten by a message whose timestamp is not older than the stored
//! one, so out-of-order frames cannot corrupt current state.

pub mod registry;

use std::collections::VecDeque;

use time::OffsetDateTime;

pub use registry::{Device, DeviceRegistry, KnownValue};

use crate::message::{Message, Payload};
use crate::protocol::device::Address;
use crate::protocol::frame::Code;

/// Accepted messages kept for inspection, newest last.
const MAX_HISTORY: usize = 4096;

/// Outcome of applying one message to the tracker.
#[derive(Debug, Clone, PartialEq)]
pub enum Applied {
    /// The stored value changed; subscribers should be notified.
    Changed(StateChange),
    /// Fresh timestamp but an identical value; no notification.
    Unchanged,
    /// Older than the stored value; history only, state untouched.
    Stale,
}

/// A value-level change notification.
#[derive(Debug, Clone, PartialEq)]
pub struct StateChange {
    pub addr: Address,
    pub code: Code,
    pub prev: Option<Payload>,
    pub value: Payload,
    pub ts: OffsetDateTime,
}

/// One accepted message, as remembered by the history log.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRecord {
    pub addr: Address,
    pub code: Code,
    pub ts: OffsetDateTime,
    /// False for stale writes that left current state untouched.
    pub applied: bool,
}

/// Folds messages into per-device state. Single-writer by design: the
/// pipeline is the only mutator, so no locking is needed on the hot path.
#[derive(Debug, Default)]
pub struct StateTracker {
    registry: DeviceRegistry,
    history: VecDeque<HistoryRecord>,
}

impl StateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    pub fn history(&self) -> impl Iterator<Item = &HistoryRecord> {
        self.history.iter()
    }

    /// Apply one message: registers both endpoint devices, then updates
    /// the source device's last-known value for the message's code under
    /// the monotonic-per-code freshness rule.
    pub fn apply(&mut self, msg: &Message) -> Applied {
        if !msg.dst.is_unset() && msg.dst != msg.src {
            self.registry.resolve(msg.dst);
        }
        let device = self.registry.resolve(msg.src);

        let (applied, outcome) = match device.values.get(&msg.code) {
            Some(known) if msg.ts < known.ts => {
                tracing::debug!(addr = %msg.src, code = %msg.code, "stale write rejected");
                (false, Applied::Stale)
            }
            Some(known) if known.payload == msg.payload => {
                device.values.insert(
                    msg.code,
                    KnownValue {
                        payload: msg.payload.clone(),
                        ts: msg.ts,
                    },
                );
                (true, Applied::Unchanged)
            }
            previous => {
                let prev = previous.map(|known| known.payload.clone());
                device.values.insert(
                    msg.code,
                    KnownValue {
                        payload: msg.payload.clone(),
                        ts: msg.ts,
                    },
                );
                (
                    true,
                    Applied::Changed(StateChange {
                        addr: msg.src,
                        code: msg.code,
                        prev,
                        value: msg.payload.clone(),
                        ts: msg.ts,
                    }),
                )
            }
        };

        if self.history.len() == MAX_HISTORY {
            self.history.pop_front();
        }
        self.history.push_back(HistoryRecord {
            addr: msg.src,
            code: msg.code,
            ts: msg.ts,
            applied,
        });

        outcome
    }
}
