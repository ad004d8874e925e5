use std::collections::{BTreeMap, HashMap};

use time::OffsetDateTime;

use crate::message::Payload;
use crate::protocol::device::{Address, DeviceClass};
use crate::protocol::frame::Code;
use crate::{CodeState, DeviceSummary};

/// Last-known value for one (device, code) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct KnownValue {
    pub payload: Payload,
    pub ts: OffsetDateTime,
}

/// Canonical entity for one observed address.
///
/// Owned exclusively by the [`DeviceRegistry`]; messages and the tracker
/// refer to devices by address only.
#[derive(Debug, Clone)]
pub struct Device {
    pub addr: Address,
    pub class: DeviceClass,
    pub(crate) values: BTreeMap<Code, KnownValue>,
}

impl Device {
    fn new(addr: Address) -> Self {
        Self {
            addr,
            class: DeviceClass::from_address(&addr),
            values: BTreeMap::new(),
        }
    }

    pub fn value(&self, code: Code) -> Option<&KnownValue> {
        self.values.get(&code)
    }

    pub fn codes(&self) -> impl Iterator<Item = Code> + '_ {
        self.values.keys().copied()
    }
}

/// Append-only mapping from address to device.
///
/// Entries are created on first observation and never removed during a
/// session; all mutation funnels through the state tracker.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: HashMap<Address, Device>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The device for `addr`, created (with its class inferred from the
    /// address prefix) if this is the first sighting.
    pub fn resolve(&mut self, addr: Address) -> &mut Device {
        self.devices.entry(addr).or_insert_with(|| Device::new(addr))
    }

    pub fn get(&self, addr: &Address) -> Option<&Device> {
        self.devices.get(addr)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Immutable snapshot of every device, in stable address order.
    pub fn summaries(&self) -> Vec<DeviceSummary> {
        let mut devices: Vec<&Device> = self.devices.values().collect();
        devices.sort_by_key(|device| device.addr);
        devices
            .into_iter()
            .map(|device| DeviceSummary {
                address: device.addr.to_string(),
                class: device.class.label().to_string(),
                codes: device
                    .values
                    .iter()
                    .map(|(code, known)| CodeState {
                        code: code.to_string(),
                        value: known.payload.as_value().cloned(),
                        raw: known.payload.raw_hex(),
                        last_seen: crate::pipeline::ts_to_rfc3339(Some(known.ts))
                            .unwrap_or_else(|| crate::DEFAULT_GENERATED_AT.to_string()),
                    })
                    .collect(),
            })
            .collect()
    }
}
