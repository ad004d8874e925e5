use std::collections::HashMap;

use serde_json::Value;

use super::error::{DecodeError, RegistryConflict};
use crate::protocol::device::DeviceClass;
use crate::protocol::frame::Code;

pub type DecodeFn = fn(&[u8]) -> Result<Value, DecodeError>;
pub type EncodeFn = fn(&Value) -> Result<Vec<u8>, DecodeError>;

/// A pure decode/encode function pair plus the code's expected payload
/// length (`None` skips the length check, for variable-length payloads).
#[derive(Debug, Clone, Copy)]
pub struct CodecEntry {
    pub expected_len: Option<usize>,
    pub decode: DecodeFn,
    pub encode: EncodeFn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CodecKey {
    code: Code,
    class: Option<DeviceClass>,
}

/// Builder for the immutable [`CodecTable`]. Registering a duplicate
/// (code, class) key fails fast, at initialization rather than runtime.
#[derive(Debug, Default)]
pub struct CodecTableBuilder {
    entries: HashMap<CodecKey, CodecEntry>,
}

impl CodecTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        code: Code,
        class: Option<DeviceClass>,
        entry: CodecEntry,
    ) -> Result<&mut Self, RegistryConflict> {
        let key = CodecKey { code, class };
        if self.entries.contains_key(&key) {
            return Err(RegistryConflict { code, class });
        }
        self.entries.insert(key, entry);
        Ok(self)
    }

    pub fn build(self) -> CodecTable {
        CodecTable {
            entries: self.entries,
        }
    }
}

/// Immutable mapping from (code, device-class-or-wildcard) to codec
/// entries. Built once at startup and injected where needed; never
/// accessed as ambient global state.
#[derive(Debug)]
pub struct CodecTable {
    entries: HashMap<CodecKey, CodecEntry>,
}

impl CodecTable {
    /// Class-specific entry when present, wildcard otherwise.
    pub fn lookup(&self, code: Code, class: DeviceClass) -> Option<&CodecEntry> {
        self.entries
            .get(&CodecKey {
                code,
                class: Some(class),
            })
            .or_else(|| self.entries.get(&CodecKey { code, class: None }))
    }

    pub fn expected_len(&self, code: Code, class: DeviceClass) -> Option<usize> {
        self.lookup(code, class).and_then(|entry| entry.expected_len)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
