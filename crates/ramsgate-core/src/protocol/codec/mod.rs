//! Payload codec registry: (code, device-class) → decode/encode pairs.
//!
//! The table is built once at process start via explicit registration and
//! immutable thereafter; it is injected into message decoding and the
//! command encoder rather than consulted as global state.

pub mod builtin;
pub mod error;
pub mod table;

pub use builtin::default_table;
pub use error::{DecodeError, RegistryConflict};
pub use table::{CodecEntry, CodecTable, CodecTableBuilder, DecodeFn, EncodeFn};
