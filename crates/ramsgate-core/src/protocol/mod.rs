//! Protocol decoding modules.
//!
//! Each area follows a layered structure:
//! - `layout`: wire grammar, field widths, checksum algorithm (source of truth)
//! - `reader`: safe token/byte access and protocol conventions
//! - `parser`: domain-level decoding (no direct token indexing)
//! - `error`: explicit, actionable errors
//!
//! Parsers are pure and contain no I/O; sources and the pipeline handle
//! transport access and state aggregation.

pub mod codec;
pub mod device;
pub mod frame;
