use thiserror::Error;

use crate::protocol::device::DeviceClass;
use crate::protocol::frame::Code;

/// A payload value outside a codec's declared domain.
///
/// Recoverable: on decode the caller falls back to opaque-byte storage,
/// on encode the error is surfaced to the command issuer.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("value out of domain: {reason}")]
    OutOfDomain { reason: String },
    #[error("missing or mistyped field: {field}")]
    BadField { field: &'static str },
}

impl DecodeError {
    pub fn out_of_domain(reason: impl Into<String>) -> Self {
        Self::OutOfDomain {
            reason: reason.into(),
        }
    }
}

/// Duplicate codec registration. Fatal at table build time only.
#[derive(Debug, Error)]
#[error("duplicate codec registration for {code}/{class:?}")]
pub struct RegistryConflict {
    pub code: Code,
    pub class: Option<DeviceClass>,
}
