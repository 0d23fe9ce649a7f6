use std::fmt;

use thiserror::Error;

/// Category of a driver result.
///
/// Numeric codes follow the legacy immediate-mode driver convention so logs
/// from different backends stay comparable.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ResultKind {
    /// Driver refused to create the device.
    CannotCreate,
    /// Device is lost and cannot be reset yet.
    DeviceLost,
    /// Device is lost and ready to be reset.
    NotReset,
    /// Unrecoverable driver failure.
    DriverInternalError,
    /// Not enough video memory for the requested resources.
    OutOfVideoMemory,
    /// The call was invalid for the current device configuration.
    InvalidCall,
    /// Requested format or mode is not available on this adapter.
    NotAvailable,
}

impl ResultKind {
    /// Conventional numeric code for this kind.
    pub const fn code(self) -> u32 {
        match self {
            ResultKind::CannotCreate => 0x8876_0866,
            ResultKind::DeviceLost => 0x8876_0868,
            ResultKind::NotReset => 0x8876_0869,
            ResultKind::DriverInternalError => 0x8876_0827,
            ResultKind::OutOfVideoMemory => 0x8876_017C,
            ResultKind::InvalidCall => 0x8876_086C,
            ResultKind::NotAvailable => 0x8876_086A,
        }
    }
}

/// Structured driver result: kind + numeric code + description.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ResultCode {
    pub kind: ResultKind,
    pub code: u32,
    pub description: String,
}

impl ResultCode {
    pub fn new(kind: ResultKind, description: impl Into<String>) -> Self {
        Self {
            kind,
            code: kind.code(),
            description: description.into(),
        }
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} (0x{:08X}): {}", self.kind, self.code, self.description)
    }
}

impl std::error::Error for ResultCode {}

/// Errors surfaced by the device context and its resources.
///
/// Transient loss is never reported here; the state machine absorbs it and
/// drops draw calls until recovery.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("cannot create device: {0}")]
    CannotCreate(ResultCode),
    #[error("unrecoverable driver error during reset: {0}")]
    ResetFailed(ResultCode),
    #[error("device still not resettable after {attempts} reset attempts")]
    ResetRetriesExhausted { attempts: u32 },
    #[error("driver call failed: {0}")]
    Driver(#[from] ResultCode),
    #[error("unrecoverable driver error reported by probe: {0}")]
    DriverFailed(ResultCode),
    #[error("device has been destroyed")]
    Destroyed,
    #[error("device has not been created; call set_mode first")]
    NotInitialized,
    #[error("render target {requested} cannot begin drawing: {active} is already nested inside {previous}")]
    NestingTooDeep {
        requested: u64,
        active: u64,
        previous: u64,
    },
    #[error("device resource {0} is borrowed elsewhere during notification")]
    ResourceBusy(u64),
}

impl DeviceError {
    /// Returns true for errors after which the context can no longer render.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DeviceError::CannotCreate(_)
                | DeviceError::ResetFailed(_)
                | DeviceError::ResetRetriesExhausted { .. }
                | DeviceError::DriverFailed(_)
                | DeviceError::Destroyed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_code_carries_conventional_code() {
        let rc = ResultCode::new(ResultKind::DriverInternalError, "hang");
        assert_eq!(rc.code, 0x8876_0827);
        assert_eq!(rc.to_string(), "DriverInternalError (0x88760827): hang");
    }

    #[test]
    fn fatal_classification() {
        let rc = ResultCode::new(ResultKind::CannotCreate, "no adapter");
        assert!(DeviceError::CannotCreate(rc.clone()).is_fatal());
        assert!(!DeviceError::Driver(rc).is_fatal());
        assert!(!DeviceError::ResourceBusy(3).is_fatal());
    }
}
