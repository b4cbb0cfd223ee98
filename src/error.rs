//! Device faults and the policy that decides which of them stop the firmware.

use embedded_hal::i2c::{
    self,
    ErrorKind,
    NoAcknowledgeSource,
};

/// Anything that can go wrong while talking to the pixel, the sensor, the
/// bus or the display pins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    #[error("I2C transaction failed: {0:?}")]
    I2c(ErrorKind),
    #[error("no device answered at address {address:#04x}")]
    DeviceNotFound { address: u8 },
    #[error("unexpected chip id {found:#04x} at {address:#04x} (expected {expected:#04x})")]
    UnexpectedChipId { address: u8, found: u8, expected: u8 },
    #[error("sensor calibration data produced an invalid result")]
    InvalidCalibration,
    #[error("sensor has no conversion result yet")]
    SkippedSample,
    #[error("RMT transmit failed")]
    Transmit,
    #[error("RMT channel lost during a previous transmission")]
    ChannelLost,
    #[error("bus initialisation failed")]
    BusInit,
    #[error("pin `{0}` not found on this board")]
    PinMissing(&'static str),
    #[error("display resources could not be released")]
    DisplayRelease,
}

impl Error {
    pub(crate) fn i2c(err: impl i2c::Error) -> Self {
        Self::I2c(err.kind())
    }

    /// The addressed device did not acknowledge its address byte.
    pub const fn is_address_nack(&self) -> bool {
        matches!(
            self,
            Self::I2c(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address))
                | Self::DeviceNotFound { .. }
        )
    }
}

/// What the firmware does after a fault has been logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Recovery {
    /// Carry on with the next step or the next iteration.
    Continue,
    /// Enter the idle halt and never leave it.
    Halt,
}

/// An [`Error`] tagged with the stage it happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Fault {
    /// Display teardown during bring-up. Best effort.
    #[error("display teardown: {0}")]
    Teardown(Error),
    /// Bus or device acquisition during bring-up.
    #[error("device acquisition: {0}")]
    Acquisition(Error),
    /// A single pass of the main loop.
    #[error("iteration: {0}")]
    Iteration(Error),
}

impl Fault {
    /// Policy table: only acquisition faults are fatal.
    pub const fn recovery(&self) -> Recovery {
        match self {
            Self::Teardown(_) | Self::Iteration(_) => Recovery::Continue,
            Self::Acquisition(_) => Recovery::Halt,
        }
    }

    pub const fn cause(&self) -> &Error {
        match self {
            Self::Teardown(err) | Self::Acquisition(err) | Self::Iteration(err) => err,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_acquisition_faults_halt() {
        assert_eq!(Fault::Teardown(Error::DisplayRelease).recovery(), Recovery::Continue);
        assert_eq!(Fault::Iteration(Error::Transmit).recovery(), Recovery::Continue);
        assert_eq!(Fault::Acquisition(Error::BusInit).recovery(), Recovery::Halt);
    }

    #[test]
    fn address_nack_is_recognised() {
        let nack = Error::I2c(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
        assert!(nack.is_address_nack());
        assert!(!Error::I2c(ErrorKind::Bus).is_address_nack());
    }
}
