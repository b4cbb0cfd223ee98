//! Capability interfaces for the devices the main loop talks to.

use crate::{
    effects::Frame,
    error::Error,
};

/// Number of addressable pixels driven by the firmware.
pub const PIXEL_COUNT: usize = 1;

/// Something that can show a [`Frame`].
///
/// One call is one bus transaction: the color is staged and committed with a
/// single explicit show.
#[allow(async_fn_in_trait)]
pub trait PixelSink {
    async fn apply(&mut self, frame: Frame) -> Result<(), Error>;
}

impl<T: PixelSink + ?Sized> PixelSink for &mut T {
    async fn apply(&mut self, frame: Frame) -> Result<(), Error> {
        (**self).apply(frame).await
    }
}

/// A sensor that returns one complete reading per call.
#[allow(async_fn_in_trait)]
pub trait Readable {
    type Reading: Report;

    async fn read(&mut self) -> Result<Self::Reading, Error>;
}

impl<T: Readable + ?Sized> Readable for &mut T {
    type Reading = T::Reading;

    async fn read(&mut self) -> Result<Self::Reading, Error> {
        (**self).read().await
    }
}

/// Writes a reading to the diagnostic output.
pub trait Report {
    fn report(&self);
}

/// Unwrap a transfer whose failure hands the driver handle back, storing
/// that handle in `slot` so the next transfer can use it.
#[cfg_attr(not(feature = "board"), allow(dead_code))]
pub(crate) fn keep_on_error<T, E, C>(
    slot: &mut Option<C>,
    outcome: Result<T, (E, C)>,
) -> Result<T, E> {
    outcome.map_err(|(err, handle)| {
        *slot = Some(handle);
        err
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_transfer_returns_the_handle() {
        let mut slot = Some(7_u8);
        let handle = slot.take().unwrap();
        let outcome: Result<(), _> = keep_on_error(&mut slot, Err((Error::Transmit, handle)));
        assert_eq!(outcome, Err(Error::Transmit));
        assert_eq!(slot, Some(7));
    }

    #[test]
    fn successful_transfer_leaves_the_slot_to_the_caller() {
        let mut slot: Option<u8> = None;
        let outcome = keep_on_error::<_, Error, _>(&mut slot, Ok("pending"));
        assert_eq!(outcome, Ok("pending"));
        assert_eq!(slot, None);
    }
}
