//! One-time bring-up: switch the display off, then acquire the bus and the
//! device the main loop will own.

use crate::error::{
    Error,
    Fault,
};

/// The display subsystem as seen by the teardown step.
pub trait DisplayTeardown {
    /// Release whatever holds the display controller.
    fn release_display_resources(&mut self) -> Result<(), Error>;

    /// Drive the backlight pin. Boards without one return
    /// [`Error::PinMissing`].
    fn set_backlight(&mut self, on: bool) -> Result<(), Error>;
}

/// Bus and device construction.
#[allow(async_fn_in_trait)]
pub trait Acquire {
    type Bus;
    type Device;

    /// Names used in diagnostics.
    const BUS: &'static str;
    const DEVICE: &'static str;

    fn open_bus(&mut self) -> Result<Self::Bus, Error>;

    async fn construct(&mut self, bus: Self::Bus) -> Result<Self::Device, Error>;
}

/// What happened to the backlight during teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Backlight {
    Off,
    Missing,
    Failed(Error),
}

/// Outcome of the teardown step. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TeardownReport {
    pub release: Result<(), Error>,
    pub backlight: Backlight,
}

impl TeardownReport {
    pub const fn is_clean(&self) -> bool {
        self.release.is_ok() && matches!(self.backlight, Backlight::Off)
    }
}

/// Release the display and switch its backlight off. Never fails.
pub fn teardown<T: DisplayTeardown>(display: &mut T) -> TeardownReport {
    info!("Starting power-saving routine: disabling TFT display");

    let release = display.release_display_resources();
    match &release {
        Ok(()) => info!("  -> Display resources released"),
        Err(err) => warn!("  -> {}", Fault::Teardown(*err)),
    }

    let backlight = match display.set_backlight(false) {
        Ok(()) => {
            info!("  -> Backlight pin set LOW, display should be off");
            Backlight::Off
        }
        Err(Error::PinMissing(name)) => {
            warn!("  -> WARNING: backlight pin `{}` not found", name);
            Backlight::Missing
        }
        Err(err) => {
            error!("  -> {}", Fault::Teardown(err));
            Backlight::Failed(err)
        }
    };

    info!("TFT display shutdown sequence complete");
    TeardownReport { release, backlight }
}

/// Open the bus, then construct the device on it. Any failure is an
/// acquisition fault.
pub async fn acquire<A: Acquire>(acquire: &mut A) -> Result<A::Device, Fault> {
    let bus = acquire.open_bus().map_err(|err| {
        error!("Error initialising {}: {}", A::BUS, err);
        Fault::Acquisition(err)
    })?;
    info!("{} initialised", A::BUS);

    let device = acquire.construct(bus).await.map_err(|err| {
        error!("Could not initialise {}: {}", A::DEVICE, err);
        Fault::Acquisition(err)
    })?;
    info!("{} found and initialised", A::DEVICE);

    Ok(device)
}

/// Teardown followed by acquisition. Runs once, before the main loop.
pub async fn bring_up<T: DisplayTeardown, A: Acquire>(
    display: &mut T,
    acquirer: &mut A,
) -> Result<A::Device, Fault> {
    let report = teardown(display);
    if !report.is_clean() {
        debug!("Teardown finished with {:?}", report);
    }
    acquire(acquirer).await
}
