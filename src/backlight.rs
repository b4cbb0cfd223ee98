//! TFT backlight and display controller pins.

use esp_hal::gpio::{
    Level,
    Output,
    OutputConfig,
};

use crate::{
    DisplayResources,
    bringup::DisplayTeardown,
    error::Error,
};

/// Controls the display backlight LED.
pub struct Backlight {
    pin: Output<'static>,
}

impl Backlight {
    /// Starts dark.
    pub fn new(pin: Output<'static>) -> Self {
        let mut backlight = Self { pin };
        backlight.off();
        backlight
    }

    pub fn on(&mut self) {
        self.pin.set_high();
    }

    pub fn off(&mut self) {
        self.pin.set_low();
    }

    pub fn is_on(&self) -> bool {
        self.pin.is_set_high()
    }
}

/// The ST7789 on the Feather, never initialised by this firmware.
///
/// Its control pins are claimed so the controller stays deselected and held
/// in reset for as long as this value lives.
pub struct TftDisplay {
    cs: Output<'static>,
    rst: Output<'static>,
    _dc: Output<'static>,
    backlight: Option<Backlight>,
}

impl From<DisplayResources<'static>> for TftDisplay {
    fn from(res: DisplayResources<'static>) -> Self {
        Self {
            cs: Output::new(res.cs, Level::High, OutputConfig::default()),
            rst: Output::new(res.rst, Level::Low, OutputConfig::default()),
            _dc: Output::new(res.dc, Level::Low, OutputConfig::default()),
            backlight: Some(Backlight::new(Output::new(
                res.backlight,
                Level::Low,
                OutputConfig::default(),
            ))),
        }
    }
}

impl TftDisplay {
    /// Give up the backlight pin, e.g. to drive it from elsewhere.
    pub fn take_backlight(&mut self) -> Option<Backlight> {
        self.backlight.take()
    }
}

impl DisplayTeardown for TftDisplay {
    fn release_display_resources(&mut self) -> Result<(), Error> {
        self.cs.set_high();
        self.rst.set_low();
        if self.cs.is_set_high() && self.rst.is_set_low() {
            Ok(())
        } else {
            Err(Error::DisplayRelease)
        }
    }

    fn set_backlight(&mut self, on: bool) -> Result<(), Error> {
        let backlight = self
            .backlight
            .as_mut()
            .ok_or(Error::PinMissing("TFT_BACKLIGHT"))?;
        if on {
            backlight.on();
        } else {
            backlight.off();
        }
        Ok(())
    }
}
