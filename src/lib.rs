//! # feather-pulse
//!
//! Firmware library for the Adafruit Feather ESP32-S3 TFT.
//!
//! The board switches its TFT off to save power and then runs one of two
//! workloads forever:
//! - **Animation**: one WS2812 pixel driven by an [`Effect`] (hue wheel,
//!   two-color blink, breathing, fire flicker, ocean wave).
//! - **Monitor**: an I2C sensor (BMP280 or QMI8658C) polled and reported.
//!
//! Everything but the `board` feature is hardware independent and runs on
//! the host.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! let peripherals = feather_pulse::init();
//! let resources = feather_pulse::split_resources!(peripherals);
//!
//! feather_pulse::board::animate(
//!     resources,
//!     HueWheel::default(),
//!     Pace::fixed(Duration::from_millis(10)),
//! )
//! .await
//! ```

#![cfg_attr(not(test), no_std)]

mod fmt;

pub mod bmp280;
pub mod bringup;
pub mod driver;
pub mod effects;
pub mod error;
pub mod qmi8658;
mod registers;
pub mod scheduler;
pub mod sink;

#[cfg(feature = "board")]
mod backlight;
#[cfg(feature = "board")]
pub mod board;
#[cfg(feature = "board")]
mod leds;

#[cfg(feature = "board")]
pub use backlight::{
    Backlight,
    TftDisplay,
};
pub use driver::{
    Animation,
    Lifecycle,
    LoopDriver,
    Monitor,
    State,
};
pub use effects::{
    Breathing,
    Effect,
    Flicker,
    Frame,
    HueWheel,
    TwoColor,
    Wave,
};
pub use error::{
    Error,
    Fault,
    Recovery,
};
#[cfg(feature = "board")]
pub use leds::Neopixel;
pub use scheduler::Pace;
pub use sink::PIXEL_COUNT;

#[cfg(feature = "board")]
use esp_hal::{
    assign_resources,
    clock::CpuClock,
};

// ── Pin / peripheral assignments ────────────────────────────────────────────

#[cfg(feature = "board")]
assign_resources! {
    pub Resources<'d> {
        display: DisplayResources<'d> {
            backlight: GPIO45,
            cs: GPIO7,
            dc: GPIO39,
            rst: GPIO40,
        },
        neopixel: NeopixelResources<'d> {
            power: GPIO34,
            io: GPIO33,
            rmt: RMT,
        },
        i2c: I2cResources<'d> {
            power: GPIO21,
            sda: GPIO42,
            scl: GPIO41,
            i2c: I2C0,
        },
    }
}

// ── Board initialisation ────────────────────────────────────────────────────

/// Initialise the chip and return the raw peripheral set.
///
/// Call this once at the top of `main`, then use [`split_resources!`] to
/// break the peripherals into typed resource groups.
#[cfg(feature = "board")]
#[must_use]
pub fn init() -> esp_hal::peripherals::Peripherals {
    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    esp_hal::init(config)
}

#[cfg(feature = "board")]
impl From<esp_hal::peripherals::Peripherals> for Resources<'_> {
    fn from(peripherals: esp_hal::peripherals::Peripherals) -> Self {
        split_resources!(peripherals)
    }
}
