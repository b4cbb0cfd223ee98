//! WS2812 NeoPixel driver using the RMT peripheral.
//!
//! The Feather has a single pixel behind its own power switch.

use esp_hal::{
    Blocking,
    gpio::{
        Level,
        Output,
    },
    rmt::{
        PulseCode,
        Tx,
    },
};
use palette::Srgb;

use crate::{
    effects::Frame,
    error::Error,
    sink::{
        PIXEL_COUNT,
        PixelSink,
        keep_on_error,
    },
};

const PULSES_PER_PIXEL: usize = 24;

/// WS2812 pixel driver.
///
/// Keeps the color in memory; [`show`](Neopixel::show) pushes it out.
pub struct Neopixel<'a> {
    channel: Option<esp_hal::rmt::Channel<'a, Blocking, Tx>>,
    pixels: [Srgb<u8>; PIXEL_COUNT],
    _power: Output<'a>,
}

impl<'a> Neopixel<'a> {
    /// `power` must already be driven high and is held for the driver's
    /// lifetime.
    pub const fn new(channel: esp_hal::rmt::Channel<'a, Blocking, Tx>, power: Output<'a>) -> Self {
        Self {
            channel: Some(channel),
            pixels: [Srgb::new(0, 0, 0); PIXEL_COUNT],
            _power: power,
        }
    }

    pub const fn set(&mut self, color: Srgb<u8>) {
        self.pixels[0] = color;
    }

    pub fn clear(&mut self) {
        self.pixels.fill(Srgb::new(0, 0, 0));
    }

    /// Transmit the pixel buffer. One transaction per call.
    ///
    /// A failed transfer keeps the channel, so only a channel that never
    /// came back yields [`Error::ChannelLost`].
    pub fn show(&mut self) -> Result<(), Error> {
        let Some(channel) = self.channel.take() else {
            return Err(Error::ChannelLost);
        };

        let mut pulses = [PulseCode::end_marker(); PIXEL_COUNT * PULSES_PER_PIXEL + 1];
        for (chunk, color) in pulses
            .chunks_exact_mut(PULSES_PER_PIXEL)
            .zip(&self.pixels)
        {
            // WS2812 expects GRB byte order
            let bits = [color.green, color.red, color.blue]
                .into_iter()
                .flat_map(Self::byte_to_pulses);
            for (slot, pulse) in chunk.iter_mut().zip(bits) {
                *slot = pulse;
            }
        }

        let transaction =
            keep_on_error(&mut self.channel, channel.transmit(&pulses)).map_err(|err| {
                error!("RMT transmit failed: {:?}", err);
                Error::Transmit
            })?;

        let channel = keep_on_error(&mut self.channel, transaction.wait()).map_err(|err| {
            error!("RMT transaction failed: {:?}", err);
            Error::Transmit
        })?;
        // The line idles low after the end marker; the pacer's pause covers
        // the reset time.
        self.channel = Some(channel);
        Ok(())
    }

    // ── Internal helpers ────────────────────────────────────────────────

    /// WS2812 bit timing at 40 MHz RMT clock.
    const fn bit_to_pulse(bit: bool) -> PulseCode {
        if bit {
            // '1': 0.8 µs high (32 ticks), 0.45 µs low (18 ticks)
            PulseCode::new(Level::High, 32, Level::Low, 18)
        } else {
            // '0': 0.4 µs high (16 ticks), 0.85 µs low (34 ticks)
            PulseCode::new(Level::High, 16, Level::Low, 34)
        }
    }

    fn byte_to_pulses(byte: u8) -> [PulseCode; 8] {
        let mut pulses = [PulseCode::default(); 8];
        for (i, pulse) in pulses.iter_mut().enumerate() {
            *pulse = Self::bit_to_pulse((byte >> (7 - i)) & 1 != 0);
        }
        pulses
    }
}

impl PixelSink for Neopixel<'_> {
    async fn apply(&mut self, frame: Frame) -> Result<(), Error> {
        self.set(frame.scaled());
        self.show()
    }
}
