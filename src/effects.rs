//! Color generators for the single pixel.
//!
//! Every effect is a pure function of the step state handed in by the
//! [`Scheduler`](crate::scheduler::Scheduler) and, for the flicker, of a
//! random source. None of them keeps state of its own.

use palette::{
    Srgb,
    named,
};
use rand::{
    Rng as _,
    RngCore,
};

use crate::scheduler::{
    Advance,
    Cycle,
    Toggle,
    Triangle,
};

const BLACK: Srgb<u8> = Srgb::new(0, 0, 0);

/// One frame for the pixel: a color plus the global brightness it is shown at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub color: Srgb<u8>,
    /// Scale factor in `[0.0, 1.0]`.
    pub brightness: f32,
}

impl Frame {
    pub const fn new(color: Srgb<u8>, brightness: f32) -> Self {
        Self { color, brightness }
    }

    /// The color with the brightness applied to every channel (truncating).
    pub fn scaled(&self) -> Srgb<u8> {
        let brightness = self.brightness.clamp(0.0, 1.0);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let scale = |channel: u8| (f32::from(channel) * brightness) as u8;
        Srgb::new(
            scale(self.color.red),
            scale(self.color.green),
            scale(self.color.blue),
        )
    }
}

/// A frame generator driven by a step state of type [`Effect::State`].
pub trait Effect {
    type State: Advance;

    /// The step state the scheduler starts from.
    fn initial_state(&self) -> Self::State;

    /// Compute the frame for `state`. Must not mutate anything but `rng`.
    fn compute<R: RngCore>(&self, state: &Self::State, rng: &mut R) -> Frame;
}

// ── Hue wheel ───────────────────────────────────────────────────────────────

/// Classic color wheel: red → green → blue → red over 256 positions.
///
/// Positions outside `0..=255` yield black.
pub fn wheel(pos: i32) -> Srgb<u8> {
    let Ok(pos) = u8::try_from(pos) else {
        return BLACK;
    };
    match pos {
        0..85 => Srgb::new(pos * 3, 255 - pos * 3, 0),
        85..170 => {
            let pos = pos - 85;
            Srgb::new(255 - pos * 3, 0, pos * 3)
        }
        _ => {
            let pos = pos - 170;
            Srgb::new(0, pos * 3, 255 - pos * 3)
        }
    }
}

/// Walks the [`wheel`] one position per tick.
#[derive(Debug, Clone, Copy)]
pub struct HueWheel {
    brightness: f32,
}

impl Default for HueWheel {
    fn default() -> Self {
        Self { brightness: 0.3 }
    }
}

impl HueWheel {
    #[must_use]
    pub const fn with_brightness(mut self, brightness: f32) -> Self {
        self.brightness = brightness;
        self
    }
}

impl Effect for HueWheel {
    type State = Cycle;

    fn initial_state(&self) -> Cycle {
        Cycle::default()
    }

    fn compute<R: RngCore>(&self, state: &Cycle, _rng: &mut R) -> Frame {
        Frame::new(wheel(i32::from(state.position())), self.brightness)
    }
}

// ── Two-color alternator ────────────────────────────────────────────────────

/// Shows `first`, then `second`, switching once per pacing interval.
#[derive(Debug, Clone, Copy)]
pub struct TwoColor {
    first: Srgb<u8>,
    second: Srgb<u8>,
    brightness: f32,
}

impl Default for TwoColor {
    fn default() -> Self {
        Self::new(named::RED, named::BLUE)
    }
}

impl TwoColor {
    pub const fn new(first: Srgb<u8>, second: Srgb<u8>) -> Self {
        Self {
            first,
            second,
            brightness: 0.5,
        }
    }

    #[must_use]
    pub const fn with_brightness(mut self, brightness: f32) -> Self {
        self.brightness = brightness;
        self
    }
}

impl Effect for TwoColor {
    type State = Toggle;

    fn initial_state(&self) -> Toggle {
        Toggle::default()
    }

    fn compute<R: RngCore>(&self, state: &Toggle, _rng: &mut R) -> Frame {
        let color = if state.is_set() { self.second } else { self.first };
        Frame::new(color, self.brightness)
    }
}

// ── Breathing pulse ─────────────────────────────────────────────────────────

/// Constant color whose brightness ramps linearly between zero and
/// `max_brightness` and back.
#[derive(Debug, Clone, Copy)]
pub struct Breathing {
    color: Srgb<u8>,
    max_brightness: f32,
    fade_rate: f32,
}

impl Default for Breathing {
    fn default() -> Self {
        Self {
            color: named::PURPLE,
            max_brightness: 0.6,
            fade_rate: 0.02,
        }
    }
}

impl Breathing {
    #[must_use]
    pub const fn with_color(mut self, color: Srgb<u8>) -> Self {
        self.color = color;
        self
    }

    #[must_use]
    pub const fn with_max_brightness(mut self, max_brightness: f32) -> Self {
        self.max_brightness = max_brightness;
        self
    }

    /// Brightness change per tick. Non-positive rates are treated as a
    /// single-tick ramp.
    #[must_use]
    pub const fn with_fade_rate(mut self, fade_rate: f32) -> Self {
        self.fade_rate = fade_rate;
        self
    }

    /// Ticks from zero to peak brightness.
    pub fn ramp_ticks(&self) -> u32 {
        if self.fade_rate <= 0.0 {
            return 1;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let ticks = libm::roundf(self.max_brightness / self.fade_rate) as u32;
        ticks.max(1)
    }

    /// Brightness at a point of the triangle wave. The peak is exactly
    /// `max_brightness`.
    pub fn level(&self, state: &Triangle) -> f32 {
        if state.position() >= state.peak() {
            return self.max_brightness;
        }
        #[allow(clippy::cast_precision_loss)]
        let level = state.position() as f32 * self.fade_rate;
        level.min(self.max_brightness).max(0.0)
    }
}

impl Effect for Breathing {
    type State = Triangle;

    fn initial_state(&self) -> Triangle {
        Triangle::new(self.ramp_ticks())
    }

    fn compute<R: RngCore>(&self, state: &Triangle, _rng: &mut R) -> Frame {
        Frame::new(self.color, self.level(state))
    }
}

// ── Randomized flicker ──────────────────────────────────────────────────────

/// Fire-like flicker: every tick draws a warm color and a brightness.
#[derive(Debug, Clone, Copy)]
pub struct Flicker {
    red: (u8, u8),
    green: (u8, u8),
    brightness: (f32, f32),
}

impl Default for Flicker {
    fn default() -> Self {
        Self {
            red: (150, 255),
            green: (0, 100),
            brightness: (0.1, 0.6),
        }
    }
}

const fn ordered(a: u8, b: u8) -> (u8, u8) {
    if a <= b { (a, b) } else { (b, a) }
}

impl Flicker {
    #[must_use]
    pub const fn with_red(mut self, min: u8, max: u8) -> Self {
        self.red = ordered(min, max);
        self
    }

    #[must_use]
    pub const fn with_green(mut self, min: u8, max: u8) -> Self {
        self.green = ordered(min, max);
        self
    }

    #[must_use]
    pub fn with_brightness(mut self, min: f32, max: f32) -> Self {
        self.brightness = (min.min(max), max.max(min));
        self
    }

    pub const fn min_brightness(&self) -> f32 {
        self.brightness.0
    }

    pub const fn max_brightness(&self) -> f32 {
        self.brightness.1
    }
}

impl Effect for Flicker {
    type State = ();

    fn initial_state(&self) {}

    fn compute<R: RngCore>(&self, _state: &(), rng: &mut R) -> Frame {
        let color = Srgb::new(
            rng.gen_range(self.red.0..=self.red.1),
            rng.gen_range(self.green.0..=self.green.1),
            0,
        );
        let brightness = rng.gen_range(self.brightness.0..=self.brightness.1);
        Frame::new(color, brightness)
    }
}

// ── Phase-cycled wave ───────────────────────────────────────────────────────

/// Weight of `to` at a phase: rises 0 → 254 over the first half, falls
/// 255 → 1 over the second.
pub const fn wave_weight(phase: u8) -> u8 {
    if phase < 128 {
        phase * 2
    } else {
        255 - (phase - 128) * 2
    }
}

fn blend(from: u8, to: u8, weight: u8) -> u8 {
    let delta = (i32::from(to) - i32::from(from)) * i32::from(weight) / 255;
    u8::try_from(i32::from(from) + delta).unwrap_or(from)
}

/// Swings from `from` to `to` and back over 256 ticks.
#[derive(Debug, Clone, Copy)]
pub struct Wave {
    from: Srgb<u8>,
    to: Srgb<u8>,
    brightness: f32,
}

impl Default for Wave {
    /// Deep blue to aqua, the ocean look.
    fn default() -> Self {
        Self::new(named::BLUE, named::AQUA)
    }
}

impl Wave {
    pub const fn new(from: Srgb<u8>, to: Srgb<u8>) -> Self {
        Self {
            from,
            to,
            brightness: 0.5,
        }
    }

    #[must_use]
    pub const fn with_brightness(mut self, brightness: f32) -> Self {
        self.brightness = brightness;
        self
    }

    pub fn color_at(&self, phase: u8) -> Srgb<u8> {
        let weight = wave_weight(phase);
        Srgb::new(
            blend(self.from.red, self.to.red, weight),
            blend(self.from.green, self.to.green, weight),
            blend(self.from.blue, self.to.blue, weight),
        )
    }
}

impl Effect for Wave {
    type State = Cycle;

    fn initial_state(&self) -> Cycle {
        Cycle::default()
    }

    fn compute<R: RngCore>(&self, state: &Cycle, _rng: &mut R) -> Frame {
        Frame::new(self.color_at(state.position()), self.brightness)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scaling_truncates_each_channel() {
        let frame = Frame::new(Srgb::new(255, 128, 1), 0.5);
        assert_eq!(frame.scaled(), Srgb::new(127, 64, 0));
    }

    #[test]
    fn scaling_clamps_brightness() {
        let color = Srgb::new(10, 20, 30);
        assert_eq!(Frame::new(color, 3.0).scaled(), color);
        assert_eq!(Frame::new(color, -1.0).scaled(), BLACK);
    }

    #[test]
    fn blend_handles_falling_channels() {
        assert_eq!(blend(255, 0, 255), 0);
        assert_eq!(blend(255, 0, 0), 255);
        assert_eq!(blend(0, 255, 128), 128);
    }
}
