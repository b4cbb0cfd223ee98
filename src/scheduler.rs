//! Step state and pacing.
//!
//! The scheduler owns whatever is carried from one iteration to the next and
//! decides how long to sleep in between. It never touches a device.

use embassy_time::Duration;
use embedded_hal_async::delay::DelayNs;
use rand::{
    Rng as _,
    RngCore,
};

/// Shortest pause between iterations, long enough for a WS2812 to latch.
pub const MIN_PAUSE: Duration = Duration::from_micros(50);

/// How a step state moves forward by one tick.
pub trait Advance {
    fn advance(&mut self);
}

/// Stateless effects.
impl Advance for () {
    fn advance(&mut self) {}
}

/// Position on a 256-step cycle, wrapping from 255 back to 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cycle(u8);

impl Cycle {
    pub const fn new(position: u8) -> Self {
        Self(position)
    }

    pub const fn position(&self) -> u8 {
        self.0
    }
}

impl Advance for Cycle {
    fn advance(&mut self) {
        self.0 = self.0.wrapping_add(1);
    }
}

/// Flips every tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Toggle(bool);

impl Toggle {
    pub const fn is_set(&self) -> bool {
        self.0
    }
}

impl Advance for Toggle {
    fn advance(&mut self) {
        self.0 = !self.0;
    }
}

/// Counts up from zero to `peak`, then back down to zero, then up again.
///
/// Both ends are visited exactly once per period of `2 * peak` ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Triangle {
    position: u32,
    peak: u32,
    rising: bool,
}

impl Triangle {
    /// A peak of zero is raised to one.
    pub const fn new(peak: u32) -> Self {
        Self {
            position: 0,
            peak: if peak == 0 { 1 } else { peak },
            rising: true,
        }
    }

    pub const fn position(&self) -> u32 {
        self.position
    }

    pub const fn peak(&self) -> u32 {
        self.peak
    }

    pub const fn is_rising(&self) -> bool {
        self.rising
    }
}

impl Advance for Triangle {
    fn advance(&mut self) {
        if self.rising {
            self.position = (self.position + 1).min(self.peak);
            if self.position == self.peak {
                self.rising = false;
            }
        } else {
            self.position = self.position.saturating_sub(1);
            if self.position == 0 {
                self.rising = true;
            }
        }
    }
}

/// Inter-iteration delay policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pace {
    Fixed(Duration),
    /// Uniformly drawn from `min..=max`, independently every iteration.
    Jittered { min: Duration, max: Duration },
}

impl Pace {
    pub const fn fixed(delay: Duration) -> Self {
        Self::Fixed(delay)
    }

    /// `nominal ± spread`, saturating at zero.
    pub fn jittered(nominal: Duration, spread: Duration) -> Self {
        Self::Jittered {
            min: nominal.checked_sub(spread).unwrap_or(Duration::from_ticks(0)),
            max: nominal + spread,
        }
    }

    pub fn next_delay<R: RngCore>(&self, rng: &mut R) -> Duration {
        match *self {
            Self::Fixed(delay) => delay,
            Self::Jittered { min, max } if min >= max => min,
            Self::Jittered { min, max } => {
                Duration::from_micros(rng.gen_range(min.as_micros()..=max.as_micros()))
            }
        }
    }
}

/// Owns the step state of one effect (or `()` for a sensor poll) and the
/// pace at which it moves.
#[derive(Debug, Clone)]
pub struct Scheduler<S> {
    state: S,
    pace: Pace,
}

impl<S: Advance> Scheduler<S> {
    pub const fn new(state: S, pace: Pace) -> Self {
        Self { state, pace }
    }

    pub const fn state(&self) -> &S {
        &self.state
    }

    pub const fn pace(&self) -> Pace {
        self.pace
    }

    pub fn advance(&mut self) {
        self.state.advance();
    }

    /// Sleep for the next delay, at least [`MIN_PAUSE`], and return how long
    /// that was.
    pub async fn pause<D: DelayNs, R: RngCore>(&self, delay: &mut D, rng: &mut R) -> Duration {
        let pause = self.pace.next_delay(rng).max(MIN_PAUSE);
        let micros = u32::try_from(pause.as_micros()).unwrap_or(u32::MAX);
        delay.delay_us(micros).await;
        pause
    }
}
