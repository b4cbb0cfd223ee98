//! The fault-tolerant main loop.
//!
//! After bring-up the firmware is in one of two states:
//! - **Running**: generate, apply or read, pace, forever. A failed iteration
//!   is logged and skipped, it never stops the loop.
//! - **Halted**: bring-up failed. The board only sleeps until it is reset.
//!
//! There is no way from `Halted` back to `Running`.

use embassy_time::Duration;
use embedded_hal_async::delay::DelayNs;
use rand::RngCore;

use crate::{
    effects::Effect,
    error::{
        Error,
        Fault,
    },
    scheduler::{
        Pace,
        Scheduler,
    },
    sink::{
        PixelSink,
        Readable,
        Report as _,
    },
};

/// Sleep interval of the halt loop.
pub const HALT_INTERVAL_MS: u32 = 1_000;

/// One kind of work the main loop repeats.
#[allow(async_fn_in_trait)]
pub trait Workload {
    /// Do one unit of device work.
    async fn iterate<R: RngCore>(&mut self, rng: &mut R) -> Result<(), Error>;

    /// Wait until the next iteration is due.
    async fn pause<D: DelayNs, R: RngCore>(&mut self, delay: &mut D, rng: &mut R) -> Duration;
}

/// An [`Effect`] played on a [`PixelSink`].
pub struct Animation<E: Effect, S> {
    effect: E,
    scheduler: Scheduler<E::State>,
    sink: S,
}

impl<E: Effect, S: PixelSink> Animation<E, S> {
    pub fn new(effect: E, pace: Pace, sink: S) -> Self {
        let scheduler = Scheduler::new(effect.initial_state(), pace);
        Self {
            effect,
            scheduler,
            sink,
        }
    }

    pub const fn scheduler(&self) -> &Scheduler<E::State> {
        &self.scheduler
    }

    pub const fn sink(&self) -> &S {
        &self.sink
    }
}

impl<E: Effect, S: PixelSink> Workload for Animation<E, S> {
    async fn iterate<R: RngCore>(&mut self, rng: &mut R) -> Result<(), Error> {
        let frame = self.effect.compute(self.scheduler.state(), rng);
        let shown = self.sink.apply(frame).await;
        // Animation time moves on even when the pixel missed a frame.
        self.scheduler.advance();
        shown
    }

    async fn pause<D: DelayNs, R: RngCore>(&mut self, delay: &mut D, rng: &mut R) -> Duration {
        self.scheduler.pause(delay, rng).await
    }
}

/// Polls a [`Readable`] sensor and reports every reading.
pub struct Monitor<S> {
    sensor: S,
    scheduler: Scheduler<()>,
}

impl<S: Readable> Monitor<S> {
    pub const fn new(sensor: S, pace: Pace) -> Self {
        Self {
            sensor,
            scheduler: Scheduler::new((), pace),
        }
    }

    pub const fn sensor(&self) -> &S {
        &self.sensor
    }
}

impl<S: Readable> Workload for Monitor<S> {
    async fn iterate<R: RngCore>(&mut self, _rng: &mut R) -> Result<(), Error> {
        let reading = self.sensor.read().await?;
        reading.report();
        Ok(())
    }

    async fn pause<D: DelayNs, R: RngCore>(&mut self, delay: &mut D, rng: &mut R) -> Duration {
        self.scheduler.pause(delay, rng).await
    }
}

/// Observable state of the firmware after bring-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    Running,
    Halted,
}

/// Repeats a [`Workload`], absorbing every iteration fault.
pub struct LoopDriver<W, D, R> {
    workload: W,
    delay: D,
    rng: R,
    iterations: u32,
    faults: u32,
}

impl<W: Workload, D: DelayNs, R: RngCore> LoopDriver<W, D, R> {
    pub const fn new(workload: W, delay: D, rng: R) -> Self {
        Self {
            workload,
            delay,
            rng,
            iterations: 0,
            faults: 0,
        }
    }

    /// One pass: iterate, log a fault if there was one, pace.
    ///
    /// The returned fault has already been logged and is always recoverable.
    pub async fn step(&mut self) -> Result<(), Fault> {
        let outcome = self
            .workload
            .iterate(&mut self.rng)
            .await
            .map_err(Fault::Iteration);

        if let Err(fault) = &outcome {
            self.faults = self.faults.wrapping_add(1);
            warn!("Iteration {} skipped: {}", self.iterations, fault);
        }

        self.workload.pause(&mut self.delay, &mut self.rng).await;
        self.iterations = self.iterations.wrapping_add(1);
        outcome
    }

    pub async fn run(mut self) -> ! {
        loop {
            let _ = self.step().await;
        }
    }

    /// Completed passes, wrapping.
    pub const fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Passes that ended in a fault, wrapping.
    pub const fn faults(&self) -> u32 {
        self.faults
    }

    pub const fn workload(&self) -> &W {
        &self.workload
    }
}

/// Terminal state after a failed bring-up.
pub struct Halted<D> {
    cause: Fault,
    delay: D,
}

impl<D: DelayNs> Halted<D> {
    pub const fn new(cause: Fault, delay: D) -> Self {
        Self { cause, delay }
    }

    pub const fn cause(&self) -> &Fault {
        &self.cause
    }

    /// Sleep forever. Only an external reset gets the board out of here.
    pub async fn idle(self) -> ! {
        error!(
            "HALTED: {}. The firmware will not proceed, reset the board.",
            self.cause
        );
        sleep_forever(self.delay).await
    }
}

/// The idle loop shared by the halt state and programs with no workload.
pub async fn sleep_forever<D: DelayNs>(mut delay: D) -> ! {
    loop {
        delay.delay_ms(HALT_INTERVAL_MS).await;
    }
}

/// The firmware after bring-up: either looping or halted.
pub enum Lifecycle<W, D, R> {
    Running(LoopDriver<W, D, R>),
    Halted(Halted<D>),
}

impl<W: Workload, D: DelayNs, R: RngCore> Lifecycle<W, D, R> {
    /// Enter `Running` with the acquired device handle, or `Halted` with the
    /// acquisition fault. `workload` is only called on success.
    pub fn start<H>(
        acquired: Result<H, Fault>,
        workload: impl FnOnce(H) -> W,
        delay: D,
        rng: R,
    ) -> Self {
        match acquired {
            Ok(handle) => {
                info!("Entering main loop");
                Self::Running(LoopDriver::new(workload(handle), delay, rng))
            }
            Err(cause) => Self::Halted(Halted::new(cause, delay)),
        }
    }

    pub const fn state(&self) -> State {
        match self {
            Self::Running(_) => State::Running,
            Self::Halted(_) => State::Halted,
        }
    }

    pub async fn run(self) -> ! {
        match self {
            Self::Running(driver) => driver.run().await,
            Self::Halted(halted) => halted.idle().await,
        }
    }
}
