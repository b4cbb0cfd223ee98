#![allow(dead_code)]

use std::cell::RefCell;

use embedded_hal::i2c::{
    ErrorKind,
    NoAcknowledgeSource,
};
use embedded_hal_async::{
    delay::DelayNs,
    i2c::{
        ErrorType,
        I2c,
        Operation,
    },
};
use feather_pulse::{
    Error,
    Frame,
    bringup::{
        Acquire,
        DisplayTeardown,
    },
    sink::PixelSink,
};
use rand::{
    SeedableRng as _,
    rngs::SmallRng,
};

pub fn rng() -> SmallRng {
    SmallRng::seed_from_u64(0x5EED)
}

/// Records every requested sleep instead of sleeping.
#[derive(Debug, Default)]
pub struct RecordingDelay {
    pub slept_ns: Vec<u64>,
}

impl RecordingDelay {
    pub fn total_ms(&self) -> u64 {
        self.slept_ns.iter().sum::<u64>() / 1_000_000
    }
}

impl DelayNs for RecordingDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.slept_ns.push(u64::from(ns));
    }
}

/// A delay that never completes, so a future sleeping on it stays pending.
#[derive(Debug, Default)]
pub struct StalledDelay {
    pub requested_ns: Vec<u64>,
}

impl DelayNs for StalledDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.requested_ns.push(u64::from(ns));
        core::future::pending::<()>().await;
    }
}

thread_local! {
    static LINES: RefCell<Vec<(log::Level, String)>> = const { RefCell::new(Vec::new()) };
}

/// Keeps the lines logged on each test thread.
struct CaptureLogger;

impl log::Log for CaptureLogger {
    fn enabled(&self, _metadata: &log::Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &log::Record<'_>) {
        LINES.with(|lines| {
            lines
                .borrow_mut()
                .push((record.level(), record.args().to_string()));
        });
    }

    fn flush(&self) {}
}

static LOGGER: CaptureLogger = CaptureLogger;

/// Start capturing log lines for the current thread, dropping earlier ones.
pub fn capture_logs() {
    // Another test on this binary may have installed it already.
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(log::LevelFilter::Trace);
    LINES.with(|lines| lines.borrow_mut().clear());
}

/// Lines at `level` captured on this thread that contain `needle`.
pub fn logged(level: log::Level, needle: &str) -> Vec<String> {
    LINES.with(|lines| {
        lines
            .borrow()
            .iter()
            .filter(|(at, line)| *at == level && line.contains(needle))
            .map(|(_, line)| line.clone())
            .collect()
    })
}

/// Pixel that fails on the listed (1-based) calls.
#[derive(Debug, Default)]
pub struct FakeSink {
    pub calls: u32,
    pub fail_on: Vec<u32>,
    pub frames: Vec<Frame>,
}

impl FakeSink {
    pub fn failing_on(calls: &[u32]) -> Self {
        Self {
            fail_on: calls.to_vec(),
            ..Self::default()
        }
    }
}

impl PixelSink for FakeSink {
    async fn apply(&mut self, frame: Frame) -> Result<(), Error> {
        self.calls += 1;
        if self.fail_on.contains(&self.calls) {
            return Err(Error::Transmit);
        }
        self.frames.push(frame);
        Ok(())
    }
}

#[derive(Debug)]
pub struct FakeDisplay {
    pub release: Result<(), Error>,
    pub has_backlight: bool,
    pub backlight: Result<(), Error>,
    pub backlight_on: Option<bool>,
    pub released: bool,
}

impl Default for FakeDisplay {
    fn default() -> Self {
        Self {
            release: Ok(()),
            has_backlight: true,
            backlight: Ok(()),
            backlight_on: None,
            released: false,
        }
    }
}

impl DisplayTeardown for FakeDisplay {
    fn release_display_resources(&mut self) -> Result<(), Error> {
        self.released = self.release.is_ok();
        self.release
    }

    fn set_backlight(&mut self, on: bool) -> Result<(), Error> {
        if !self.has_backlight {
            return Err(Error::PinMissing("TFT_BACKLIGHT"));
        }
        self.backlight?;
        self.backlight_on = Some(on);
        Ok(())
    }
}

/// Hands out a [`FakeSink`] unless told to fail.
#[derive(Debug)]
pub struct FakeAcquire {
    pub bus: Result<(), Error>,
    pub device: Result<(), Error>,
    pub opened: u32,
    pub constructed: u32,
}

impl Default for FakeAcquire {
    fn default() -> Self {
        Self {
            bus: Ok(()),
            device: Ok(()),
            opened: 0,
            constructed: 0,
        }
    }
}

impl Acquire for FakeAcquire {
    type Bus = ();
    type Device = FakeSink;

    const BUS: &'static str = "fake bus";
    const DEVICE: &'static str = "fake pixel";

    fn open_bus(&mut self) -> Result<(), Error> {
        self.opened += 1;
        self.bus
    }

    async fn construct(&mut self, (): ()) -> Result<FakeSink, Error> {
        self.constructed += 1;
        self.device.map(|()| FakeSink::default())
    }
}

/// A single I2C device modelled as 256 auto-incrementing registers.
#[derive(Debug)]
pub struct FakeI2c {
    pub address: u8,
    pub registers: [u8; 256],
    pub writes: Vec<(u8, u8)>,
    pub fail_reads: bool,
    pointer: u8,
}

impl FakeI2c {
    pub fn new(address: u8) -> Self {
        Self {
            address,
            registers: [0; 256],
            writes: Vec::new(),
            fail_reads: false,
            pointer: 0,
        }
    }

    pub fn with_registers(mut self, start: u8, bytes: &[u8]) -> Self {
        for (offset, byte) in bytes.iter().enumerate() {
            self.registers[usize::from(start) + offset] = *byte;
        }
        self
    }

    pub fn written(&self, register: u8) -> Option<u8> {
        self.writes
            .iter()
            .rev()
            .find(|(reg, _)| *reg == register)
            .map(|(_, value)| *value)
    }
}

impl ErrorType for FakeI2c {
    type Error = ErrorKind;
}

impl I2c for FakeI2c {
    async fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), ErrorKind> {
        if address != self.address {
            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
        }
        for operation in operations {
            match operation {
                Operation::Write(bytes) => {
                    let Some((&register, data)) = bytes.split_first() else {
                        continue;
                    };
                    self.pointer = register;
                    for &byte in data {
                        self.registers[usize::from(self.pointer)] = byte;
                        self.writes.push((self.pointer, byte));
                        self.pointer = self.pointer.wrapping_add(1);
                    }
                }
                Operation::Read(buf) => {
                    if self.fail_reads {
                        return Err(ErrorKind::Bus);
                    }
                    for byte in buf.iter_mut() {
                        *byte = self.registers[usize::from(self.pointer)];
                        self.pointer = self.pointer.wrapping_add(1);
                    }
                }
            }
        }
        Ok(())
    }
}

/// Trim values from the BMP280 datasheet's compensation example.
pub const DATASHEET_TRIM: [i32; 12] = [
    27504, 26435, -1000, 36477, -10685, 3024, 2855, 140, -7, 15500, -14600, 6000,
];

/// Raw pressure then temperature sample matching [`DATASHEET_TRIM`].
pub const DATASHEET_SAMPLE: [u8; 6] = [0x65, 0x5A, 0xC0, 0x7E, 0xED, 0x00];

pub fn calibration_bytes(trim: [i32; 12]) -> [u8; 24] {
    let mut raw = [0_u8; 24];
    for (chunk, word) in raw.chunks_exact_mut(2).zip(trim) {
        let bytes = (word as u16).to_le_bytes();
        chunk.copy_from_slice(&bytes);
    }
    raw
}

/// A BMP280 at `address` loaded with the datasheet example.
pub fn bmp280_at(address: u8) -> FakeI2c {
    FakeI2c::new(address)
        .with_registers(0xD0, &[0x58])
        .with_registers(0x88, &calibration_bytes(DATASHEET_TRIM))
        .with_registers(0xF7, &DATASHEET_SAMPLE)
}
