//! Bring-up collaborators and workload launchers for the Feather.

use core::marker::PhantomData;

use embassy_time::Delay;
use embedded_hal_async::i2c::Operation;
use esp_hal::{
    Async,
    Blocking,
    gpio::{
        Level,
        Output,
        OutputConfig,
    },
    i2c::master::I2c,
    rmt::{
        Rmt,
        Tx,
        TxChannelConfig,
        TxChannelCreator as _,
    },
    rng::Rng,
    time::Rate,
};
use palette::Srgb;
use rand::{
    SeedableRng as _,
    rngs::SmallRng,
};

use crate::{
    I2cResources,
    NeopixelResources,
    Resources,
    backlight::TftDisplay,
    bmp280::Bmp280,
    bringup::{
        Acquire,
        bring_up,
        teardown,
    },
    driver::{
        Animation,
        Lifecycle,
        Monitor,
        sleep_forever,
    },
    effects::Effect,
    error::Error,
    leds::Neopixel,
    qmi8658::Qmi8658,
    scheduler::Pace,
    sink::Readable,
};

const I2C_FREQUENCY_KHZ: u32 = 100;

/// Seed a software generator from the hardware RNG.
pub fn seed_rng() -> SmallRng {
    let rng = Rng::new();
    let seed = (u64::from(rng.random()) << 32) | u64::from(rng.random());
    SmallRng::seed_from_u64(seed)
}

// ── NeoPixel ────────────────────────────────────────────────────────────────

/// Powers the pixel and opens an RMT channel for it.
pub struct NeopixelBus {
    res: Option<NeopixelResources<'static>>,
}

impl NeopixelBus {
    pub const fn new(res: NeopixelResources<'static>) -> Self {
        Self { res: Some(res) }
    }
}

impl Acquire for NeopixelBus {
    type Bus = (esp_hal::rmt::Channel<'static, Blocking, Tx>, Output<'static>);
    type Device = Neopixel<'static>;

    const BUS: &'static str = "RMT channel";
    const DEVICE: &'static str = "NeoPixel";

    fn open_bus(&mut self) -> Result<Self::Bus, Error> {
        let res = self.res.take().ok_or(Error::BusInit)?;
        let power = Output::new(res.power, Level::High, OutputConfig::default());
        let rmt = Rmt::new(res.rmt, Rate::from_mhz(40)).map_err(|_| Error::BusInit)?;
        let tx_config = TxChannelConfig::default().with_clk_divider(1);
        let channel = rmt
            .channel0
            .configure_tx(res.io, tx_config)
            .map_err(|_| Error::BusInit)?;
        Ok((channel, power))
    }

    /// Pushes one dark frame so a dead data line shows up here rather than
    /// in the loop.
    async fn construct(&mut self, (channel, power): Self::Bus) -> Result<Self::Device, Error> {
        let mut pixel = Neopixel::new(channel, power);
        pixel.set(Srgb::new(0, 0, 0));
        pixel.show()?;
        Ok(pixel)
    }
}

// ── I2C sensors ─────────────────────────────────────────────────────────────

/// The STEMMA QT I2C bus together with its power switch.
pub struct PoweredI2c {
    bus: I2c<'static, Async>,
    _power: Output<'static>,
}

impl embedded_hal_async::i2c::ErrorType for PoweredI2c {
    type Error = esp_hal::i2c::master::Error;
}

impl embedded_hal_async::i2c::I2c for PoweredI2c {
    async fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        embedded_hal_async::i2c::I2c::transaction(&mut self.bus, address, operations).await
    }
}

/// Opens the I2C bus and constructs sensor `S` on it.
pub struct SensorBus<S> {
    res: Option<I2cResources<'static>>,
    sensor: PhantomData<S>,
}

impl<S> SensorBus<S> {
    pub const fn new(res: I2cResources<'static>) -> Self {
        Self {
            res: Some(res),
            sensor: PhantomData,
        }
    }

    fn open(&mut self) -> Result<PoweredI2c, Error> {
        let res = self.res.take().ok_or(Error::BusInit)?;
        // Also powers the TFT controller, whose backlight stays off.
        let power = Output::new(res.power, Level::High, OutputConfig::default());
        let config = esp_hal::i2c::master::Config::default()
            .with_frequency(Rate::from_khz(I2C_FREQUENCY_KHZ));
        let bus = I2c::new(res.i2c, config)
            .map_err(|_| Error::BusInit)?
            .with_sda(res.sda)
            .with_scl(res.scl)
            .into_async();
        Ok(PoweredI2c { bus, _power: power })
    }
}

impl Acquire for SensorBus<Bmp280<PoweredI2c>> {
    type Bus = PoweredI2c;
    type Device = Bmp280<PoweredI2c>;

    const BUS: &'static str = "I2C bus";
    const DEVICE: &'static str = "BMP280";

    fn open_bus(&mut self) -> Result<PoweredI2c, Error> {
        self.open()
    }

    async fn construct(&mut self, bus: PoweredI2c) -> Result<Self::Device, Error> {
        Bmp280::detect(bus).await
    }
}

impl Acquire for SensorBus<Qmi8658<PoweredI2c>> {
    type Bus = PoweredI2c;
    type Device = Qmi8658<PoweredI2c>;

    const BUS: &'static str = "I2C bus";
    const DEVICE: &'static str = "QMI8658C";

    fn open_bus(&mut self) -> Result<PoweredI2c, Error> {
        self.open()
    }

    async fn construct(&mut self, bus: PoweredI2c) -> Result<Self::Device, Error> {
        Qmi8658::detect(bus).await
    }
}

// ── Launchers ───────────────────────────────────────────────────────────────

/// Switch the display off, acquire the pixel and play `effect` forever.
pub async fn animate<E: Effect>(resources: Resources<'static>, effect: E, pace: Pace) -> ! {
    let mut display = TftDisplay::from(resources.display);
    let mut neopixel = NeopixelBus::new(resources.neopixel);
    let acquired = bring_up(&mut display, &mut neopixel).await;

    Lifecycle::start(
        acquired,
        |pixel| Animation::new(effect, pace, pixel),
        Delay,
        seed_rng(),
    )
    .run()
    .await
}

/// Switch the display off, acquire sensor `S` and report it forever.
pub async fn monitor<S>(resources: Resources<'static>, pace: Pace) -> !
where
    S: Readable,
    SensorBus<S>: Acquire<Device = S>,
{
    let mut display = TftDisplay::from(resources.display);
    let mut sensor = SensorBus::<S>::new(resources.i2c);
    let acquired = bring_up(&mut display, &mut sensor).await;

    Lifecycle::start(
        acquired,
        |sensor| Monitor::new(sensor, pace),
        Delay,
        seed_rng(),
    )
    .run()
    .await
}

/// Only switch the display off, then idle.
pub async fn display_off(resources: Resources<'static>) -> ! {
    let mut display = TftDisplay::from(resources.display);
    let report = teardown(&mut display);
    info!("Display off (clean: {}), idling", report.is_clean());
    sleep_forever(Delay).await
}
