//! QST QMI8658C six-axis IMU (accelerometer + gyroscope) over I2C.

use embedded_hal_async::i2c::I2c;

use crate::{
    error::Error,
    registers::{
        find_device,
        read_registers,
        write_register,
    },
    sink::{
        Readable,
        Report,
    },
};

/// Default address (SA0 low).
pub const PRIMARY_ADDRESS: u8 = 0x6B;
/// Alternate address (SA0 high).
pub const SECONDARY_ADDRESS: u8 = 0x6A;

const WHO_AM_I: u8 = 0x05;

const REG_WHO_AM_I: u8 = 0x00;
const REG_CTRL1: u8 = 0x02;
const REG_CTRL2: u8 = 0x03;
const REG_CTRL3: u8 = 0x04;
const REG_CTRL7: u8 = 0x08;
const REG_TEMP_L: u8 = 0x33;

/// Serial address auto-increment, little endian.
const CTRL1_AUTO_INCREMENT: u8 = 0x40;
/// ±8 g, 1 kHz.
const CTRL2_ACCEL: u8 = 0x23;
/// ±512 dps, 1 kHz.
const CTRL3_GYRO: u8 = 0x53;
/// Accelerometer and gyroscope enabled.
const CTRL7_ENABLE: u8 = 0x03;

const ACCEL_LSB_PER_G: f32 = 4096.0;
const GYRO_LSB_PER_DPS: f32 = 64.0;
const TEMP_LSB_PER_C: f32 = 256.0;
const STANDARD_GRAVITY: f32 = 9.806_65;

/// One IMU sample.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Motion {
    /// m/s², x/y/z.
    pub acceleration: [f32; 3],
    /// Degrees per second, x/y/z.
    pub gyro: [f32; 3],
    pub temperature_c: f32,
}

impl Motion {
    /// Decode the 14 bytes starting at `TEMP_L`.
    pub fn from_bytes(raw: &[u8; 14]) -> Self {
        let word = |i: usize| f32::from(i16::from_le_bytes([raw[i], raw[i + 1]]));
        let accel = |i: usize| word(i) / ACCEL_LSB_PER_G * STANDARD_GRAVITY;
        let gyro = |i: usize| word(i) / GYRO_LSB_PER_DPS;
        Self {
            temperature_c: word(0) / TEMP_LSB_PER_C,
            acceleration: [accel(2), accel(4), accel(6)],
            gyro: [gyro(8), gyro(10), gyro(12)],
        }
    }
}

impl Report for Motion {
    fn report(&self) {
        let [ax, ay, az] = self.acceleration;
        let [gx, gy, gz] = self.gyro;
        info!("----------------------------------------");
        info!("Acceleration: ({}, {}, {}) m/s^2", ax, ay, az);
        info!("Gyroscope:    ({}, {}, {}) degrees/s", gx, gy, gz);
        info!("Temperature:  {} C", self.temperature_c);
    }
}

pub struct Qmi8658<I> {
    i2c: I,
    address: u8,
}

impl<I: I2c> Qmi8658<I> {
    /// Probe [`PRIMARY_ADDRESS`] then [`SECONDARY_ADDRESS`].
    pub async fn detect(i2c: I) -> Result<Self, Error> {
        Self::detect_at(i2c, &[PRIMARY_ADDRESS, SECONDARY_ADDRESS]).await
    }

    pub async fn detect_at(mut i2c: I, addresses: &[u8]) -> Result<Self, Error> {
        let address = find_device(&mut i2c, addresses, REG_WHO_AM_I, WHO_AM_I).await?;
        let mut imu = Self { i2c, address };
        imu.configure().await?;
        Ok(imu)
    }

    async fn configure(&mut self) -> Result<(), Error> {
        for (register, value) in [
            (REG_CTRL1, CTRL1_AUTO_INCREMENT),
            (REG_CTRL2, CTRL2_ACCEL),
            (REG_CTRL3, CTRL3_GYRO),
            (REG_CTRL7, CTRL7_ENABLE),
        ] {
            write_register(&mut self.i2c, self.address, register, value).await?;
        }
        Ok(())
    }

    pub const fn address(&self) -> u8 {
        self.address
    }

    pub fn release(self) -> I {
        self.i2c
    }

    /// Temperature, acceleration and rotation in one burst.
    pub async fn measure(&mut self) -> Result<Motion, Error> {
        let mut raw = [0_u8; 14];
        read_registers(&mut self.i2c, self.address, REG_TEMP_L, &mut raw).await?;
        Ok(Motion::from_bytes(&raw))
    }
}

impl<I: I2c> Readable for Qmi8658<I> {
    type Reading = Motion;

    async fn read(&mut self) -> Result<Motion, Error> {
        self.measure().await
    }
}
