//! Bosch BMP280 temperature and pressure sensor over I2C.

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

/// Default address (SDO high).
pub const PRIMARY_ADDRESS: u8 = 0x77;
/// Alternate address (SDO low).
pub const SECONDARY_ADDRESS: u8 = 0x76;

/// Mean sea-level pressure used for altitude, in hPa.
pub const SEA_LEVEL_HPA: f32 = 1013.25;

const CHIP_ID: u8 = 0x58;

const REG_CALIBRATION: u8 = 0x88;
const REG_CHIP_ID: u8 = 0xD0;
const REG_CTRL_MEAS: u8 = 0xF4;
const REG_CONFIG: u8 = 0xF5;
const REG_DATA: u8 = 0xF7;

/// Temperature ×2, pressure ×16, normal mode.
const CTRL_MEAS_NORMAL: u8 = 0b010_101_11;
/// 0.5 ms standby, IIR filter off.
const CONFIG_DEFAULT: u8 = 0x00;

/// Raw value of a data register before its first conversion.
const SKIPPED_SAMPLE: i32 = 0x8_0000;

/// Factory trim values, read once at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calibration {
    t1: u16,
    t2: i16,
    t3: i16,
    p1: u16,
    p2: i16,
    p3: i16,
    p4: i16,
    p5: i16,
    p6: i16,
    p7: i16,
    p8: i16,
    p9: i16,
}

impl Calibration {
    /// Parse the 24 little-endian bytes starting at register `0x88`.
    pub fn from_bytes(raw: &[u8; 24]) -> Self {
        let u = |i: usize| u16::from_le_bytes([raw[i], raw[i + 1]]);
        let s = |i: usize| i16::from_le_bytes([raw[i], raw[i + 1]]);
        Self {
            t1: u(0),
            t2: s(2),
            t3: s(4),
            p1: u(6),
            p2: s(8),
            p3: s(10),
            p4: s(12),
            p5: s(14),
            p6: s(16),
            p7: s(18),
            p8: s(20),
            p9: s(22),
        }
    }

    /// Returns `(t_fine, °C)` for a raw 20-bit temperature sample.
    pub fn temperature(&self, adc_t: i32) -> (f64, f64) {
        let adc_t = f64::from(adc_t);
        let t1 = f64::from(self.t1);
        let var1 = (adc_t / 16_384.0 - t1 / 1024.0) * f64::from(self.t2);
        let delta = adc_t / 131_072.0 - t1 / 8192.0;
        let var2 = delta * delta * f64::from(self.t3);
        let t_fine = var1 + var2;
        (t_fine, t_fine / 5120.0)
    }

    /// Pressure in Pa for a raw 20-bit pressure sample. `None` when the trim
    /// values would divide by zero.
    pub fn pressure(&self, adc_p: i32, t_fine: f64) -> Option<f64> {
        let mut var1 = t_fine / 2.0 - 64_000.0;
        let mut var2 = var1 * var1 * f64::from(self.p6) / 32_768.0;
        var2 += var1 * f64::from(self.p5) * 2.0;
        var2 = var2 / 4.0 + f64::from(self.p4) * 65_536.0;
        var1 = (f64::from(self.p3) * var1 * var1 / 524_288.0 + f64::from(self.p2) * var1)
            / 524_288.0;
        var1 = (1.0 + var1 / 32_768.0) * f64::from(self.p1);
        if var1 == 0.0 {
            return None;
        }
        let mut p = 1_048_576.0 - f64::from(adc_p);
        p = (p - var2 / 4096.0) * 6250.0 / var1;
        let var1 = f64::from(self.p9) * p * p / 2_147_483_648.0;
        let var2 = p * f64::from(self.p8) / 32_768.0;
        Some(p + (var1 + var2 + f64::from(self.p7)) / 16.0)
    }
}

/// International barometric formula.
pub fn altitude(pressure_hpa: f32, sea_level_hpa: f32) -> f32 {
    44_330.0 * (1.0 - libm::powf(pressure_hpa / sea_level_hpa, 0.1903))
}

/// One BMP280 sample.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Environment {
    pub temperature_c: f32,
    pub pressure_hpa: f32,
    pub altitude_m: f32,
}

impl Environment {
    pub fn temperature_f(&self) -> f32 {
        self.temperature_c * 9.0 / 5.0 + 32.0
    }
}

impl Report for Environment {
    fn report(&self) {
        info!("------------------------------");
        info!(
            "Temperature: {} C / {} F",
            self.temperature_c,
            self.temperature_f()
        );
        info!("Pressure:    {} hPa", self.pressure_hpa);
        info!("Altitude:    {} meters", self.altitude_m);
    }
}

fn raw20(bytes: &[u8]) -> i32 {
    (i32::from(bytes[0]) << 12) | (i32::from(bytes[1]) << 4) | (i32::from(bytes[2]) >> 4)
}

/// BMP280 in normal (continuous) mode.
pub struct Bmp280<I> {
    i2c: I,
    address: u8,
    calibration: Calibration,
    sea_level_hpa: f32,
}

impl<I: I2c> Bmp280<I> {
    /// Probe [`PRIMARY_ADDRESS`] then [`SECONDARY_ADDRESS`].
    pub async fn detect(i2c: I) -> Result<Self, Error> {
        Self::detect_at(i2c, &[PRIMARY_ADDRESS, SECONDARY_ADDRESS]).await
    }

    pub async fn detect_at(mut i2c: I, addresses: &[u8]) -> Result<Self, Error> {
        let address = find_device(&mut i2c, addresses, REG_CHIP_ID, CHIP_ID).await?;
        Self::configure(i2c, address).await
    }

    /// Check the chip id at `address`, read the trim values and start
    /// continuous measurement.
    pub async fn new(i2c: I, address: u8) -> Result<Self, Error> {
        Self::detect_at(i2c, &[address]).await
    }

    async fn configure(mut i2c: I, address: u8) -> Result<Self, Error> {
        let mut raw = [0_u8; 24];
        read_registers(&mut i2c, address, REG_CALIBRATION, &mut raw).await?;
        let calibration = Calibration::from_bytes(&raw);

        write_register(&mut i2c, address, REG_CONFIG, CONFIG_DEFAULT).await?;
        write_register(&mut i2c, address, REG_CTRL_MEAS, CTRL_MEAS_NORMAL).await?;

        Ok(Self {
            i2c,
            address,
            calibration,
            sea_level_hpa: SEA_LEVEL_HPA,
        })
    }

    #[must_use]
    pub fn with_sea_level_pressure(mut self, hpa: f32) -> Self {
        self.sea_level_hpa = hpa;
        self
    }

    pub const fn address(&self) -> u8 {
        self.address
    }

    pub const fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    /// Give the bus back.
    pub fn release(self) -> I {
        self.i2c
    }

    /// One burst read of pressure and temperature, compensated.
    pub async fn measure(&mut self) -> Result<Environment, Error> {
        let mut raw = [0_u8; 6];
        read_registers(&mut self.i2c, self.address, REG_DATA, &mut raw).await?;

        let adc_p = raw20(&raw[0..3]);
        let adc_t = raw20(&raw[3..6]);
        if adc_p == SKIPPED_SAMPLE || adc_t == SKIPPED_SAMPLE {
            return Err(Error::SkippedSample);
        }

        let (t_fine, celsius) = self.calibration.temperature(adc_t);
        let pascal = self
            .calibration
            .pressure(adc_p, t_fine)
            .ok_or(Error::InvalidCalibration)?;

        #[allow(clippy::cast_possible_truncation)]
        let pressure_hpa = (pascal / 100.0) as f32;
        #[allow(clippy::cast_possible_truncation)]
        let temperature_c = celsius as f32;

        Ok(Environment {
            temperature_c,
            pressure_hpa,
            altitude_m: altitude(pressure_hpa, self.sea_level_hpa),
        })
    }
}

impl<I: I2c> Readable for Bmp280<I> {
    type Reading = Environment;

    async fn read(&mut self) -> Result<Environment, Error> {
        self.measure().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_samples_are_twenty_bits() {
        assert_eq!(raw20(&[0x65, 0x5A, 0xC0]), 415_148);
        assert_eq!(raw20(&[0xFF, 0xFF, 0xFF]), 0xF_FFFF);
    }

    #[test]
    fn altitude_is_zero_at_sea_level() {
        assert!(altitude(SEA_LEVEL_HPA, SEA_LEVEL_HPA).abs() < 1e-3);
    }
}
