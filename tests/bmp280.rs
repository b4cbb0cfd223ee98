mod common;

use common::{
    DATASHEET_TRIM,
    FakeI2c,
    bmp280_at,
    calibration_bytes,
};
use embassy_futures::block_on;
use feather_pulse::{
    Error,
    bmp280::{
        Bmp280,
        PRIMARY_ADDRESS,
        SECONDARY_ADDRESS,
    },
    sink::Readable as _,
};

#[test]
fn compensates_the_datasheet_example() {
    let mut sensor = block_on(Bmp280::detect(bmp280_at(PRIMARY_ADDRESS))).unwrap();
    let reading = block_on(sensor.measure()).unwrap();

    assert!((reading.temperature_c - 25.08).abs() < 0.01, "{reading:?}");
    assert!((reading.pressure_hpa - 1006.53).abs() < 0.01, "{reading:?}");
    assert!((reading.altitude_m - 56.1).abs() < 0.5, "{reading:?}");
    assert!((reading.temperature_f() - 77.14).abs() < 0.02);
}

#[test]
fn altitude_follows_the_reference_pressure() {
    let sensor = block_on(Bmp280::detect(bmp280_at(PRIMARY_ADDRESS))).unwrap();
    let mut sensor = sensor.with_sea_level_pressure(1006.5327);
    let reading = block_on(sensor.read()).unwrap();
    assert!(reading.altitude_m.abs() < 0.5, "{reading:?}");
}

#[test]
fn starts_continuous_measurement() {
    let sensor = block_on(Bmp280::detect(bmp280_at(PRIMARY_ADDRESS))).unwrap();
    let bus = sensor.release();
    assert_eq!(bus.written(0xF5), Some(0x00));
    assert_eq!(bus.written(0xF4), Some(0x57));
}

#[test]
fn falls_back_to_the_secondary_address() {
    let sensor = block_on(Bmp280::detect(bmp280_at(SECONDARY_ADDRESS))).unwrap();
    assert_eq!(sensor.address(), SECONDARY_ADDRESS);
}

#[test]
fn reports_the_first_address_when_nothing_answers() {
    let result = block_on(Bmp280::detect(FakeI2c::new(0x10)));
    assert_eq!(
        result.err(),
        Some(Error::DeviceNotFound {
            address: PRIMARY_ADDRESS
        })
    );
}

#[test]
fn rejects_a_foreign_chip() {
    let bus = bmp280_at(PRIMARY_ADDRESS).with_registers(0xD0, &[0x60]);
    let result = block_on(Bmp280::detect(bus));
    assert_eq!(
        result.err(),
        Some(Error::UnexpectedChipId {
            address: PRIMARY_ADDRESS,
            found: 0x60,
            expected: 0x58,
        })
    );
}

#[test]
fn zero_pressure_trim_is_invalid() {
    let mut trim = DATASHEET_TRIM;
    trim[3] = 0;
    let bus = bmp280_at(PRIMARY_ADDRESS).with_registers(0x88, &calibration_bytes(trim));
    let mut sensor = block_on(Bmp280::detect(bus)).unwrap();
    assert_eq!(block_on(sensor.measure()), Err(Error::InvalidCalibration));
}

#[test]
fn bus_errors_surface_from_construction() {
    let mut bus = bmp280_at(PRIMARY_ADDRESS);
    bus.fail_reads = true;
    let result = block_on(Bmp280::new(bus, PRIMARY_ADDRESS));
    assert_eq!(
        result.err(),
        Some(Error::I2c(embedded_hal::i2c::ErrorKind::Bus))
    );
}

#[test]
fn a_sample_before_the_first_conversion_is_rejected() {
    let bus = bmp280_at(PRIMARY_ADDRESS).with_registers(0xF7, &[0x80, 0, 0, 0x80, 0, 0]);
    let mut sensor = block_on(Bmp280::detect(bus)).unwrap();
    assert_eq!(block_on(sensor.measure()), Err(Error::SkippedSample));
}

#[test]
fn a_skipped_pressure_channel_is_rejected() {
    let bus =
        bmp280_at(PRIMARY_ADDRESS).with_registers(0xF7, &[0x80, 0, 0, 0x7E, 0xED, 0x00]);
    let mut sensor = block_on(Bmp280::detect(bus)).unwrap();
    assert_eq!(block_on(sensor.read()), Err(Error::SkippedSample));
}
