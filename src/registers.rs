//! Register access shared by the I2C sensor drivers.

use embedded_hal_async::i2c::I2c;

use crate::error::Error;

pub(crate) async fn write_register<I: I2c>(
    i2c: &mut I,
    address: u8,
    register: u8,
    value: u8,
) -> Result<(), Error> {
    i2c.write(address, &[register, value])
        .await
        .map_err(Error::i2c)
}

/// Burst read starting at `register`. Relies on the device auto-incrementing.
pub(crate) async fn read_registers<I: I2c>(
    i2c: &mut I,
    address: u8,
    register: u8,
    buf: &mut [u8],
) -> Result<(), Error> {
    i2c.write_read(address, &[register], buf)
        .await
        .map_err(Error::i2c)
}

pub(crate) async fn read_register<I: I2c>(
    i2c: &mut I,
    address: u8,
    register: u8,
) -> Result<u8, Error> {
    let mut buf = [0_u8];
    read_registers(i2c, address, register, &mut buf).await?;
    Ok(buf[0])
}

/// Read an identification register, turning an address NACK into
/// [`Error::DeviceNotFound`] and a wrong value into
/// [`Error::UnexpectedChipId`].
pub(crate) async fn expect_id<I: I2c>(
    i2c: &mut I,
    address: u8,
    register: u8,
    expected: u8,
) -> Result<(), Error> {
    let found = match read_register(i2c, address, register).await {
        Ok(found) => found,
        Err(err) if err.is_address_nack() => return Err(Error::DeviceNotFound { address }),
        Err(err) => return Err(err),
    };
    if found == expected {
        Ok(())
    } else {
        Err(Error::UnexpectedChipId {
            address,
            found,
            expected,
        })
    }
}

/// Try `addresses` in order and return the first one whose id register
/// matches. A device that answers with the wrong id stops the search.
pub(crate) async fn find_device<I: I2c>(
    i2c: &mut I,
    addresses: &[u8],
    register: u8,
    expected: u8,
) -> Result<u8, Error> {
    let mut missing = None;
    for &address in addresses {
        match expect_id(i2c, address, register, expected).await {
            Ok(()) => return Ok(address),
            Err(err @ Error::DeviceNotFound { .. }) => {
                debug!("Nothing at {:#x}", address);
                missing.get_or_insert(err);
            }
            Err(err) => return Err(err),
        }
    }
    Err(missing.unwrap_or(Error::DeviceNotFound { address: 0 }))
}
