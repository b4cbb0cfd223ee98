//! Logs BMP280 temperature, pressure and altitude every two seconds.

#![no_std]
#![no_main]

use embassy_executor::Spawner;
use embassy_time::Duration;
use esp_backtrace as _;
use esp_hal::timer::timg::TimerGroup;
use esp_println as _;
use feather_pulse::{
    Pace,
    bmp280::Bmp280,
    board::{
        self,
        PoweredI2c,
    },
};

esp_bootloader_esp_idf::esp_app_desc!();

#[esp_rtos::main]
async fn main(_spawner: Spawner) -> ! {
    let peripherals = feather_pulse::init();
    let resources = feather_pulse::split_resources!(peripherals);

    esp_alloc::heap_allocator!(size: 32 * 1024);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    board::monitor::<Bmp280<PoweredI2c>>(resources, Pace::fixed(Duration::from_secs(2))).await
}
