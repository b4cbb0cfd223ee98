//! Purple breathing pulse: brightness ramps 0 → 0.6 → 0 in steps of 0.02.

#![no_std]
#![no_main]

use embassy_executor::Spawner;
use embassy_time::Duration;
use esp_backtrace as _;
use esp_hal::timer::timg::TimerGroup;
use esp_println as _;
use feather_pulse::{
    Breathing,
    Pace,
    board,
};

esp_bootloader_esp_idf::esp_app_desc!();

#[esp_rtos::main]
async fn main(_spawner: Spawner) -> ! {
    let peripherals = feather_pulse::init();
    let resources = feather_pulse::split_resources!(peripherals);

    esp_alloc::heap_allocator!(size: 32 * 1024);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    board::animate(
        resources,
        Breathing::default(),
        Pace::fixed(Duration::from_millis(10)),
    )
    .await
}
