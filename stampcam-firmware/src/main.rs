//! Stampcam - ESP32-CAM capture and text overlay firmware
//!
//! Takes one picture per boot: mounts the SD card and the SPIFFS
//! partition, brings up the OV2640, stamps the picture number into the
//! frame and stores the result on both file systems. The picture counter
//! survives reboots in an EEPROM image kept in NVS.

use embedded_hal::delay::DelayNs;
use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::log::EspLogger;
use log::info;

use stampcam_core::{Boot, CaptureConfig, Peripherals};
use stampcam_drivers::ShadowEeprom;

use crate::camera::EspCamera;
use crate::storage::{NvsBlobStorage, SdMmcCard, SpiffsFs};
use crate::system::EspSystem;

mod board;
mod camera;
mod storage;
mod system;

mod config {
    use stampcam_core::CaptureConfig;

    include!(concat!(env!("OUT_DIR"), "/capture_config.rs"));
}

fn main() {
    // Required for the ESP-IDF runtime patches to be linked in
    esp_idf_svc::sys::link_patches();
    EspLogger::initialize_default();

    let mut delay = FreeRtos;
    delay.delay_ms(board::SERIAL_SETTLE_MS);

    system::disable_brownout();

    info!("Stampcam {} starting...", env!("CARGO_PKG_VERSION"));

    let config: &CaptureConfig = &config::CAPTURE_CONFIG;

    let mut peripherals = Peripherals {
        camera: EspCamera::new(),
        flash: SpiffsFs::new(board::SPIFFS_MOUNT_POINT, board::SPIFFS_PARTITION),
        sd: SdMmcCard::new(board::SD_MOUNT_POINT),
        store: ShadowEeprom::new(NvsBlobStorage::open(board::EEPROM_NAMESPACE)),
        system: EspSystem::new(),
        delay,
    };

    let report = Boot::new(config, board::CAMERA_PINS).run(&mut peripherals);

    info!(
        "Boot complete: sd {:?} ({:?}), fs {:?}, camera after {} attempt(s), eeprom {:?}",
        report.sd, report.card_type, report.flash_fs, report.camera_attempts, report.store
    );
    info!(
        "Picture {:?} stored as {} ({} bytes)",
        report.capture.picture_number, report.capture.file_id, report.capture.jpeg_len
    );
}
