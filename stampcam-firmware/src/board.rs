//! AI Thinker ESP32-CAM wiring
//!
//! OV2640 on the parallel camera bus, SD card slot on the SDMMC host
//! (slot 1) and the flash LED on GPIO 4, which doubles as SD data line 1.
//! The SD card is therefore always mounted in 1-bit mode.

use stampcam_hal::camera::CameraPins;

/// Camera GPIO assignment
pub const CAMERA_PINS: CameraPins = CameraPins {
    pwdn: 32,
    reset: -1,
    xclk: 0,
    sccb_sda: 26,
    sccb_scl: 27,
    // D0..D7 (Y2..Y9)
    data: [5, 18, 19, 21, 36, 39, 34, 35],
    vsync: 25,
    href: 23,
    pclk: 22,
};

/// VFS mount point of the flash file system
pub const SPIFFS_MOUNT_POINT: &str = "/spiffs";

/// Label of the SPIFFS partition in partitions.csv
pub const SPIFFS_PARTITION: &str = "spiffs";

/// VFS mount point of the SD card
pub const SD_MOUNT_POINT: &str = "/sdcard";

/// NVS namespace holding the EEPROM image
pub const EEPROM_NAMESPACE: &str = "eeprom";

/// Time for the serial monitor to attach before anything is logged (ms)
pub const SERIAL_SETTLE_MS: u32 = 5_000;
