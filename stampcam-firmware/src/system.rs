//! Restart, memory diagnostics and brownout control

use core::ptr;

use esp_idf_svc::hal::reset;
use esp_idf_svc::sys;
use stampcam_hal::system::{SystemControl, SystemInfo};

/// RTC_CNTL_BROWN_OUT_REG on the ESP32 (DR_REG_RTCCNTL_BASE + 0xd4)
const RTC_CNTL_BROWN_OUT_REG: usize = 0x3FF4_80D4;

/// Turn the brownout detector off
///
/// The camera and the SD card draw current spikes that trip the detector
/// on USB-powered boards and reset the chip mid-capture.
pub fn disable_brownout() {
    unsafe { ptr::write_volatile(RTC_CNTL_BROWN_OUT_REG as *mut u32, 0) };
}

/// Total PSRAM mapped into the heap, 0 when the board has none
pub fn psram_size() -> usize {
    unsafe { sys::heap_caps_get_total_size(sys::MALLOC_CAP_SPIRAM) }
}

/// ESP-IDF system services
#[derive(Default)]
pub struct EspSystem;

impl EspSystem {
    pub fn new() -> Self {
        Self
    }
}

impl SystemControl for EspSystem {
    fn restart(&mut self) -> ! {
        reset::restart()
    }

    fn free_heap(&self) -> u32 {
        unsafe { sys::esp_get_free_heap_size() }
    }

    fn psram_found(&self) -> bool {
        psram_size() > 0
    }

    fn psram_init(&mut self) -> bool {
        // CONFIG_SPIRAM_BOOT_INIT brings PSRAM up before main runs
        unsafe { sys::esp_psram_is_initialized() }
    }

    fn system_info(&self) -> SystemInfo {
        let mut chip = sys::esp_chip_info_t::default();
        unsafe { sys::esp_chip_info(&mut chip) };

        let mut cpu = sys::rtc_cpu_freq_config_t::default();
        unsafe { sys::rtc_clk_cpu_freq_get_config(&mut cpu) };

        let mut flash_size = 0u32;
        // Null selects the chip the firmware runs from
        if sys::esp!(unsafe { sys::esp_flash_get_size(ptr::null_mut(), &mut flash_size) }).is_err() {
            flash_size = 0;
        }

        SystemInfo {
            heap_size: heap_total(sys::MALLOC_CAP_INTERNAL),
            free_heap: heap_free(sys::MALLOC_CAP_INTERNAL),
            psram_size: heap_total(sys::MALLOC_CAP_SPIRAM),
            free_psram: heap_free(sys::MALLOC_CAP_SPIRAM),
            chip_revision: chip.revision,
            cpu_freq_mhz: cpu.freq_mhz,
            flash_size,
            flash_speed_hz: parse_flash_freq(sys::CONFIG_ESPTOOLPY_FLASHFREQ),
        }
    }
}

fn heap_total(caps: u32) -> u32 {
    unsafe { sys::heap_caps_get_total_size(caps) as u32 }
}

fn heap_free(caps: u32) -> u32 {
    unsafe { sys::heap_caps_get_free_size(caps) as u32 }
}

/// Parse the configured flash clock (`"40m"`, `"80m"`, nul terminated)
fn parse_flash_freq(raw: &[u8]) -> u32 {
    let mhz = raw
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .fold(0u32, |acc, b| acc * 10 + (b - b'0') as u32);
    mhz * 1_000_000
}
