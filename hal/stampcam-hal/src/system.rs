//! System control and diagnostics

/// Snapshot of memory and chip information
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SystemInfo {
    /// Internal heap size in bytes
    pub heap_size: u32,
    /// Free internal heap in bytes
    pub free_heap: u32,
    /// External PSRAM size in bytes (0 when absent)
    pub psram_size: u32,
    /// Free PSRAM in bytes
    pub free_psram: u32,
    /// Silicon revision
    pub chip_revision: u16,
    /// CPU clock in MHz
    pub cpu_freq_mhz: u32,
    /// Flash chip size in bytes
    pub flash_size: u32,
    /// Flash clock in Hz
    pub flash_speed_hz: u32,
}

/// Device-level control
pub trait SystemControl {
    /// Reboot the device. Never returns.
    fn restart(&mut self) -> !;

    /// Free heap in bytes
    fn free_heap(&self) -> u32;

    /// Check whether external PSRAM was detected
    fn psram_found(&self) -> bool;

    /// Bring up external PSRAM if the platform has not done so already
    ///
    /// Returns `true` when PSRAM is initialized and usable.
    fn psram_init(&mut self) -> bool;

    /// Collect memory and chip diagnostics
    fn system_info(&self) -> SystemInfo;
}
