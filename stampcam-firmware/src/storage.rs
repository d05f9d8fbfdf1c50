//! Storage backends: SPIFFS, SD card over SDMMC, NVS blobs
//!
//! Both file systems are registered with the ESP-IDF VFS and then written
//! through [`VfsFileSystem`]; this module only owns mounting.

use std::ffi::CString;
use std::ptr;

use esp_idf_svc::nvs::{EspDefaultNvsPartition, EspNvs, NvsDefault};
use esp_idf_svc::sys;
use log::{debug, warn};
use stampcam_drivers::vfs::{VfsFile, VfsFileSystem};
use stampcam_hal::fs::{CardType, FileSystem, FlashFileSystem, FsError, SdBusWidth, SdCard};
use stampcam_hal::storage::{BlobStorage, StorageError, StorageKey};

/// Open file limit per mounted file system
const MAX_OPEN_FILES: usize = 5;

/// OCR bit set by high capacity cards
const SD_OCR_SDHC_CAP: u32 = 1 << 30;

fn c_string(s: &str) -> Result<CString, FsError> {
    CString::new(s).map_err(|_| FsError::InvalidPath)
}

/// SPIFFS partition mounted on the VFS
pub struct SpiffsFs {
    vfs: VfsFileSystem,
    partition: &'static str,
    mounted: bool,
}

impl SpiffsFs {
    pub fn new(mount_point: &'static str, partition: &'static str) -> Self {
        Self {
            vfs: VfsFileSystem::new(mount_point),
            partition,
            mounted: false,
        }
    }
}

impl FileSystem for SpiffsFs {
    type File = VfsFile;

    fn create(&mut self, path: &str) -> Result<VfsFile, FsError> {
        if !self.mounted {
            return Err(FsError::NotMounted);
        }
        self.vfs.create(path)
    }
}

impl FlashFileSystem for SpiffsFs {
    fn mount(&mut self, format_on_fail: bool) -> Result<(), FsError> {
        if self.mounted {
            return Ok(());
        }

        let base_path = c_string(&self.vfs.mount_point().to_string_lossy())?;
        let label = c_string(self.partition)?;
        let conf = sys::esp_vfs_spiffs_conf_t {
            base_path: base_path.as_ptr(),
            partition_label: label.as_ptr(),
            max_files: MAX_OPEN_FILES,
            format_if_mount_failed: format_on_fail,
        };

        // The VFS copies both strings during registration
        sys::esp!(unsafe { sys::esp_vfs_spiffs_register(&conf) }).map_err(|e| {
            warn!("SPIFFS register failed: {}", e);
            FsError::Mount
        })?;

        let mut total = 0usize;
        let mut used = 0usize;
        if sys::esp!(unsafe { sys::esp_spiffs_info(label.as_ptr(), &mut total, &mut used) }).is_ok() {
            debug!("SPIFFS {} bytes, {} used", total, used);
        }

        self.mounted = true;
        Ok(())
    }
}

/// SD card on SDMMC slot 1, FAT formatted
pub struct SdMmcCard {
    vfs: VfsFileSystem,
    card: *mut sys::sdmmc_card_t,
}

impl SdMmcCard {
    pub fn new(mount_point: &'static str) -> Self {
        Self {
            vfs: VfsFileSystem::new(mount_point),
            card: ptr::null_mut(),
        }
    }

    fn host_config() -> sys::sdmmc_host_t {
        // Field for field what SDMMC_HOST_DEFAULT() expands to
        sys::sdmmc_host_t {
            flags: sys::SDMMC_HOST_FLAG_8BIT
                | sys::SDMMC_HOST_FLAG_4BIT
                | sys::SDMMC_HOST_FLAG_1BIT
                | sys::SDMMC_HOST_FLAG_DDR,
            slot: sys::SDMMC_HOST_SLOT_1 as i32,
            max_freq_khz: sys::SDMMC_FREQ_DEFAULT as i32,
            io_voltage: 3.3,
            init: Some(sys::sdmmc_host_init),
            set_bus_width: Some(sys::sdmmc_host_set_bus_width),
            get_bus_width: Some(sys::sdmmc_host_get_slot_width),
            set_bus_ddr_mode: Some(sys::sdmmc_host_set_bus_ddr_mode),
            set_card_clk: Some(sys::sdmmc_host_set_card_clk),
            set_cclk_always_on: Some(sys::sdmmc_host_set_cclk_always_on),
            do_transaction: Some(sys::sdmmc_host_do_transaction),
            __bindgen_anon_1: sys::sdmmc_host_t__bindgen_ty_1 {
                deinit: Some(sys::sdmmc_host_deinit),
            },
            io_int_enable: Some(sys::sdmmc_host_io_int_enable),
            io_int_wait: Some(sys::sdmmc_host_io_int_wait),
            command_timeout_ms: 0,
            get_real_freq: Some(sys::sdmmc_host_get_real_freq),
            ..Default::default()
        }
    }

    fn slot_config(bus_width: SdBusWidth) -> sys::sdmmc_slot_config_t {
        sys::sdmmc_slot_config_t {
            width: match bus_width {
                SdBusWidth::OneBit => 1,
                SdBusWidth::FourBit => 4,
            },
            // No card detect or write protect lines on the ESP32-CAM
            __bindgen_anon_1: sys::sdmmc_slot_config_t__bindgen_ty_1 {
                gpio_cd: sys::gpio_num_t_GPIO_NUM_NC,
            },
            __bindgen_anon_2: sys::sdmmc_slot_config_t__bindgen_ty_2 {
                gpio_wp: sys::gpio_num_t_GPIO_NUM_NC,
            },
            ..Default::default()
        }
    }
}

impl FileSystem for SdMmcCard {
    type File = VfsFile;

    fn create(&mut self, path: &str) -> Result<VfsFile, FsError> {
        if self.card.is_null() {
            return Err(FsError::NotMounted);
        }
        self.vfs.create(path)
    }
}

impl SdCard for SdMmcCard {
    fn mount(&mut self, bus_width: SdBusWidth) -> Result<(), FsError> {
        if !self.card.is_null() {
            return Ok(());
        }

        let base_path = c_string(&self.vfs.mount_point().to_string_lossy())?;
        let host = Self::host_config();
        let slot = Self::slot_config(bus_width);
        let mount_config = sys::esp_vfs_fat_sdmmc_mount_config_t {
            format_if_mount_failed: false,
            max_files: MAX_OPEN_FILES as i32,
            allocation_unit_size: 16 * 1024,
            ..Default::default()
        };

        let mut card: *mut sys::sdmmc_card_t = ptr::null_mut();
        sys::esp!(unsafe {
            sys::esp_vfs_fat_sdmmc_mount(
                base_path.as_ptr(),
                &host,
                &slot as *const sys::sdmmc_slot_config_t as *const core::ffi::c_void,
                &mount_config,
                &mut card,
            )
        })
        .map_err(|e| {
            warn!("SD/MMC mount failed: {}", e);
            FsError::Mount
        })?;

        self.card = card;
        Ok(())
    }

    fn card_type(&mut self) -> CardType {
        if self.card.is_null() {
            return CardType::None;
        }
        // Owned by the FAT driver until unmount, which never happens
        let card = unsafe { &*self.card };
        if card.is_mmc() != 0 {
            CardType::Mmc
        } else if card.ocr & SD_OCR_SDHC_CAP != 0 {
            CardType::Sdhc
        } else {
            CardType::Sd
        }
    }
}

/// Blob storage in an NVS namespace, one blob per [`StorageKey`]
///
/// When the namespace cannot be opened every operation fails with
/// [`StorageError::Storage`], so the EEPROM layer reports the failure at
/// `begin` instead of the firmware stopping here.
pub struct NvsBlobStorage {
    nvs: Option<EspNvs<NvsDefault>>,
}

impl NvsBlobStorage {
    /// Open `namespace` in the default NVS partition
    pub fn open(namespace: &str) -> Self {
        let nvs = EspDefaultNvsPartition::take()
            .and_then(|partition| EspNvs::new(partition, namespace, true));
        match nvs {
            Ok(nvs) => Self { nvs: Some(nvs) },
            Err(e) => {
                warn!("NVS namespace {} unavailable: {}", namespace, e);
                Self { nvs: None }
            }
        }
    }

    fn nvs(&mut self) -> Result<&mut EspNvs<NvsDefault>, StorageError> {
        self.nvs.as_mut().ok_or(StorageError::Storage)
    }
}

impl BlobStorage for NvsBlobStorage {
    fn read(&mut self, key: StorageKey, buffer: &mut [u8]) -> Result<usize, StorageError> {
        match self.nvs()?.get_blob(key.name(), buffer) {
            Ok(Some(data)) => Ok(data.len()),
            Ok(None) => Err(StorageError::NotFound),
            Err(e) if e.code() == sys::ESP_ERR_NVS_INVALID_LENGTH as i32 => {
                Err(StorageError::BufferTooSmall)
            }
            Err(e) => {
                warn!("NVS read of {} failed: {}", key.name(), e);
                Err(StorageError::Storage)
            }
        }
    }

    fn write(&mut self, key: StorageKey, data: &[u8]) -> Result<(), StorageError> {
        self.nvs()?.set_blob(key.name(), data).map_err(|e| {
            warn!("NVS write of {} failed: {}", key.name(), e);
            if e.code() == sys::ESP_ERR_NVS_NOT_ENOUGH_SPACE as i32 {
                StorageError::Full
            } else {
                StorageError::Storage
            }
        })
    }

    fn blob_len(&mut self, key: StorageKey) -> Result<usize, StorageError> {
        match self.nvs()?.blob_len(key.name()) {
            Ok(Some(len)) => Ok(len),
            Ok(None) => Err(StorageError::NotFound),
            Err(e) => {
                warn!("NVS size query of {} failed: {}", key.name(), e);
                Err(StorageError::Storage)
            }
        }
    }
}
