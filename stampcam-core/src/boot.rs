//! Boot sequence
//!
//! Brings up the peripherals in a fixed order (SD card, flash file system,
//! camera, counter store), logs system diagnostics and runs the capture
//! pipeline exactly once. There is no main loop: the device takes one
//! picture per boot.
//!
//! Only two conditions restart the device: the camera not initializing
//! within its attempt budget, and a [`FatalError`] from the pipeline.
//! Every other initializer failure is logged, recorded in the
//! [`BootReport`] and the sequence carries on.

use embedded_hal::delay::DelayNs;
use stampcam_hal::camera::{Camera, CameraPins};
use stampcam_hal::fs::{CardType, FlashFileSystem, SdBusWidth, SdCard};
use stampcam_hal::nvstore::NvStore;
use stampcam_hal::system::SystemControl;

use crate::config::{CameraProfile, CaptureConfig};
use crate::pipeline::{capture_and_store, CaptureReport, FatalError, Peripherals};
use crate::retry::RetryPolicy;

/// Result of bringing up one peripheral
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InitStatus {
    /// Peripheral is ready
    Ready,
    /// Peripheral answered but has no usable medium (no SD card inserted)
    NoMedia,
    /// Peripheral failed to initialize
    Failed,
}

/// What happened during one boot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootReport {
    pub sd: InitStatus,
    pub card_type: CardType,
    pub flash_fs: InitStatus,
    /// Attempt on which the camera initialized
    pub camera_attempts: u8,
    pub store: InitStatus,
    pub capture: CaptureReport,
}

/// Boot sequencer
pub struct Boot<'a> {
    config: &'a CaptureConfig,
    pins: CameraPins,
}

impl<'a> Boot<'a> {
    /// Create a sequencer for the given configuration and camera wiring
    ///
    /// An invalid configuration is replaced by [`CaptureConfig::DEFAULT`].
    pub fn new(config: &'a CaptureConfig, pins: CameraPins) -> Self {
        let config = match config.validate() {
            Ok(()) => config,
            Err(e) => {
                error!("Invalid capture configuration ({:?}), using defaults", e);
                &CaptureConfig::DEFAULT
            }
        };
        Self { config, pins }
    }

    /// Configuration in effect
    pub fn config(&self) -> &CaptureConfig {
        self.config
    }

    /// Initialize everything and take one picture
    ///
    /// Returns only when no restart was needed.
    pub fn run<C, F, S, N, Y, D>(&self, p: &mut Peripherals<C, F, S, N, Y, D>) -> BootReport
    where
        C: Camera,
        F: FlashFileSystem,
        S: SdCard,
        N: NvStore,
        Y: SystemControl,
        D: DelayNs,
    {
        let (sd, card_type) = init_sd_card(&mut p.sd);
        let flash_fs = self.init_flash_fs(p);
        let camera_attempts = self.init_camera(p);
        let store = self.init_store(&mut p.store);

        log_system_info(&p.system);

        let capture = match capture_and_store(p, self.config) {
            Ok(report) => report,
            Err(fatal) => self.escalate(p, fatal),
        };
        info!(
            "Capture finished: {} (success: {})",
            capture.file_id,
            capture.success()
        );

        BootReport {
            sd,
            card_type,
            flash_fs,
            camera_attempts,
            store,
            capture,
        }
    }

    fn init_flash_fs<C, F, S, N, Y, D>(&self, p: &mut Peripherals<C, F, S, N, Y, D>) -> InitStatus
    where
        F: FlashFileSystem,
        D: DelayNs,
    {
        match p.flash.mount(true) {
            Ok(()) => {
                info!("File System mounted successfully");
                p.delay.delay_ms(self.config.mount_delay_ms);
                InitStatus::Ready
            }
            Err(e) => {
                error!("An Error has occurred while mounting FS: {:?}", e);
                InitStatus::Failed
            }
        }
    }

    /// Bring up the camera, restarting the device if it never answers
    fn init_camera<C, F, S, N, Y, D>(&self, p: &mut Peripherals<C, F, S, N, Y, D>) -> u8
    where
        C: Camera,
        Y: SystemControl,
        D: DelayNs,
    {
        let psram = p.system.psram_found();
        if psram {
            info!("PSRAM found");
        } else {
            info!("PSRAM not found");
        }

        let profile = CameraProfile::select(psram);
        let camera_config = profile.camera_config(self.pins);
        debug!(
            "Camera profile: {:?}, quality {}",
            profile.frame_size, profile.jpeg_quality
        );

        if p.system.psram_init() {
            info!("PSRAM initiated");
        } else {
            warn!("PSRAM initiation failed");
        }

        let camera = &mut p.camera;
        let outcome = RetryPolicy::new(self.config.camera_init_attempts).run(|attempt| {
            camera.init(&camera_config).inspect_err(|e| {
                warn!("Camera init failed with error {:?}", e);
                warn!("Init trial {}", attempt);
            })
        });

        match outcome {
            Ok(success) => {
                info!("Camera init successful");
                success.attempt
            }
            Err(exhausted) => self.escalate(
                p,
                FatalError::CameraInitExhausted {
                    attempts: exhausted.attempts,
                    last: exhausted.last_error,
                },
            ),
        }
    }

    fn init_store<N: NvStore>(&self, store: &mut N) -> InitStatus {
        match store.begin(self.config.store_size) {
            Ok(()) => {
                info!("Success to initialise EEPROM...");
                InitStatus::Ready
            }
            Err(e) => {
                warn!("failed to initialise EEPROM: {:?}", e);
                InitStatus::Failed
            }
        }
    }

    /// Log the failure, let the log drain and restart
    fn escalate<C, F, S, N, Y, D>(&self, p: &mut Peripherals<C, F, S, N, Y, D>, fatal: FatalError) -> !
    where
        Y: SystemControl,
        D: DelayNs,
    {
        error!("Fatal: {:?}, restarting", fatal);
        p.delay.delay_ms(self.config.restart_delay_ms);
        p.system.restart()
    }
}

/// Mount the SD card in 1-bit mode and probe the card type
fn init_sd_card<S: SdCard>(sd: &mut S) -> (InitStatus, CardType) {
    // 1-bit mode keeps GPIO 4 (flash LED) and GPIO 12/13 off the bus
    if let Err(e) = sd.mount(SdBusWidth::OneBit) {
        warn!("SD Card Mount Failed: {:?}", e);
        return (InitStatus::Failed, CardType::None);
    }
    info!("SD Card Mount successful");

    match sd.card_type() {
        CardType::None => {
            warn!("No SD Card attached");
            (InitStatus::NoMedia, CardType::None)
        }
        card => {
            info!("SD Card attached: {:?}", card);
            (InitStatus::Ready, card)
        }
    }
}

fn log_system_info<Y: SystemControl>(system: &Y) {
    let info = system.system_info();
    info!(
        "Internal Total heap {}, internal Free Heap {}",
        info.heap_size, info.free_heap
    );
    info!(
        "SPIRam Total heap {}, SPIRam Free Heap {}",
        info.psram_size, info.free_psram
    );
    info!(
        "ChipRevision {}, Cpu Freq {}",
        info.chip_revision, info.cpu_freq_mhz
    );
    info!(
        "Flash Size {}, Flash Speed {}",
        info.flash_size, info.flash_speed_hz
    );
}
