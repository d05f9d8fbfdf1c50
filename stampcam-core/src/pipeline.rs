//! Capture, overlay and persist pipeline
//!
//! One run takes a frame from the camera, advances the picture counter,
//! stamps the caption into the decoded pixels, re-encodes the result and
//! writes it to the flash file system and then to the SD card.
//!
//! Failure classes:
//! - capture failure, flash or SD open failure, conversion failure:
//!   recorded in the [`CaptureReport`], the run completes normally
//! - encoder failure or a flash file that stays empty after every write
//!   attempt: returned as [`FatalError`], the caller restarts the device

use alloc::vec::Vec;

use embedded_hal::delay::DelayNs;
use stampcam_hal::camera::{Camera, CameraError, FrameBuffer};
use stampcam_hal::fs::{FlashFileSystem, SdCard, WritableFile};
use stampcam_hal::nvstore::NvStore;
use stampcam_hal::system::SystemControl;

use crate::config::CaptureConfig;
use crate::counter::PictureCounter;
use crate::naming::{self, FileId};
use crate::overlay::{self, OverlayColor, RgbMatrix};
use crate::retry::RetryPolicy;

/// Peripherals owned by the firmware for the lifetime of a boot
pub struct Peripherals<C, F, S, N, Y, D> {
    pub camera: C,
    pub flash: F,
    pub sd: S,
    pub store: N,
    pub system: Y,
    pub delay: D,
}

/// Errors that leave the device in a state only a restart recovers from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FatalError {
    /// Camera never initialized within the attempt budget
    CameraInitExhausted { attempts: u8, last: CameraError },
    /// JPEG encoder failed, usually no contiguous block left for its output
    EncodeFailed,
    /// Flash file still empty after every write attempt
    FlashWriteExhausted { attempts: u8 },
}

/// Non-fatal reasons a capture produced no stamped image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CaptureError {
    /// Frame could not be decoded into the pixel matrix
    Conversion(CameraError),
    /// Caption did not fit its buffer
    Caption,
}

/// Outcome of one pipeline run
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CaptureReport {
    /// Identifier of the SD card copy
    pub file_id: FileId,
    /// A frame was acquired from the camera
    pub captured: bool,
    /// Confirmed picture number, when the frame was acquired
    pub picture_number: Option<i32>,
    /// Size of the flash copy after writing (0 when not written)
    pub flash_size: u64,
    /// Size of the stamped JPEG (0 when not produced)
    pub jpeg_len: usize,
}

impl CaptureReport {
    /// The flash copy exists and is non-empty
    pub fn persisted(&self) -> bool {
        self.flash_size > 0
    }

    /// Frame captured and the SD card copy written
    pub fn success(&self) -> bool {
        self.captured && matches!(self.file_id, FileId::Saved(_))
    }
}

/// Run the pipeline once
///
/// The frame is released exactly once on every path after a successful
/// acquisition, including the fatal ones. A failed acquisition returns
/// immediately without touching the counter or the file systems.
pub fn capture_and_store<C, F, S, N, Y, D>(
    p: &mut Peripherals<C, F, S, N, Y, D>,
    config: &CaptureConfig,
) -> Result<CaptureReport, FatalError>
where
    C: Camera,
    F: FlashFileSystem,
    S: SdCard,
    N: NvStore,
    Y: SystemControl,
    D: DelayNs,
{
    info!("Taking a photo...");
    let mut report = CaptureReport::default();

    let Some(frame) = p.camera.acquire() else {
        warn!("Camera capture failed...");
        p.delay.delay_ms(config.settle_delay_ms);
        return Ok(report);
    };
    report.captured = true;
    info!(
        "Camera capture success: {}x{}, {} bytes",
        frame.width(),
        frame.height(),
        frame.data().len()
    );

    let number = next_picture_number(&mut p.store, config);
    report.picture_number = Some(number);

    let result = persist(p, config, &frame, number, &mut report);

    p.camera.release(frame);

    // The flash LED (GPIO 4) shares a line with the SD card data bus and
    // must not be driven here, or the next SD write faults.
    p.delay.delay_ms(config.settle_delay_ms);

    result.map(|()| report)
}

/// Advance the persistent counter, falling back to the stored value
fn next_picture_number<N: NvStore>(store: &mut N, config: &CaptureConfig) -> i32 {
    let counter = PictureCounter::new(config.counter_offset);
    match counter.advance(store) {
        Ok(update) => update.confirmed,
        Err(e) => {
            warn!("Picture counter not advanced: {:?}", e);
            counter.current(store).unwrap_or(0)
        }
    }
}

fn persist<C, F, S, N, Y, D>(
    p: &mut Peripherals<C, F, S, N, Y, D>,
    config: &CaptureConfig,
    frame: &C::Frame,
    number: i32,
    report: &mut CaptureReport,
) -> Result<(), FatalError>
where
    C: Camera,
    F: FlashFileSystem,
    S: SdCard,
    Y: SystemControl,
{
    let jpeg = match stamp_and_encode(&mut p.camera, &p.system, frame, config, number) {
        Ok(jpeg) => jpeg,
        Err(StampError::Capture(e)) => {
            warn!("Overlay skipped, nothing saved: {:?}", e);
            return Ok(());
        }
        Err(StampError::Encode(e)) => {
            error!("JPEG encoding failed: {:?}", e);
            return Err(FatalError::EncodeFailed);
        }
    };
    report.jpeg_len = jpeg.len();

    report.flash_size = write_flash(&mut p.flash, config, &jpeg)?;
    if !report.persisted() {
        info!("Picture size is not valid ... ");
        return Ok(());
    }
    info!("Picture size is valid ... ");

    report.file_id = write_sd(&mut p.sd, config, number, &jpeg);
    Ok(())
}

enum StampError {
    Capture(CaptureError),
    Encode(CameraError),
}

/// Decode, stamp and re-encode a frame
///
/// The pixel matrix is dropped before this returns on every path.
fn stamp_and_encode<C: Camera, Y: SystemControl>(
    camera: &mut C,
    system: &Y,
    frame: &C::Frame,
    config: &CaptureConfig,
    number: i32,
) -> Result<Vec<u8>, StampError> {
    let caption = naming::overlay_text(config, number)
        .map_err(|_| StampError::Capture(CaptureError::Caption))?;

    let mut matrix = RgbMatrix::new(frame.width(), frame.height());
    camera
        .to_rgb888(frame, matrix.as_bytes_mut())
        .map_err(|e| StampError::Capture(CaptureError::Conversion(e)))?;

    overlay::stamp(
        &mut matrix,
        &caption,
        OverlayColor(config.overlay_color),
        config.glyph_width,
        config.bottom_margin,
    );

    let encoded = camera.encode_jpeg(
        matrix.as_bytes(),
        matrix.width(),
        matrix.height(),
        config.jpeg_quality,
    );
    debug!("Free heap before matrix release (bytes): {}", system.free_heap());
    drop(matrix);
    debug!("Free heap after matrix release (bytes): {}", system.free_heap());

    encoded.map_err(StampError::Encode)
}

/// Write the JPEG to the flash file system
///
/// Returns the resulting file size; 0 when the file could not be created.
fn write_flash<F: FlashFileSystem>(
    fs: &mut F,
    config: &CaptureConfig,
    jpeg: &[u8],
) -> Result<u64, FatalError> {
    let path = config.flash_photo_path;
    info!("Picture file name (FS): {}", path);

    let mut file = match fs.create(path) {
        Ok(file) => file,
        Err(e) => {
            warn!("Failed to open file (FS) in writing mode: {:?}", e);
            return Ok(0);
        }
    };

    // Low heap can leave the file empty; writing again usually succeeds
    let policy = RetryPolicy::new(config.flash_write_attempts);
    let outcome = policy.run(|attempt| {
        if let Err(e) = file.write(jpeg) {
            warn!("Write (FS) failed: {:?}", e);
        }
        let size = file.size().unwrap_or(0);
        info!(
            "File Size: {} bytes | write attempt: {} of {}",
            size,
            attempt,
            policy.max_attempts()
        );
        if size > 0 {
            Ok(size)
        } else {
            Err(())
        }
    });

    if let Err(e) = file.close() {
        warn!("Closing file (FS) failed: {:?}", e);
    }

    match outcome {
        Ok(success) => Ok(success.value),
        Err(exhausted) => {
            error!(
                "File (FS) still empty after {} write attempts",
                exhausted.attempts
            );
            Err(FatalError::FlashWriteExhausted {
                attempts: exhausted.attempts,
            })
        }
    }
}

/// Write the JPEG to the SD card under the picture number
fn write_sd<S: SdCard>(sd: &mut S, config: &CaptureConfig, number: i32, jpeg: &[u8]) -> FileId {
    let Ok(path) = naming::sd_path(config, number) else {
        warn!("Picture number {} does not fit the SD path", number);
        return FileId::SaveFailed;
    };
    info!("Picture file name (SDCARD): {}", path.as_str());

    let mut file = match sd.create(&path) {
        Ok(file) => file,
        Err(e) => {
            warn!("Failed to open file (SDCARD) in writing mode: {:?}", e);
            return FileId::SaveFailed;
        }
    };

    let written = file.write(jpeg);
    if let Err(e) = file.close() {
        warn!("Closing file (SDCARD) failed: {:?}", e);
    }

    match written {
        Ok(n) => {
            if n < jpeg.len() {
                warn!("Short write (SDCARD): {} of {} bytes", n, jpeg.len());
            }
            info!("The picture has been saved in (SDCARD) : {}", path.as_str());
            FileId::Saved(path)
        }
        Err(e) => {
            warn!("Write (SDCARD) failed: {:?}", e);
            FileId::SaveFailed
        }
    }
}
