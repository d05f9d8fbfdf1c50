//! Capture configuration
//!
//! Every fixed path, offset and tuning value the firmware relies on lives
//! here. The defaults are the values existing devices were deployed with;
//! changing the paths or the counter offset orphans data already on the
//! card or in the EEPROM image.

use stampcam_hal::camera::{CameraConfig, CameraPins, FrameSize, PixelFormat};

/// Size of the counter value stored in the non-volatile store
pub const COUNTER_SIZE: usize = 4;

/// Longest overlay label accepted (the counter is appended after it)
pub const MAX_LABEL_LEN: usize = 48;

/// Longest storage path accepted
pub const MAX_PATH_LEN: usize = 48;

/// Configuration validation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// JPEG quality outside 1..=100
    JpegQuality,
    /// A retry budget of zero attempts
    ZeroAttempts,
    /// Path does not start with `/` or is too long
    InvalidPath,
    /// Counter does not fit in the store at the configured offset
    CounterOutOfStore,
    /// Overlay label too long
    LabelTooLong,
}

/// Capture pipeline and boot configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CaptureConfig {
    /// Photo path on the flash file system, overwritten on every run
    pub flash_photo_path: &'static str,
    /// SD card file name prefix, followed by the picture number
    pub sd_path_prefix: &'static str,
    /// SD card file name suffix
    pub sd_path_suffix: &'static str,
    /// Byte offset of the picture counter in the non-volatile store
    pub counter_offset: usize,
    /// Size of the non-volatile store region
    pub store_size: usize,
    /// Overlay caption, followed by the picture number
    pub overlay_label: &'static str,
    /// Overlay colour as `0x00RRGGBB`
    pub overlay_color: u32,
    /// Horizontal advance per character used to centre the caption
    pub glyph_width: u32,
    /// Distance of the caption's top edge from the bottom of the frame
    pub bottom_margin: u32,
    /// Quality for re-encoding the stamped image (1-100)
    pub jpeg_quality: u8,
    /// Write-and-check attempts before the flash write is declared dead
    pub flash_write_attempts: u8,
    /// Camera initialization attempts before the device restarts
    pub camera_init_attempts: u8,
    /// Delay after the pipeline for peripherals to settle (ms)
    pub settle_delay_ms: u32,
    /// Delay before a restart so the log drains (ms)
    pub restart_delay_ms: u32,
    /// Delay after mounting the flash file system (ms)
    pub mount_delay_ms: u32,
}

impl CaptureConfig {
    /// Values used by deployed devices
    pub const DEFAULT: Self = Self {
        flash_photo_path: "/data/txtOvl_photo.jpg",
        sd_path_prefix: "/picture",
        sd_path_suffix: ".jpg",
        counter_offset: 8,
        store_size: 512,
        overlay_label: "ESP32 Cam Text Overlay example - ",
        overlay_color: 0x0000_0000,
        glyph_width: 14,
        bottom_margin: 20,
        jpeg_quality: 90,
        flash_write_attempts: 20,
        camera_init_attempts: 20,
        settle_delay_ms: 100,
        restart_delay_ms: 500,
        mount_delay_ms: 500,
    };

    /// Check the configuration for values the pipeline cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jpeg_quality == 0 || self.jpeg_quality > 100 {
            return Err(ConfigError::JpegQuality);
        }

        if self.flash_write_attempts == 0 || self.camera_init_attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }

        for path in [self.flash_photo_path, self.sd_path_prefix] {
            if !path.starts_with('/') || path.len() > MAX_PATH_LEN {
                return Err(ConfigError::InvalidPath);
            }
        }

        // Prefix + 11 chars of i32 + suffix must fit the path buffer
        if self.sd_path_prefix.len() + 11 + self.sd_path_suffix.len() > MAX_PATH_LEN {
            return Err(ConfigError::InvalidPath);
        }

        let counter_end = self.counter_offset.checked_add(COUNTER_SIZE);
        if counter_end.map_or(true, |end| end > self.store_size) {
            return Err(ConfigError::CounterOutOfStore);
        }

        if self.overlay_label.len() > MAX_LABEL_LEN {
            return Err(ConfigError::LabelTooLong);
        }

        Ok(())
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Sensor resolution and quality chosen from the available memory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CameraProfile {
    pub frame_size: FrameSize,
    /// Sensor JPEG quality (lower is better)
    pub jpeg_quality: u8,
    pub fb_count: u8,
}

impl CameraProfile {
    /// Sensor clock. 20 MHz produces corrupted frames on the OV2640
    /// modules shipped with the AI Thinker board.
    pub const XCLK_FREQ_HZ: u32 = 10_000_000;

    /// Pick the capture profile for the detected memory
    ///
    /// PSRAM boards capture VGA at sensor quality 10, boards without it
    /// capture SVGA at quality 12.
    pub fn select(psram_found: bool) -> Self {
        if psram_found {
            Self {
                frame_size: FrameSize::Vga,
                jpeg_quality: 10,
                fb_count: 1,
            }
        } else {
            Self {
                frame_size: FrameSize::Svga,
                jpeg_quality: 12,
                fb_count: 1,
            }
        }
    }

    /// Build the driver configuration for the given wiring
    pub fn camera_config(&self, pins: CameraPins) -> CameraConfig {
        CameraConfig {
            pins,
            xclk_freq_hz: Self::XCLK_FREQ_HZ,
            pixel_format: PixelFormat::Jpeg,
            frame_size: self.frame_size,
            jpeg_quality: self.jpeg_quality,
            fb_count: self.fb_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert_eq!(CaptureConfig::DEFAULT.validate(), Ok(()));
    }

    #[test]
    fn test_default_protocol_values() {
        let config = CaptureConfig::default();
        assert_eq!(config.flash_photo_path, "/data/txtOvl_photo.jpg");
        assert_eq!(config.sd_path_prefix, "/picture");
        assert_eq!(config.counter_offset, 8);
        assert!(config.store_size >= 512);
        assert_eq!(config.jpeg_quality, 90);
    }

    #[test]
    fn test_rejects_bad_quality() {
        let config = CaptureConfig {
            jpeg_quality: 101,
            ..CaptureConfig::DEFAULT
        };
        assert_eq!(config.validate(), Err(ConfigError::JpegQuality));
    }

    #[test]
    fn test_rejects_zero_attempts() {
        let config = CaptureConfig {
            flash_write_attempts: 0,
            ..CaptureConfig::DEFAULT
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroAttempts));
    }

    #[test]
    fn test_rejects_relative_path() {
        let config = CaptureConfig {
            sd_path_prefix: "picture",
            ..CaptureConfig::DEFAULT
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidPath));
    }

    #[test]
    fn test_rejects_counter_past_store() {
        let config = CaptureConfig {
            counter_offset: 510,
            ..CaptureConfig::DEFAULT
        };
        assert_eq!(config.validate(), Err(ConfigError::CounterOutOfStore));
    }

    #[test]
    fn test_rejects_counter_offset_overflow() {
        let config = CaptureConfig {
            counter_offset: usize::MAX - 1,
            ..CaptureConfig::DEFAULT
        };
        assert_eq!(config.validate(), Err(ConfigError::CounterOutOfStore));
    }

    #[test]
    fn test_profile_with_psram() {
        let profile = CameraProfile::select(true);
        assert_eq!(profile.frame_size, FrameSize::Vga);
        assert_eq!(profile.jpeg_quality, 10);
        assert_eq!(profile.fb_count, 1);
    }

    #[test]
    fn test_profile_without_psram() {
        let profile = CameraProfile::select(false);
        assert_eq!(profile.frame_size, FrameSize::Svga);
        assert_eq!(profile.jpeg_quality, 12);
    }
}
