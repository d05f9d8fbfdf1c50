//! Camera sensor abstractions
//!
//! Covers the parts of the camera driver the capture pipeline needs:
//! initialization, frame acquisition and release, and the format
//! converters that ship with the driver (raw frame to RGB888, RGB888 to
//! JPEG).

use alloc::vec::Vec;

/// Errors reported by the camera driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CameraError {
    /// Driver initialization failed with the given driver error code
    Init(i32),
    /// Frame could not be converted to RGB888
    Conversion,
    /// JPEG encoder failed (typically out of memory)
    Encode,
    /// Destination buffer does not match the frame dimensions
    BufferSize,
}

/// Pixel format produced by the sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PixelFormat {
    /// Compressed JPEG straight from the sensor
    #[default]
    Jpeg,
    Rgb565,
    Yuv422,
    Grayscale,
    Rgb888,
}

/// Sensor frame sizes supported by the OV2640
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameSize {
    /// 320 x 240
    Qvga,
    /// 352 x 288
    Cif,
    /// 640 x 480
    Vga,
    /// 800 x 600
    Svga,
    /// 1024 x 768
    Xga,
    /// 1280 x 1024
    Sxga,
    /// 1600 x 1200
    Uxga,
}

impl FrameSize {
    /// Frame width in pixels
    pub const fn width(self) -> u16 {
        match self {
            FrameSize::Qvga => 320,
            FrameSize::Cif => 352,
            FrameSize::Vga => 640,
            FrameSize::Svga => 800,
            FrameSize::Xga => 1024,
            FrameSize::Sxga => 1280,
            FrameSize::Uxga => 1600,
        }
    }

    /// Frame height in pixels
    pub const fn height(self) -> u16 {
        match self {
            FrameSize::Qvga => 240,
            FrameSize::Cif => 288,
            FrameSize::Vga => 480,
            FrameSize::Svga => 600,
            FrameSize::Xga => 768,
            FrameSize::Sxga => 1024,
            FrameSize::Uxga => 1200,
        }
    }
}

/// GPIO assignment for a parallel camera interface
///
/// Pin numbers follow the driver convention: `-1` means not connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CameraPins {
    pub pwdn: i32,
    pub reset: i32,
    pub xclk: i32,
    pub sccb_sda: i32,
    pub sccb_scl: i32,
    /// Data lines D0..D7 (sensor Y2..Y9)
    pub data: [i32; 8],
    pub vsync: i32,
    pub href: i32,
    pub pclk: i32,
}

/// Camera driver configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CameraConfig {
    /// Board wiring
    pub pins: CameraPins,
    /// External clock fed to the sensor
    pub xclk_freq_hz: u32,
    /// Output format of captured frames
    pub pixel_format: PixelFormat,
    /// Capture resolution
    pub frame_size: FrameSize,
    /// Sensor JPEG quality (0-63, lower is better)
    pub jpeg_quality: u8,
    /// Number of frame buffers the driver allocates
    pub fb_count: u8,
}

/// A captured frame owned by the caller until it is released
pub trait FrameBuffer {
    /// Frame width in pixels
    fn width(&self) -> u16;

    /// Frame height in pixels
    fn height(&self) -> u16;

    /// Encoding of [`FrameBuffer::data`]
    fn format(&self) -> PixelFormat;

    /// Raw frame bytes
    fn data(&self) -> &[u8];

    /// Size of an RGB888 image with this frame's dimensions
    fn rgb888_len(&self) -> usize {
        self.width() as usize * self.height() as usize * 3
    }
}

/// Camera driver
///
/// Frames are handed out by value and must be given back through
/// [`Camera::release`]. Because release consumes the frame, a frame can
/// never be returned to the driver twice.
pub trait Camera {
    /// Frame handle type
    type Frame: FrameBuffer;

    /// Initialize the sensor and the capture peripheral
    fn init(&mut self, config: &CameraConfig) -> Result<(), CameraError>;

    /// Capture a frame
    ///
    /// Returns `None` when the driver has no frame to give (timeout or
    /// allocation failure).
    fn acquire(&mut self) -> Option<Self::Frame>;

    /// Return a frame buffer to the driver
    fn release(&mut self, frame: Self::Frame);

    /// Decode a frame into a 24-bit buffer
    ///
    /// `dest` must hold exactly `width * height * 3` bytes. Pixels are
    /// written in the driver's native BGR byte order.
    fn to_rgb888(&mut self, frame: &Self::Frame, dest: &mut [u8]) -> Result<(), CameraError>;

    /// Encode a 24-bit buffer as JPEG
    ///
    /// `quality` uses the encoder scale (1-100, higher is better).
    fn encode_jpeg(
        &mut self,
        rgb: &[u8],
        width: u16,
        height: u16,
        quality: u8,
    ) -> Result<Vec<u8>, CameraError>;
}
