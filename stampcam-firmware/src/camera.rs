//! OV2640 through the esp32-camera driver
//!
//! Frame buffers are owned by the driver. An [`EspFrame`] borrows one from
//! `esp_camera_fb_get` until it goes back through [`Camera::release`].

use core::ffi::c_void;
use core::ptr::{self, NonNull};
use core::slice;

use esp_idf_svc::sys::{self, camera, EspError};
use stampcam_hal::camera::{
    Camera, CameraConfig, CameraError, FrameBuffer, FrameSize, PixelFormat,
};

use crate::system;

/// Frame on loan from the camera driver
pub struct EspFrame {
    fb: NonNull<camera::camera_fb_t>,
}

impl EspFrame {
    fn raw(&self) -> &camera::camera_fb_t {
        // Valid until handed back with esp_camera_fb_return, which takes
        // the frame by value
        unsafe { self.fb.as_ref() }
    }
}

impl FrameBuffer for EspFrame {
    fn width(&self) -> u16 {
        self.raw().width as u16
    }

    fn height(&self) -> u16 {
        self.raw().height as u16
    }

    fn format(&self) -> PixelFormat {
        from_pixformat(self.raw().format)
    }

    fn data(&self) -> &[u8] {
        let fb = self.raw();
        if fb.buf.is_null() {
            return &[];
        }
        unsafe { slice::from_raw_parts(fb.buf, fb.len) }
    }
}

/// esp32-camera driver handle
#[derive(Default)]
pub struct EspCamera {
    initialized: bool,
}

impl EspCamera {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Camera for EspCamera {
    type Frame = EspFrame;

    fn init(&mut self, config: &CameraConfig) -> Result<(), CameraError> {
        let pins = &config.pins;
        let fb_location = if system::psram_size() > 0 {
            camera::camera_fb_location_t_CAMERA_FB_IN_PSRAM
        } else {
            camera::camera_fb_location_t_CAMERA_FB_IN_DRAM
        };

        let driver_config = camera::camera_config_t {
            pin_pwdn: pins.pwdn,
            pin_reset: pins.reset,
            pin_xclk: pins.xclk,
            __bindgen_anon_1: camera::camera_config_t__bindgen_ty_1 {
                pin_sccb_sda: pins.sccb_sda,
            },
            __bindgen_anon_2: camera::camera_config_t__bindgen_ty_2 {
                pin_sccb_scl: pins.sccb_scl,
            },
            pin_d0: pins.data[0],
            pin_d1: pins.data[1],
            pin_d2: pins.data[2],
            pin_d3: pins.data[3],
            pin_d4: pins.data[4],
            pin_d5: pins.data[5],
            pin_d6: pins.data[6],
            pin_d7: pins.data[7],
            pin_vsync: pins.vsync,
            pin_href: pins.href,
            pin_pclk: pins.pclk,
            xclk_freq_hz: config.xclk_freq_hz as i32,
            ledc_timer: sys::ledc_timer_t_LEDC_TIMER_0,
            ledc_channel: sys::ledc_channel_t_LEDC_CHANNEL_0,
            pixel_format: to_pixformat(config.pixel_format),
            frame_size: to_framesize(config.frame_size),
            jpeg_quality: config.jpeg_quality as i32,
            fb_count: config.fb_count as usize,
            fb_location,
            grab_mode: camera::camera_grab_mode_t_CAMERA_GRAB_WHEN_EMPTY,
            ..Default::default()
        };

        if self.initialized {
            // A second esp_camera_init on a live driver fails with
            // ESP_ERR_INVALID_STATE
            unsafe { camera::esp_camera_deinit() };
            self.initialized = false;
        }

        let err = unsafe { camera::esp_camera_init(&driver_config) };
        if let Some(e) = EspError::from(err) {
            return Err(CameraError::Init(e.code()));
        }
        self.initialized = true;
        Ok(())
    }

    fn acquire(&mut self) -> Option<EspFrame> {
        if !self.initialized {
            return None;
        }
        let fb = unsafe { camera::esp_camera_fb_get() };
        NonNull::new(fb).map(|fb| EspFrame { fb })
    }

    fn release(&mut self, frame: EspFrame) {
        unsafe { camera::esp_camera_fb_return(frame.fb.as_ptr()) };
    }

    fn to_rgb888(&mut self, frame: &EspFrame, dest: &mut [u8]) -> Result<(), CameraError> {
        if dest.len() != frame.rgb888_len() {
            return Err(CameraError::BufferSize);
        }
        let fb = frame.raw();
        let ok = unsafe { camera::fmt2rgb888(fb.buf, fb.len, fb.format, dest.as_mut_ptr()) };
        if ok {
            Ok(())
        } else {
            Err(CameraError::Conversion)
        }
    }

    fn encode_jpeg(
        &mut self,
        rgb: &[u8],
        width: u16,
        height: u16,
        quality: u8,
    ) -> Result<Vec<u8>, CameraError> {
        if rgb.len() != width as usize * height as usize * 3 {
            return Err(CameraError::BufferSize);
        }

        let mut out: *mut u8 = ptr::null_mut();
        let mut out_len: usize = 0;
        // The encoder only reads the source despite the mutable pointer
        let ok = unsafe {
            camera::fmt2jpg(
                rgb.as_ptr() as *mut u8,
                rgb.len(),
                width,
                height,
                camera::pixformat_t_PIXFORMAT_RGB888,
                quality,
                &mut out,
                &mut out_len,
            )
        };
        if !ok || out.is_null() {
            return Err(CameraError::Encode);
        }

        // The encoder mallocs its output; copy it and free the driver buffer
        let jpeg = unsafe { slice::from_raw_parts(out, out_len) }.to_vec();
        unsafe { sys::free(out as *mut c_void) };
        Ok(jpeg)
    }
}

fn to_pixformat(format: PixelFormat) -> camera::pixformat_t {
    match format {
        PixelFormat::Jpeg => camera::pixformat_t_PIXFORMAT_JPEG,
        PixelFormat::Rgb565 => camera::pixformat_t_PIXFORMAT_RGB565,
        PixelFormat::Yuv422 => camera::pixformat_t_PIXFORMAT_YUV422,
        PixelFormat::Grayscale => camera::pixformat_t_PIXFORMAT_GRAYSCALE,
        PixelFormat::Rgb888 => camera::pixformat_t_PIXFORMAT_RGB888,
    }
}

fn from_pixformat(format: camera::pixformat_t) -> PixelFormat {
    match format {
        camera::pixformat_t_PIXFORMAT_RGB565 => PixelFormat::Rgb565,
        camera::pixformat_t_PIXFORMAT_YUV422 => PixelFormat::Yuv422,
        camera::pixformat_t_PIXFORMAT_GRAYSCALE => PixelFormat::Grayscale,
        camera::pixformat_t_PIXFORMAT_RGB888 => PixelFormat::Rgb888,
        _ => PixelFormat::Jpeg,
    }
}

fn to_framesize(size: FrameSize) -> camera::framesize_t {
    match size {
        FrameSize::Qvga => camera::framesize_t_FRAMESIZE_QVGA,
        FrameSize::Cif => camera::framesize_t_FRAMESIZE_CIF,
        FrameSize::Vga => camera::framesize_t_FRAMESIZE_VGA,
        FrameSize::Svga => camera::framesize_t_FRAMESIZE_SVGA,
        FrameSize::Xga => camera::framesize_t_FRAMESIZE_XGA,
        FrameSize::Sxga => camera::framesize_t_FRAMESIZE_SXGA,
        FrameSize::Uxga => camera::framesize_t_FRAMESIZE_UXGA,
    }
}
