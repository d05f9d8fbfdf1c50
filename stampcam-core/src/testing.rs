//! Mock peripherals for host tests

use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec;
use alloc::vec::Vec;
use core::cell::RefCell;

use embedded_hal::delay::DelayNs;
use stampcam_hal::camera::{Camera, CameraConfig, CameraError, FrameBuffer, PixelFormat};
use stampcam_hal::fs::{
    CardType, FileSystem, FlashFileSystem, FsError, SdBusWidth, SdCard, WritableFile,
};
use stampcam_hal::nvstore::{NvError, NvStore};
use stampcam_hal::system::{SystemControl, SystemInfo};

use crate::pipeline::Peripherals;

pub struct MockFrame {
    width: u16,
    height: u16,
    data: Vec<u8>,
}

impl FrameBuffer for MockFrame {
    fn width(&self) -> u16 {
        self.width
    }

    fn height(&self) -> u16 {
        self.height
    }

    fn format(&self) -> PixelFormat {
        PixelFormat::Jpeg
    }

    fn data(&self) -> &[u8] {
        &self.data
    }
}

#[derive(Default)]
pub struct MockCamera {
    /// Init calls that fail before one succeeds
    pub init_failures: u8,
    pub init_calls: u8,
    pub last_config: Option<CameraConfig>,
    /// Frame dimensions handed out by `acquire`, `None` simulates a capture failure
    pub frame: Option<(u16, u16)>,
    pub acquired: usize,
    pub released: usize,
    pub fail_conversion: bool,
    pub fail_encode: bool,
    pub encode_quality: Option<u8>,
    /// Matrix bytes seen by the encoder
    pub encoded_input: Vec<u8>,
}

impl MockCamera {
    pub fn with_frame(width: u16, height: u16) -> Self {
        Self {
            frame: Some((width, height)),
            ..Default::default()
        }
    }
}

/// JPEG stand-in returned by the mock encoder
pub const MOCK_JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0xFF, 0xD9];

impl Camera for MockCamera {
    type Frame = MockFrame;

    fn init(&mut self, config: &CameraConfig) -> Result<(), CameraError> {
        self.init_calls += 1;
        self.last_config = Some(*config);
        if self.init_calls <= self.init_failures {
            Err(CameraError::Init(0x105))
        } else {
            Ok(())
        }
    }

    fn acquire(&mut self) -> Option<MockFrame> {
        let (width, height) = self.frame?;
        self.acquired += 1;
        Some(MockFrame {
            width,
            height,
            data: MOCK_JPEG.to_vec(),
        })
    }

    fn release(&mut self, _frame: MockFrame) {
        self.released += 1;
    }

    fn to_rgb888(&mut self, frame: &MockFrame, dest: &mut [u8]) -> Result<(), CameraError> {
        if self.fail_conversion {
            return Err(CameraError::Conversion);
        }
        if dest.len() != frame.rgb888_len() {
            return Err(CameraError::BufferSize);
        }
        // White frame so black ink is visible
        dest.fill(0xFF);
        Ok(())
    }

    fn encode_jpeg(
        &mut self,
        rgb: &[u8],
        _width: u16,
        _height: u16,
        quality: u8,
    ) -> Result<Vec<u8>, CameraError> {
        self.encode_quality = Some(quality);
        self.encoded_input = rgb.to_vec();
        if self.fail_encode {
            Err(CameraError::Encode)
        } else {
            Ok(MOCK_JPEG.to_vec())
        }
    }
}

#[derive(Default)]
pub struct FsState {
    pub mounted: bool,
    pub mount_fails: bool,
    pub open_fails: bool,
    /// Writes that are accepted but leave the file empty
    pub lost_writes: usize,
    pub write_calls: usize,
    pub card_type: Option<CardType>,
    pub files: BTreeMap<String, Vec<u8>>,
    pub closed: usize,
}

/// In-memory file system, used for both the flash and the SD side
#[derive(Clone, Default)]
pub struct MockFs {
    pub state: Rc<RefCell<FsState>>,
}

impl MockFs {
    pub fn mounted() -> Self {
        let fs = Self::default();
        fs.state.borrow_mut().mounted = true;
        fs.state.borrow_mut().card_type = Some(CardType::Sdhc);
        fs
    }

    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.state.borrow().files.get(path).cloned()
    }

    pub fn write_calls(&self) -> usize {
        self.state.borrow().write_calls
    }
}

pub struct MockFile {
    state: Rc<RefCell<FsState>>,
    path: String,
}

impl WritableFile for MockFile {
    fn write(&mut self, data: &[u8]) -> Result<usize, FsError> {
        let mut state = self.state.borrow_mut();
        state.write_calls += 1;
        if state.lost_writes > 0 {
            state.lost_writes -= 1;
            return Ok(0);
        }
        state
            .files
            .entry(self.path.clone())
            .or_default()
            .extend_from_slice(data);
        Ok(data.len())
    }

    fn size(&mut self) -> Result<u64, FsError> {
        let state = self.state.borrow();
        Ok(state.files.get(&self.path).map_or(0, |f| f.len() as u64))
    }

    fn close(self) -> Result<(), FsError> {
        self.state.borrow_mut().closed += 1;
        Ok(())
    }
}

impl FileSystem for MockFs {
    type File = MockFile;

    fn create(&mut self, path: &str) -> Result<MockFile, FsError> {
        let mut state = self.state.borrow_mut();
        if !state.mounted {
            return Err(FsError::NotMounted);
        }
        if state.open_fails {
            return Err(FsError::Open);
        }
        state.files.insert(path.to_string(), Vec::new());
        Ok(MockFile {
            state: self.state.clone(),
            path: path.to_string(),
        })
    }
}

impl FlashFileSystem for MockFs {
    fn mount(&mut self, _format_on_fail: bool) -> Result<(), FsError> {
        let mut state = self.state.borrow_mut();
        if state.mount_fails {
            return Err(FsError::Mount);
        }
        state.mounted = true;
        Ok(())
    }
}

impl SdCard for MockFs {
    fn mount(&mut self, _bus_width: SdBusWidth) -> Result<(), FsError> {
        let mut state = self.state.borrow_mut();
        if state.mount_fails {
            return Err(FsError::Mount);
        }
        state.mounted = true;
        Ok(())
    }

    fn card_type(&mut self) -> CardType {
        self.state.borrow().card_type.unwrap_or(CardType::None)
    }
}

/// EEPROM-style store with separate RAM and durable images
pub struct MockStore {
    ram: Vec<u8>,
    pub durable: Vec<u8>,
    opened: bool,
    pub commits: usize,
    /// Commits silently lose staged data
    pub drop_commits: bool,
    pub begin_fails: bool,
}

impl MockStore {
    pub fn unopened() -> Self {
        Self {
            ram: Vec::new(),
            durable: vec![0xFF; 512],
            opened: false,
            commits: 0,
            drop_commits: false,
            begin_fails: false,
        }
    }

    pub fn erased(size: usize) -> Self {
        Self {
            ram: vec![0xFF; size],
            durable: vec![0xFF; size],
            opened: true,
            ..Self::unopened()
        }
    }

    pub fn with_counter(size: usize, offset: usize, value: i32) -> Self {
        let mut store = Self::erased(size);
        store.ram[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
        store.durable.clone_from(&store.ram);
        store
    }
}

impl NvStore for MockStore {
    fn begin(&mut self, size: usize) -> Result<(), NvError> {
        if self.begin_fails {
            return Err(NvError::Backend);
        }
        self.durable.resize(size, 0xFF);
        self.ram.clone_from(&self.durable);
        self.opened = true;
        Ok(())
    }

    fn len(&self) -> usize {
        if self.opened {
            self.ram.len()
        } else {
            0
        }
    }

    fn read(&mut self, offset: usize, buf: &mut [u8]) -> Result<(), NvError> {
        if !self.opened {
            return Err(NvError::NotInitialized);
        }
        let src = self
            .ram
            .get(offset..offset + buf.len())
            .ok_or(NvError::OutOfBounds)?;
        buf.copy_from_slice(src);
        Ok(())
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), NvError> {
        if !self.opened {
            return Err(NvError::NotInitialized);
        }
        let dst = self
            .ram
            .get_mut(offset..offset + data.len())
            .ok_or(NvError::OutOfBounds)?;
        dst.copy_from_slice(data);
        Ok(())
    }

    fn commit(&mut self) -> Result<(), NvError> {
        if !self.opened {
            return Err(NvError::NotInitialized);
        }
        self.commits += 1;
        if self.drop_commits {
            self.ram.clone_from(&self.durable);
        } else {
            self.durable.clone_from(&self.ram);
        }
        Ok(())
    }
}

/// Delays and system calls in the order they happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Delay { ns: u32 },
    PsramInit,
    Restart,
}

pub type EventLog = Rc<RefCell<Vec<Event>>>;

pub struct MockSystem {
    pub psram: bool,
    pub psram_ready: bool,
    pub free_heap: u32,
    pub events: EventLog,
}

impl Default for MockSystem {
    fn default() -> Self {
        Self {
            psram: true,
            psram_ready: true,
            free_heap: 120_000,
            events: EventLog::default(),
        }
    }
}

impl SystemControl for MockSystem {
    fn restart(&mut self) -> ! {
        self.events.borrow_mut().push(Event::Restart);
        panic!("restart requested");
    }

    fn psram_init(&mut self) -> bool {
        self.events.borrow_mut().push(Event::PsramInit);
        self.psram_ready
    }

    fn free_heap(&self) -> u32 {
        self.free_heap
    }

    fn psram_found(&self) -> bool {
        self.psram
    }

    fn system_info(&self) -> SystemInfo {
        SystemInfo {
            free_heap: self.free_heap,
            ..Default::default()
        }
    }
}

/// Delay that records the requested time instead of sleeping
#[derive(Default)]
pub struct MockDelay {
    pub total_ns: u64,
    pub events: EventLog,
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += ns as u64;
        self.events.borrow_mut().push(Event::Delay { ns });
    }
}

pub type MockPeripherals = Peripherals<MockCamera, MockFs, MockFs, MockStore, MockSystem, MockDelay>;

/// Peripherals with a 640x480 camera, mounted file systems and a store
/// holding `counter` at offset 8
pub fn peripherals(counter: i32) -> MockPeripherals {
    let events = EventLog::default();
    Peripherals {
        camera: MockCamera::with_frame(640, 480),
        flash: MockFs::mounted(),
        sd: MockFs::mounted(),
        store: MockStore::with_counter(512, 8, counter),
        system: MockSystem {
            events: events.clone(),
            ..MockSystem::default()
        },
        delay: MockDelay {
            total_ns: 0,
            events,
        },
    }
}
