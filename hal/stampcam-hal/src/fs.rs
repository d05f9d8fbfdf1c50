//! File system abstractions
//!
//! Two storage targets are used by the firmware: a file system living in
//! the SoC's flash (SPIFFS) and a removable SD card. Both expose the same
//! minimal write-only file interface.

/// Errors from file system operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FsError {
    /// Mounting the file system failed
    Mount,
    /// File system is not mounted
    NotMounted,
    /// File could not be opened or created
    Open,
    /// Write failed
    Write,
    /// File metadata could not be read
    Metadata,
    /// Path is not valid for this file system
    InvalidPath,
}

/// SD card type as reported by the card's identification registers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CardType {
    /// No card attached
    None,
    /// MMC card
    Mmc,
    /// Standard capacity SD card
    Sd,
    /// High capacity SD card
    Sdhc,
    /// Card answered but was not recognised
    Unknown,
}

/// SD/MMC bus width
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SdBusWidth {
    /// Single data line, frees GPIO 4 and 12/13 on the ESP32-CAM
    OneBit,
    /// Four data lines
    FourBit,
}

/// A file opened for writing
pub trait WritableFile {
    /// Append bytes to the file
    ///
    /// Returns the number of bytes accepted by the file system.
    fn write(&mut self, data: &[u8]) -> Result<usize, FsError>;

    /// Current size of the file in bytes
    fn size(&mut self) -> Result<u64, FsError>;

    /// Flush and close the file
    fn close(self) -> Result<(), FsError>;
}

/// File system that can create files
pub trait FileSystem {
    /// File handle type
    type File: WritableFile;

    /// Create a file for writing, truncating any existing content
    fn create(&mut self, path: &str) -> Result<Self::File, FsError>;
}

/// File system stored in the SoC's own flash
pub trait FlashFileSystem: FileSystem {
    /// Mount the file system
    ///
    /// With `format_on_fail` set, an unreadable partition is formatted and
    /// mounted empty.
    fn mount(&mut self, format_on_fail: bool) -> Result<(), FsError>;
}

/// File system on a removable SD card
pub trait SdCard: FileSystem {
    /// Mount the card with the given bus width
    fn mount(&mut self, bus_width: SdBusWidth) -> Result<(), FsError>;

    /// Type of the attached card
    fn card_type(&mut self) -> CardType;
}
