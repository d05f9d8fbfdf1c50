//! File names and caption text derived from the picture number

use core::fmt::{self, Write};

use heapless::String;

use crate::config::{CaptureConfig, MAX_LABEL_LEN, MAX_PATH_LEN};

/// Path buffer for storage paths
pub type PathString = String<MAX_PATH_LEN>;

/// Caption buffer (label plus up to 11 characters of counter)
pub type CaptionString = String<{ MAX_LABEL_LEN + 11 }>;

/// Identifier of the stored picture, prepared for an uplink message
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FileId {
    /// Nothing was written to the SD card
    #[default]
    Empty,
    /// Picture saved on the SD card at this path
    Saved(PathString),
    /// SD card file could not be created
    SaveFailed,
}

impl FileId {
    /// Text form used in logs and messages
    pub fn as_str(&self) -> &str {
        match self {
            FileId::Empty => "empty",
            FileId::Saved(path) => path.as_str(),
            FileId::SaveFailed => "fail to save pic",
        }
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for FileId {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{=str}", self.as_str())
    }
}

/// SD card path for picture `number`, e.g. `/picture12.jpg`
pub fn sd_path(config: &CaptureConfig, number: i32) -> Result<PathString, fmt::Error> {
    let mut path = PathString::new();
    write!(
        path,
        "{}{}{}",
        config.sd_path_prefix, number, config.sd_path_suffix
    )?;
    Ok(path)
}

/// Caption stamped on picture `number`
pub fn overlay_text(config: &CaptureConfig, number: i32) -> Result<CaptionString, fmt::Error> {
    let mut text = CaptionString::new();
    write!(text, "{}{}", config.overlay_label, number)?;
    Ok(text)
}
