//! Persistent picture counter
//!
//! The counter is a little-endian `i32` at a fixed offset of the
//! non-volatile store. Every capture reads it, increments it, commits it
//! and reads it back; the value read back is the one used for naming.

use stampcam_hal::nvstore::{NvError, NvStore};

/// Result of advancing the counter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CounterUpdate {
    /// Value before the increment
    pub previous: i32,
    /// Value written back
    pub written: i32,
    /// Value read back after the commit
    pub confirmed: i32,
}

impl CounterUpdate {
    /// Check that the committed value reads back unchanged
    pub fn is_confirmed(&self) -> bool {
        self.written == self.confirmed
    }
}

/// Picture counter at a fixed store offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PictureCounter {
    offset: usize,
}

impl PictureCounter {
    /// Create a counter stored at `offset`
    pub const fn new(offset: usize) -> Self {
        Self { offset }
    }

    /// Read the current value without changing it
    pub fn current<S: NvStore>(&self, store: &mut S) -> Result<i32, NvError> {
        store.get_i32(self.offset)
    }

    /// Increment the counter and make the new value durable
    ///
    /// An erased store reads as `-1`, so the first picture on a fresh
    /// device is number 0. The counter wraps at `i32::MAX`.
    pub fn advance<S: NvStore>(&self, store: &mut S) -> Result<CounterUpdate, NvError> {
        let previous = store.get_i32(self.offset)?;
        debug!("Current picture number counter : {}", previous);

        let written = previous.wrapping_add(1);
        store.put_i32(self.offset, written)?;
        store.commit()?;

        let confirmed = store.get_i32(self.offset)?;
        debug!("New picture number counter : {}", confirmed);

        let update = CounterUpdate {
            previous,
            written,
            confirmed,
        };
        if !update.is_confirmed() {
            warn!(
                "Picture counter read back {} after writing {}",
                confirmed, written
            );
        }
        Ok(update)
    }
}
