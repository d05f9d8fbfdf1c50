//! Byte-addressed non-volatile store
//!
//! Mirrors the EEPROM contract of the Arduino core: a fixed-size region is
//! opened once, values are read and written at byte offsets against a RAM
//! copy, and `commit` makes pending writes durable.

/// Errors from the non-volatile store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NvError {
    /// Store has not been opened with [`NvStore::begin`]
    NotInitialized,
    /// Requested size is zero or larger than the backend supports
    InvalidSize,
    /// Access extends past the end of the region
    OutOfBounds,
    /// Backend failed to load or persist the region
    Backend,
}

/// Non-volatile byte store
pub trait NvStore {
    /// Open the store with a region of `size` bytes
    fn begin(&mut self, size: usize) -> Result<(), NvError>;

    /// Size of the opened region, 0 before [`NvStore::begin`]
    fn len(&self) -> usize;

    /// Check whether the store is open
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy bytes starting at `offset` into `buf`
    fn read(&mut self, offset: usize, buf: &mut [u8]) -> Result<(), NvError>;

    /// Stage bytes at `offset`; durable after [`NvStore::commit`]
    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), NvError>;

    /// Persist staged writes
    fn commit(&mut self) -> Result<(), NvError>;

    /// Read a little-endian `i32` at `offset`
    fn get_i32(&mut self, offset: usize) -> Result<i32, NvError> {
        let mut raw = [0u8; 4];
        self.read(offset, &mut raw)?;
        Ok(i32::from_le_bytes(raw))
    }

    /// Stage a little-endian `i32` at `offset`
    fn put_i32(&mut self, offset: usize, value: i32) -> Result<(), NvError> {
        self.write(offset, &value.to_le_bytes())
    }
}
