//! Blob storage abstractions
//!
//! Provides a trait for persistent key-value blobs that platform crates
//! implement on top of their non-volatile storage (NVS partition, raw
//! flash sectors, ...).

/// Storage keys for persisted blobs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StorageKey {
    /// EEPROM emulation image (Arduino-compatible layout)
    Eeprom,
}

impl StorageKey {
    /// Name of the key on platforms with string-keyed storage
    ///
    /// `Eeprom` matches the name the Arduino core uses, so images written
    /// by older firmware are picked up unchanged.
    pub fn name(self) -> &'static str {
        match self {
            StorageKey::Eeprom => "eeprom",
        }
    }
}

/// Errors from blob storage operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StorageError {
    /// Underlying storage operation failed
    Storage,
    /// Key not found
    NotFound,
    /// Buffer too small for the data
    BufferTooSmall,
    /// Storage is full
    Full,
}

/// Blob storage trait
///
/// Implementations must make [`BlobStorage::write`] durable before it
/// returns: a successful write survives a power cycle.
pub trait BlobStorage {
    /// Read a value by key into the provided buffer
    ///
    /// # Returns
    /// The number of bytes read, or an error.
    fn read(&mut self, key: StorageKey, buffer: &mut [u8]) -> Result<usize, StorageError>;

    /// Write a value by key, replacing any previous value
    fn write(&mut self, key: StorageKey, data: &[u8]) -> Result<(), StorageError>;

    /// Size in bytes of the value stored under `key`
    ///
    /// Fails with [`StorageError::NotFound`] when nothing is stored.
    fn blob_len(&mut self, key: StorageKey) -> Result<usize, StorageError>;
}
