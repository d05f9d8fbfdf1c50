//! EEPROM emulation over blob storage
//!
//! The whole region lives in a RAM shadow buffer. `begin` loads the image
//! stored under [`StorageKey::Eeprom`], reads and writes touch only the
//! buffer, and `commit` writes the buffer back as one blob when something
//! changed. A missing image reads as erased flash (`0xFF`). An image larger
//! than the requested region is truncated to it, and the shorter image
//! replaces the stored one on the next commit.

use alloc::vec;
use alloc::vec::Vec;

use stampcam_hal::nvstore::{NvError, NvStore};
use stampcam_hal::storage::{BlobStorage, StorageError, StorageKey};

/// Largest region the emulation accepts (one NVS blob page)
pub const MAX_EEPROM_SIZE: usize = 4000;

/// Value of an erased byte
const ERASED: u8 = 0xFF;

/// EEPROM emulation backed by a [`BlobStorage`]
pub struct ShadowEeprom<B> {
    backend: B,
    key: StorageKey,
    shadow: Vec<u8>,
    dirty: bool,
}

impl<B: BlobStorage> ShadowEeprom<B> {
    /// Create an unopened store on top of `backend`
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            key: StorageKey::Eeprom,
            shadow: Vec::new(),
            dirty: false,
        }
    }

    /// Writes staged since the last commit
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Get access to the underlying storage
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Release the underlying storage
    pub fn into_backend(self) -> B {
        self.backend
    }

    fn range(&self, offset: usize, len: usize) -> Result<core::ops::Range<usize>, NvError> {
        if self.shadow.is_empty() {
            return Err(NvError::NotInitialized);
        }
        let end = offset.checked_add(len).ok_or(NvError::OutOfBounds)?;
        if end > self.shadow.len() {
            return Err(NvError::OutOfBounds);
        }
        Ok(offset..end)
    }
}

impl<B: BlobStorage> NvStore for ShadowEeprom<B> {
    fn begin(&mut self, size: usize) -> Result<(), NvError> {
        if size == 0 || size > MAX_EEPROM_SIZE {
            return Err(NvError::InvalidSize);
        }

        let stored = match self.backend.blob_len(self.key) {
            Ok(len) => len,
            Err(StorageError::NotFound) => 0,
            Err(_) => return Err(NvError::Backend),
        };

        // A shorter image keeps the erased tail
        let mut image = vec![ERASED; size.max(stored)];
        if stored > 0 {
            self.backend
                .read(self.key, &mut image[..stored])
                .map_err(|_| NvError::Backend)?;
        }
        image.truncate(size);

        self.shadow = image;
        self.dirty = stored > size;
        Ok(())
    }

    fn len(&self) -> usize {
        self.shadow.len()
    }

    fn read(&mut self, offset: usize, buf: &mut [u8]) -> Result<(), NvError> {
        let range = self.range(offset, buf.len())?;
        buf.copy_from_slice(&self.shadow[range]);
        Ok(())
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), NvError> {
        let range = self.range(offset, data.len())?;
        let dst = &mut self.shadow[range];
        if dst != data {
            dst.copy_from_slice(data);
            self.dirty = true;
        }
        Ok(())
    }

    fn commit(&mut self) -> Result<(), NvError> {
        if self.shadow.is_empty() {
            return Err(NvError::NotInitialized);
        }
        if !self.dirty {
            return Ok(());
        }
        self.backend
            .write(self.key, &self.shadow)
            .map_err(|_| NvError::Backend)?;
        self.dirty = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::collections::BTreeMap;
    use proptest::prelude::*;

    /// In-memory blob storage
    #[derive(Default)]
    struct MemoryBlobs {
        blobs: BTreeMap<&'static str, Vec<u8>>,
        writes: usize,
        fail_writes: bool,
        fail_reads: bool,
    }

    impl BlobStorage for MemoryBlobs {
        fn read(&mut self, key: StorageKey, buffer: &mut [u8]) -> Result<usize, StorageError> {
            if self.fail_reads {
                return Err(StorageError::Storage);
            }
            let blob = self.blobs.get(key.name()).ok_or(StorageError::NotFound)?;
            if blob.len() > buffer.len() {
                return Err(StorageError::BufferTooSmall);
            }
            buffer[..blob.len()].copy_from_slice(blob);
            Ok(blob.len())
        }

        fn write(&mut self, key: StorageKey, data: &[u8]) -> Result<(), StorageError> {
            if self.fail_writes {
                return Err(StorageError::Storage);
            }
            self.writes += 1;
            self.blobs.insert(key.name(), data.to_vec());
            Ok(())
        }

        fn blob_len(&mut self, key: StorageKey) -> Result<usize, StorageError> {
            if self.fail_reads {
                return Err(StorageError::Storage);
            }
            self.blobs
                .get(key.name())
                .map(Vec::len)
                .ok_or(StorageError::NotFound)
        }
    }

    fn stored_image(blobs: &MemoryBlobs) -> &[u8] {
        &blobs.blobs[StorageKey::Eeprom.name()]
    }

    #[test]
    fn test_unopened_store_rejects_access() {
        let mut eeprom = ShadowEeprom::new(MemoryBlobs::default());
        assert!(eeprom.is_empty());
        assert_eq!(eeprom.get_i32(8), Err(NvError::NotInitialized));
        assert_eq!(eeprom.put_i32(8, 1), Err(NvError::NotInitialized));
        assert_eq!(eeprom.commit(), Err(NvError::NotInitialized));
    }

    #[test]
    fn test_fresh_image_reads_erased() {
        let mut eeprom = ShadowEeprom::new(MemoryBlobs::default());
        eeprom.begin(512).unwrap();
        assert_eq!(eeprom.len(), 512);
        assert_eq!(eeprom.get_i32(8), Ok(-1));
    }

    #[test]
    fn test_invalid_sizes() {
        let mut eeprom = ShadowEeprom::new(MemoryBlobs::default());
        assert_eq!(eeprom.begin(0), Err(NvError::InvalidSize));
        assert_eq!(eeprom.begin(MAX_EEPROM_SIZE + 1), Err(NvError::InvalidSize));
    }

    #[test]
    fn test_commit_persists_little_endian_counter() {
        let mut eeprom = ShadowEeprom::new(MemoryBlobs::default());
        eeprom.begin(512).unwrap();
        eeprom.put_i32(8, 0x0102_0304).unwrap();
        assert!(eeprom.is_dirty());
        eeprom.commit().unwrap();
        assert!(!eeprom.is_dirty());

        let blobs = eeprom.into_backend();
        let image = stored_image(&blobs);
        assert_eq!(image.len(), 512);
        assert_eq!(&image[8..12], &[0x04, 0x03, 0x02, 0x01]);
    }

    #[test]
    fn test_image_survives_reopen() {
        let mut eeprom = ShadowEeprom::new(MemoryBlobs::default());
        eeprom.begin(512).unwrap();
        eeprom.put_i32(8, 41).unwrap();
        eeprom.commit().unwrap();

        let mut reopened = ShadowEeprom::new(eeprom.into_backend());
        reopened.begin(512).unwrap();
        assert_eq!(reopened.get_i32(8), Ok(41));
    }

    #[test]
    fn test_uncommitted_writes_are_lost() {
        let mut eeprom = ShadowEeprom::new(MemoryBlobs::default());
        eeprom.begin(512).unwrap();
        eeprom.put_i32(8, 5).unwrap();

        let mut reopened = ShadowEeprom::new(eeprom.into_backend());
        reopened.begin(512).unwrap();
        assert_eq!(reopened.get_i32(8), Ok(-1));
    }

    #[test]
    fn test_clean_commit_skips_backend() {
        let mut eeprom = ShadowEeprom::new(MemoryBlobs::default());
        eeprom.begin(512).unwrap();
        eeprom.put_i32(8, -1).unwrap();
        eeprom.commit().unwrap();
        assert_eq!(eeprom.backend().writes, 0);
    }

    #[test]
    fn test_shorter_image_keeps_erased_tail() {
        let mut blobs = MemoryBlobs::default();
        blobs.blobs.insert(StorageKey::Eeprom.name(), vec![0; 10]);

        let mut eeprom = ShadowEeprom::new(blobs);
        eeprom.begin(16).unwrap();
        let mut tail = [0u8; 6];
        eeprom.read(10, &mut tail).unwrap();
        assert_eq!(tail, [0xFF; 6]);
        assert_eq!(eeprom.get_i32(4), Ok(0));
    }

    #[test]
    fn test_larger_image_is_truncated() {
        let mut image = vec![0xAA; 1024];
        image[8..12].copy_from_slice(&27i32.to_le_bytes());
        let mut blobs = MemoryBlobs::default();
        blobs.blobs.insert(StorageKey::Eeprom.name(), image);

        let mut eeprom = ShadowEeprom::new(blobs);
        eeprom.begin(512).unwrap();
        assert_eq!(eeprom.len(), 512);
        assert_eq!(eeprom.get_i32(8), Ok(27));
        assert!(eeprom.is_dirty());

        eeprom.put_i32(8, 28).unwrap();
        eeprom.commit().unwrap();
        let blobs = eeprom.into_backend();
        assert_eq!(stored_image(&blobs).len(), 512);
        assert_eq!(&stored_image(&blobs)[8..12], &28i32.to_le_bytes());
    }

    #[test]
    fn test_backend_failures() {
        let mut eeprom = ShadowEeprom::new(MemoryBlobs {
            fail_reads: true,
            ..Default::default()
        });
        assert_eq!(eeprom.begin(512), Err(NvError::Backend));

        let mut eeprom = ShadowEeprom::new(MemoryBlobs {
            fail_writes: true,
            ..Default::default()
        });
        eeprom.begin(512).unwrap();
        eeprom.put_i32(8, 1).unwrap();
        assert_eq!(eeprom.commit(), Err(NvError::Backend));
        assert!(eeprom.is_dirty());
    }

    #[test]
    fn test_out_of_bounds() {
        let mut eeprom = ShadowEeprom::new(MemoryBlobs::default());
        eeprom.begin(16).unwrap();
        assert_eq!(eeprom.put_i32(13, 1), Err(NvError::OutOfBounds));
        assert_eq!(eeprom.get_i32(usize::MAX), Err(NvError::OutOfBounds));
        assert_eq!(eeprom.put_i32(12, 1), Ok(()));
    }

    proptest! {
        #[test]
        fn prop_committed_value_reads_back(offset in 0usize..=508, value in any::<i32>()) {
            let mut eeprom = ShadowEeprom::new(MemoryBlobs::default());
            eeprom.begin(512).unwrap();
            eeprom.put_i32(offset, value).unwrap();
            eeprom.commit().unwrap();

            let mut reopened = ShadowEeprom::new(eeprom.into_backend());
            reopened.begin(512).unwrap();
            prop_assert_eq!(reopened.get_i32(offset), Ok(value));
        }
    }
}
