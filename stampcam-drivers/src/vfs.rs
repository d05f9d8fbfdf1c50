//! File systems reached through a mounted VFS path
//!
//! On ESP-IDF, SPIFFS and FAT-on-SD are registered with the VFS under a
//! mount point (`/spiffs`, `/sdcard`) and then used through the ordinary
//! POSIX file API. On a host the mount point is just a directory, which
//! is how the tests below exercise this module.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use stampcam_hal::fs::{FileSystem, FsError, WritableFile};

/// Paths are resolved below a mount point
#[derive(Debug, Clone)]
pub struct VfsFileSystem {
    mount_point: PathBuf,
}

impl VfsFileSystem {
    pub fn new(mount_point: impl Into<PathBuf>) -> Self {
        Self {
            mount_point: mount_point.into(),
        }
    }

    pub fn mount_point(&self) -> &Path {
        &self.mount_point
    }

    /// Map an absolute device path (`/picture1.jpg`) below the mount point
    pub fn resolve(&self, path: &str) -> Result<PathBuf, FsError> {
        let relative = path.strip_prefix('/').ok_or(FsError::InvalidPath)?;
        if relative.is_empty() || relative.split('/').any(|part| part.is_empty() || part == "..") {
            return Err(FsError::InvalidPath);
        }
        Ok(self.mount_point.join(relative))
    }
}

impl FileSystem for VfsFileSystem {
    type File = VfsFile;

    fn create(&mut self, path: &str) -> Result<VfsFile, FsError> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            if !parent.exists() {
                // SPIFFS has no directories and accepts '/' inside names
                let _ = fs::create_dir_all(parent);
            }
        }
        let file = File::create(&full).map_err(|_| FsError::Open)?;
        Ok(VfsFile { file })
    }
}

/// File opened for writing through the VFS
#[derive(Debug)]
pub struct VfsFile {
    file: File,
}

impl WritableFile for VfsFile {
    fn write(&mut self, data: &[u8]) -> Result<usize, FsError> {
        self.file.write_all(data).map_err(|_| FsError::Write)?;
        Ok(data.len())
    }

    fn size(&mut self) -> Result<u64, FsError> {
        self.file.flush().map_err(|_| FsError::Write)?;
        self.file
            .metadata()
            .map(|m| m.len())
            .map_err(|_| FsError::Metadata)
    }

    fn close(mut self) -> Result<(), FsError> {
        self.file.flush().map_err(|_| FsError::Write)
    }
}
