//! Stampcam Hardware Abstraction Layer
//!
//! This crate defines the peripheral traits the capture pipeline consumes.
//! The board crate binds them to the real drivers (ESP-IDF camera
//! component, SPIFFS, SD/MMC, NVS) and the core crate is tested against
//! mock implementations of the same traits.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  stampcam-core (pipeline, boot)         │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  stampcam-hal (this crate - traits)     │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │  stampcam-    │       │  stampcam-    │
//! │   drivers     │       │   firmware    │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`camera::Camera`], [`camera::FrameBuffer`] - Sensor capture and codecs
//! - [`fs::FileSystem`], [`fs::FlashFileSystem`], [`fs::SdCard`] - File storage
//! - [`storage::BlobStorage`] - Persistent key-value blobs
//! - [`nvstore::NvStore`] - Byte-addressed persistent store (EEPROM style)
//! - [`system::SystemControl`] - Restart and memory diagnostics

#![no_std]
#![deny(unsafe_code)]

extern crate alloc;

pub mod camera;
pub mod fs;
pub mod nvstore;
pub mod storage;
pub mod system;

// Re-export key traits at crate root for convenience
pub use camera::{Camera, FrameBuffer};
pub use fs::{FileSystem, FlashFileSystem, SdCard, WritableFile};
pub use nvstore::NvStore;
pub use storage::{BlobStorage, StorageKey};
pub use system::SystemControl;
