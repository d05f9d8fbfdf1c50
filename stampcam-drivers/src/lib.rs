//! Driver implementations
//!
//! This crate provides concrete implementations of the traits defined
//! in stampcam-hal that do not depend on a particular SoC:
//!
//! - EEPROM emulation over blob storage (shadow buffer, explicit commit)
//! - File systems reached through a mounted VFS path (`std` feature)

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]

extern crate alloc;

pub mod eeprom;
#[cfg(feature = "std")]
pub mod vfs;

pub use eeprom::ShadowEeprom;
#[cfg(feature = "std")]
pub use vfs::{VfsFile, VfsFileSystem};
