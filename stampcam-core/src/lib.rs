//! Board-agnostic core logic for the stampcam firmware
//!
//! This crate contains all application logic that does not depend on
//! specific hardware implementations:
//!
//! - Capture configuration and camera profile selection
//! - Persistent picture counter
//! - File naming and caption text
//! - Text overlay on decoded frames
//! - Capture, overlay and persist pipeline
//! - Boot sequence and restart escalation

#![no_std]
#![deny(unsafe_code)]
#![deny(unused_imports)]

extern crate alloc;

#[cfg(test)]
extern crate std;

// Must come first so the logging macros are visible to the modules below
mod fmt;

pub mod boot;
pub mod config;
pub mod counter;
pub mod naming;
pub mod overlay;
pub mod pipeline;
pub mod retry;

#[cfg(test)]
mod testing;

pub use boot::{Boot, BootReport, InitStatus};
pub use config::{CameraProfile, CaptureConfig};
pub use naming::FileId;
pub use pipeline::{capture_and_store, CaptureReport, FatalError, Peripherals};
