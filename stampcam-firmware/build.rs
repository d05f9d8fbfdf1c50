//! Build script for stampcam-firmware
//!
//! - Exports the ESP-IDF build environment (linker args, cfgs)
//! - Validates device.toml at compile time
//! - Generates the `CAPTURE_CONFIG` constant the firmware boots with

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Longest overlay label the firmware's caption buffer takes
const MAX_LABEL_LEN: usize = 48;

/// Longest storage path the firmware's path buffer takes
const MAX_PATH_LEN: usize = 48;

/// Characters needed for the longest picture number (`-2147483648`)
const MAX_NUMBER_LEN: usize = 11;

/// Largest EEPROM image the NVS-backed store accepts
const MAX_STORE_SIZE: i64 = 4000;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DeviceConfig {
    storage: StorageSection,
    counter: CounterSection,
    overlay: OverlaySection,
    retry: RetrySection,
    timing: TimingSection,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StorageSection {
    flash_photo_path: String,
    sd_path_prefix: String,
    sd_path_suffix: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CounterSection {
    offset: i64,
    store_size: i64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct OverlaySection {
    label: String,
    color: i64,
    glyph_width: i64,
    bottom_margin: i64,
    jpeg_quality: i64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RetrySection {
    flash_write_attempts: i64,
    camera_init_attempts: i64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TimingSection {
    settle_delay_ms: i64,
    restart_delay_ms: i64,
    mount_delay_ms: i64,
}

fn main() {
    embuild::espidf::sysenv::output();

    let config = load_config();
    validate_config(&config);
    generate_config(&config);
}

/// Read and parse device.toml
fn load_config() -> DeviceConfig {
    // Re-run if device.toml changes
    println!("cargo:rerun-if-changed=device.toml");
    println!("cargo:rerun-if-changed=build.rs");

    let config_path = Path::new("device.toml");

    if !config_path.exists() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: device.toml not found!                                   ║\n\
            ║                                                                  ║\n\
            ║  The firmware requires a device.toml configuration file.         ║\n\
            ║  Please create one in the stampcam-firmware directory.           ║\n\
            ╚══════════════════════════════════════════════════════════════════╝\n"
        );
    }

    let config_content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => {
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Failed to read device.toml                               ║\n\
                ║                                                                  ║\n\
                ║  Error: {:<56} ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                e
            );
        }
    };

    match toml::from_str(&config_content) {
        Ok(config) => config,
        Err(e) => {
            let error_msg = e.to_string();
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Invalid device.toml                                      ║\n\
                ╠══════════════════════════════════════════════════════════════════╣\n\
                ║                                                                  ║\n\
                {}\n\
                ║                                                                  ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                format_error_lines(&error_msg)
            );
        }
    }
}

/// Format error message lines with box drawing
fn format_error_lines(msg: &str) -> String {
    msg.lines()
        .map(|line| {
            let truncated = if line.chars().count() > 64 {
                format!("{}...", line.chars().take(61).collect::<String>())
            } else {
                line.to_string()
            };
            format!("║  {:<64} ║", truncated)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Check value ranges and cross-field constraints
fn validate_config(config: &DeviceConfig) {
    let mut errors = Vec::new();

    // Paths
    let storage = &config.storage;
    for (key, path) in [
        ("flash_photo_path", &storage.flash_photo_path),
        ("sd_path_prefix", &storage.sd_path_prefix),
    ] {
        if !path.starts_with('/') {
            errors.push(format!("[storage] {} must start with '/'", key));
        }
        if path.len() > MAX_PATH_LEN {
            errors.push(format!("[storage] {} longer than {} bytes", key, MAX_PATH_LEN));
        }
    }
    if storage.sd_path_prefix.len() + MAX_NUMBER_LEN + storage.sd_path_suffix.len() > MAX_PATH_LEN {
        errors.push(format!(
            "[storage] SD file names may exceed {} bytes",
            MAX_PATH_LEN
        ));
    }

    // Counter
    let counter = &config.counter;
    if counter.store_size < 4 || counter.store_size > MAX_STORE_SIZE {
        errors.push(format!("[counter] store_size must be 4-{}", MAX_STORE_SIZE));
    }
    if counter.offset < 0 || counter.offset + 4 > counter.store_size {
        errors.push("[counter] offset must leave 4 bytes inside store_size".to_string());
    }

    // Overlay
    let overlay = &config.overlay;
    if overlay.label.len() > MAX_LABEL_LEN {
        errors.push(format!("[overlay] label longer than {} bytes", MAX_LABEL_LEN));
    }
    if !overlay.label.is_ascii() {
        errors.push("[overlay] label must be ASCII (font has no other glyphs)".to_string());
    }
    if overlay.color < 0 || overlay.color > 0xFF_FFFF {
        errors.push("[overlay] color must be 0x000000-0xFFFFFF".to_string());
    }
    if overlay.glyph_width < 1 || overlay.glyph_width > 64 {
        errors.push("[overlay] glyph_width must be 1-64".to_string());
    }
    if overlay.bottom_margin < 0 || overlay.bottom_margin > 1200 {
        errors.push("[overlay] bottom_margin must be 0-1200".to_string());
    }
    if overlay.jpeg_quality < 1 || overlay.jpeg_quality > 100 {
        errors.push("[overlay] jpeg_quality must be 1-100".to_string());
    }

    // Retry budgets
    for (key, attempts) in [
        ("flash_write_attempts", config.retry.flash_write_attempts),
        ("camera_init_attempts", config.retry.camera_init_attempts),
    ] {
        if !(1..=255).contains(&attempts) {
            errors.push(format!("[retry] {} must be 1-255", key));
        }
    }

    // Timing
    let timing = &config.timing;
    for (key, ms) in [
        ("settle_delay_ms", timing.settle_delay_ms),
        ("restart_delay_ms", timing.restart_delay_ms),
        ("mount_delay_ms", timing.mount_delay_ms),
    ] {
        if !(0..=60_000).contains(&ms) {
            errors.push(format!("[timing] {} must be 0-60000", key));
        }
    }

    if !errors.is_empty() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: Invalid device.toml configuration                        ║\n\
            ╠══════════════════════════════════════════════════════════════════╣\n\
            {}\n\
            ╚══════════════════════════════════════════════════════════════════╝\n",
            errors
                .iter()
                .map(|e| format!("║  • {:<62} ║", e))
                .collect::<Vec<_>>()
                .join("\n")
        );
    }

    println!("cargo:warning=device.toml validated successfully");
}

/// Write `capture_config.rs` into OUT_DIR
fn generate_config(config: &DeviceConfig) {
    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR is set by cargo"));

    // `{:?}` on a String yields a valid, escaped Rust string literal
    let source = format!(
        "/// Capture configuration generated from device.toml\n\
         pub const CAPTURE_CONFIG: CaptureConfig = CaptureConfig {{\n\
         \x20   flash_photo_path: {:?},\n\
         \x20   sd_path_prefix: {:?},\n\
         \x20   sd_path_suffix: {:?},\n\
         \x20   counter_offset: {},\n\
         \x20   store_size: {},\n\
         \x20   overlay_label: {:?},\n\
         \x20   overlay_color: {:#08x},\n\
         \x20   glyph_width: {},\n\
         \x20   bottom_margin: {},\n\
         \x20   jpeg_quality: {},\n\
         \x20   flash_write_attempts: {},\n\
         \x20   camera_init_attempts: {},\n\
         \x20   settle_delay_ms: {},\n\
         \x20   restart_delay_ms: {},\n\
         \x20   mount_delay_ms: {},\n\
         }};\n",
        config.storage.flash_photo_path,
        config.storage.sd_path_prefix,
        config.storage.sd_path_suffix,
        config.counter.offset,
        config.counter.store_size,
        config.overlay.label,
        config.overlay.color,
        config.overlay.glyph_width,
        config.overlay.bottom_margin,
        config.overlay.jpeg_quality,
        config.retry.flash_write_attempts,
        config.retry.camera_init_attempts,
        config.timing.settle_delay_ms,
        config.timing.restart_delay_ms,
        config.timing.mount_delay_ms,
    );

    let dest = out_dir.join("capture_config.rs");
    if let Err(e) = fs::write(&dest, source) {
        panic!("failed to write {}: {}", dest.display(), e);
    }
}
