//! bootconf.rs — per-volume boot intent store
//!
//! Every bootable volume carries a small `key: value` text file describing
//! its slot: whether the image is known bad, which loader to run, when it
//! last asked to be booted and whether it defers to another slot. The core
//! only ever consults the five keys below; everything else is kept verbatim.

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};

use bitflags::bitflags;

use crate::error::BootError;

/// Config marker file, relative to each volume root.
pub const BOOTCONF_PATH: &str = "\\NONOS\\bootconf";
/// Files above this size are not bootconfs.
pub const BOOTCONF_MAX_SIZE: usize = 64 * 1024;

pub const KEY_IMAGE_INVALID: &str = "image-invalid";
pub const KEY_LOADER: &str = "loader";
pub const KEY_BOOT_OTHER: &str = "boot-other";
pub const KEY_UPDATE: &str = "update";
pub const KEY_BOOT_REQUESTED_AT: &str = "boot-requested-at";

bitflags! {
    /// Boolean intent carried by a bootconf.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct BootIntent: u8 {
        /// Slot is known broken; never boot it.
        const IMAGE_INVALID = 1 << 0;
        /// Prefer another candidate over this one.
        const BOOT_OTHER    = 1 << 1;
        /// Start the loader in update mode.
        const UPDATE        = 1 << 2;
    }
}

/// A parsed bootconf.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootConf {
    entries: BTreeMap<String, String>,
}

impl BootConf {
    /// Parse bootconf text. Blank lines and `#` comments are skipped; a
    /// repeated key keeps its last value.
    pub fn parse(raw: &[u8]) -> Result<Self, BootError> {
        if raw.len() > BOOTCONF_MAX_SIZE {
            return Err(BootError::Config("file too large"));
        }
        let text = core::str::from_utf8(raw).map_err(|_| BootError::Config("not utf-8"))?;

        let mut entries = BTreeMap::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (key, value) = line
                .split_once(':')
                .ok_or(BootError::Config("line without ':' separator"))?;
            let key = key.trim();
            if key.is_empty() {
                return Err(BootError::Config("empty key"));
            }
            entries.insert(key.to_string(), value.trim().to_string());
        }

        Ok(Self { entries })
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.entries
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Absent or unrecognised values read as `false`.
    pub fn get_bool(&self, key: &str) -> bool {
        match self.get_str(key) {
            Some(v) => {
                v == "1"
                    || v.eq_ignore_ascii_case("true")
                    || v.eq_ignore_ascii_case("yes")
            }
            None => false,
        }
    }

    /// Absent or malformed values read as 0.
    pub fn get_uint(&self, key: &str) -> u64 {
        self.get_str(key)
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0)
    }

    pub fn intent(&self) -> BootIntent {
        let mut intent = BootIntent::empty();
        intent.set(BootIntent::IMAGE_INVALID, self.get_bool(KEY_IMAGE_INVALID));
        intent.set(BootIntent::BOOT_OTHER, self.get_bool(KEY_BOOT_OTHER));
        intent.set(BootIntent::UPDATE, self.get_bool(KEY_UPDATE));
        intent
    }

    pub fn requested_at(&self) -> u64 {
        self.get_uint(KEY_BOOT_REQUESTED_AT)
    }

    /// Override loader, normalised to an absolute `\`-separated path.
    pub fn loader(&self) -> Option<String> {
        self.get_str(KEY_LOADER).map(normalise_path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// `EFI/x/grub.efi` and `\EFI\x\grub.efi` name the same file.
pub fn normalise_path(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 1);
    for part in raw.split(['/', '\\']).filter(|p| !p.is_empty()) {
        out.push('\\');
        out.push_str(part);
    }
    if out.is_empty() {
        out.push('\\');
    }
    out
}
