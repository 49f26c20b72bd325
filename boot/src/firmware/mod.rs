//! Firmware boundary.
//!
//! The decision core never calls UEFI directly. It sees volumes, mounted
//! roots, files and child images through these traits, and every acquired
//! resource is an owned value whose `Drop` gives it back to firmware: a
//! dropped [`ReadFile`] is closed, a dropped [`Directory`] root is unmounted,
//! a dropped device path is freed.

use alloc::vec::Vec;
use core::fmt;

use r_efi::efi::Status;

#[cfg(target_os = "uefi")]
pub mod uefi;

#[cfg(test)]
pub mod mock;

/// An open, read-only file. Closed on drop.
pub trait ReadFile {
    /// Read up to `buf.len()` bytes from the current position.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Status>;
}

/// The root directory of a mounted volume. Unmounted on drop.
pub trait Directory {
    type File: ReadFile;

    fn open_read(&mut self, path: &str) -> Result<Self::File, Status>;

    /// Whether `path` can be opened at all; the probe handle is closed again.
    fn exists(&mut self, path: &str) -> bool {
        self.open_read(path).is_ok()
    }

    /// Read a whole (small) file, refusing anything above `limit` bytes.
    fn read_all(&mut self, path: &str, limit: usize) -> Result<Vec<u8>, Status> {
        let mut file = self.open_read(path)?;
        let mut out = Vec::new();
        let mut chunk = [0u8; 512];
        loop {
            let n = file.read(&mut chunk)?;
            if n == 0 {
                break;
            }
            if out.len() + n > limit {
                return Err(Status::BAD_BUFFER_SIZE);
            }
            out.extend_from_slice(&chunk[..n]);
        }
        Ok(out)
    }
}

/// What a child image left behind when it returned control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildExit {
    pub status: Status,
    /// Size in bytes of the exit data buffer, 0 when none was returned.
    pub exit_data_size: usize,
    /// Address of the exit data buffer (diagnostics only, already released).
    pub exit_data: usize,
}

impl ChildExit {
    pub fn clean(&self) -> bool {
        self.status == Status::SUCCESS
    }
}

/// What firmware recorded about a loaded child image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    pub revision: u32,
    /// Handle of the image that loaded it (us), as an address.
    pub parent: usize,
    pub base: usize,
    pub size: u64,
    pub code_type: u32,
    pub data_type: u32,
    pub load_options_size: u32,
}

impl fmt::Display for ImageInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rev {:#x}, parent {:#x}, base {:#x}, {} bytes, code {}, data {}, options {} bytes",
            self.revision,
            self.parent,
            self.base,
            self.size,
            memory_type_name(self.code_type),
            memory_type_name(self.data_type),
            self.load_options_size
        )
    }
}

/// Name of an `EFI_MEMORY_TYPE`.
pub fn memory_type_name(t: u32) -> &'static str {
    match t {
        0 => "Reserved",
        1 => "Loader Code",
        2 => "Loader Data",
        3 => "Boot Services Code",
        4 => "Boot Services Data",
        5 => "Runtime Services Code",
        6 => "Runtime Services Data",
        7 => "Conventional Memory",
        8 => "Unusable Memory",
        9 => "ACPI Reclaim Memory",
        10 => "ACPI Memory NVS",
        11 => "Memory Mapped IO",
        12 => "Memory Mapped IO Port Space",
        13 => "Pal Code",
        14 => "Persistent Memory",
        _ => "(out of range)",
    }
}

/// Execution context of the stub: who we are and what firmware offers.
///
/// One value of this type is threaded through collection, selection and the
/// chainload; nothing here is global.
pub trait Firmware {
    /// Opaque volume handle.
    type Volume: Copy + fmt::Debug;
    /// Mounted root of a volume.
    type Root: Directory;
    /// Device path of a whole volume.
    type VolumePath;
    /// Fully-qualified device path of a file on a volume. Freed on drop.
    type FilePath;
    /// Handle of a loaded, not yet unloaded, child image.
    type Image;

    /// Every handle exposing a simple file system, in firmware order.
    fn volumes(&self) -> Result<Vec<Self::Volume>, Status>;

    /// Acquire the volume's file system and open its root directory.
    fn mount(&self, volume: Self::Volume) -> Result<Self::Root, Status>;

    fn device_path(&self, volume: Self::Volume) -> Result<Self::VolumePath, Status>;

    /// `None` when the path cannot be represented or allocated.
    fn file_device_path(&self, volume: &Self::VolumePath, path: &str) -> Option<Self::FilePath>;

    /// Human-readable rendering of a file path, for diagnostics.
    fn describe(&self, path: &Self::FilePath) -> alloc::string::String;

    fn load_image(&self, path: &Self::FilePath) -> Result<Self::Image, Status>;

    /// Replace the child's load options. `options` is NUL-terminated UCS-2
    /// (or empty) and must stay alive until the child has been started.
    fn set_load_options(&self, image: &Self::Image, options: &[u16]) -> Result<(), Status>;

    /// Loaded-image details for diagnostics; `None` if firmware won't say.
    fn image_info(&self, image: &Self::Image) -> Option<ImageInfo>;

    fn start_image(&self, image: &Self::Image) -> ChildExit;

    fn unload_image(&self, image: Self::Image) -> Result<(), Status>;
}
