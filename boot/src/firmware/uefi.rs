//! UEFI boot services behind the [`Firmware`] boundary.
//!
//! `UefiFirmware` is the stub's execution context: its own image handle, the
//! boot services table, and that same table in its raw `r-efi` layout. Volumes
//! are simple-file-system handles; protocols are opened with GET_PROTOCOL
//! semantics so no driver is disconnected while we look around.

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use r_efi::efi;
use r_efi::protocols::loaded_image;
use uefi::prelude::*;
use uefi::proto::device_path::build::{self, DevicePathBuilder};
use uefi::proto::device_path::text::{AllowShortcuts, DevicePathToText, DisplayOnly};
use uefi::proto::device_path::{DevicePath, FfiDevicePath};
use uefi::proto::loaded_image::LoadedImage;
use uefi::proto::media::file::{self, File, FileAttribute, FileMode, RegularFile};
use uefi::proto::media::fs::SimpleFileSystem;
use uefi::proto::ProtocolPointer;
use uefi::table::boot::{
    BootServices, LoadImageSource, OpenProtocolAttributes, OpenProtocolParams, ScopedProtocol,
    SearchType,
};
use uefi::{CString16, Identify};

use super::{ChildExit, Directory, Firmware, ImageInfo, ReadFile};

/// Backing store for an empty command line (size 0).
static EMPTY_OPTIONS: [u16; 1] = [0];

#[inline]
fn raw(s: Status) -> efi::Status {
    efi::Status::from_usize(s.0)
}

#[inline]
fn raw_handle(h: Handle) -> efi::Handle {
    // SAFETY: `Handle` is a repr(transparent) non-null `void *`.
    unsafe { core::mem::transmute::<Handle, efi::Handle>(h) }
}

pub struct UefiFile(RegularFile);

impl ReadFile for UefiFile {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, efi::Status> {
        self.0.read(buf).map_err(|e| raw(e.status()))
    }
}

/// Root directory of a mounted volume; closing it unmounts the volume.
pub struct UefiRoot(file::Directory);

impl Directory for UefiRoot {
    type File = UefiFile;

    fn open_read(&mut self, path: &str) -> Result<UefiFile, efi::Status> {
        let name = CString16::try_from(path).map_err(|_| efi::Status::INVALID_PARAMETER)?;
        let handle = self
            .0
            .open(&name, FileMode::Read, FileAttribute::empty())
            .map_err(|e| raw(e.status()))?;
        handle
            .into_regular_file()
            .map(UefiFile)
            .ok_or(efi::Status::UNSUPPORTED)
    }
}

/// Device path built in pool memory we own; freed on drop.
pub struct UefiFilePath(Vec<u8>);

impl UefiFilePath {
    pub fn as_device_path(&self) -> &DevicePath {
        // SAFETY: the buffer was produced by DevicePathBuilder::finalize and
        // holds a complete, end-terminated device path.
        unsafe { DevicePath::from_ffi_ptr(self.0.as_ptr().cast::<FfiDevicePath>()) }
    }
}

pub struct UefiFirmware<'a> {
    image: Handle,
    bt: &'a BootServices,
    /// The same boot services table, as the raw firmware layout.
    raw_bt: *const efi::BootServices,
}

impl<'a> UefiFirmware<'a> {
    pub fn new(image: Handle, st: &'a SystemTable<Boot>) -> Self {
        let bt = st.boot_services();
        Self {
            image,
            bt,
            // `BootServices` is the firmware table itself, not a copy.
            raw_bt: (bt as *const BootServices).cast::<efi::BootServices>(),
        }
    }

    fn params(&self, handle: Handle) -> OpenProtocolParams {
        OpenProtocolParams {
            handle,
            agent: self.image,
            controller: None,
        }
    }

    fn get_protocol<P: ProtocolPointer + ?Sized>(
        &self,
        handle: Handle,
    ) -> Result<ScopedProtocol<'a, P>, efi::Status> {
        // SAFETY: GET_PROTOCOL does not take ownership; callers only hold the
        // interface while the handle is alive.
        unsafe {
            self.bt
                .open_protocol::<P>(self.params(handle), OpenProtocolAttributes::GetProtocol)
        }
        .map_err(|e| raw(e.status()))
    }

    fn path_to_text(&self, path: &DevicePath) -> String {
        let text = self
            .bt
            .get_handle_for_protocol::<DevicePathToText>()
            .and_then(|h| self.bt.open_protocol_exclusive::<DevicePathToText>(h))
            .and_then(|to_text| {
                to_text.convert_device_path_to_text(
                    self.bt,
                    path,
                    DisplayOnly(false),
                    AllowShortcuts(false),
                )
            });
        match text {
            Ok(text) => text.to_string(),
            Err(_) => "<device path>".to_string(),
        }
    }

    /// Where this stub itself was loaded from.
    pub fn self_location(&self) -> Option<String> {
        let li = self.get_protocol::<LoadedImage>(self.image).ok()?;
        li.file_path().map(|p| self.path_to_text(p))
    }
}

impl<'a> Firmware for UefiFirmware<'a> {
    type Volume = Handle;
    type Root = UefiRoot;
    type VolumePath = ScopedProtocol<'a, DevicePath>;
    type FilePath = UefiFilePath;
    type Image = Handle;

    fn volumes(&self) -> Result<Vec<Handle>, efi::Status> {
        let handles = self
            .bt
            .locate_handle_buffer(SearchType::ByProtocol(&SimpleFileSystem::GUID))
            .map_err(|e| raw(e.status()))?;
        Ok(handles.iter().copied().collect())
    }

    fn mount(&self, volume: Handle) -> Result<UefiRoot, efi::Status> {
        let mut fs = self.get_protocol::<SimpleFileSystem>(volume)?;
        let root = fs.open_volume().map_err(|e| raw(e.status()))?;
        Ok(UefiRoot(root))
    }

    fn device_path(&self, volume: Handle) -> Result<Self::VolumePath, efi::Status> {
        self.get_protocol::<DevicePath>(volume)
    }

    fn file_device_path(&self, volume: &Self::VolumePath, path: &str) -> Option<UefiFilePath> {
        let name = CString16::try_from(path).ok()?;
        let mut storage = Vec::new();
        {
            let mut builder = DevicePathBuilder::with_vec(&mut storage);
            for node in volume.node_iter() {
                builder = builder.push(&node).ok()?;
            }
            builder = builder
                .push(&build::media::FilePath { path_name: &name })
                .ok()?;
            builder.finalize().ok()?;
        }
        Some(UefiFilePath(storage))
    }

    fn describe(&self, path: &UefiFilePath) -> String {
        self.path_to_text(path.as_device_path())
    }

    fn load_image(&self, path: &UefiFilePath) -> Result<Handle, efi::Status> {
        self.bt
            .load_image(
                self.image,
                LoadImageSource::FromFilePath {
                    file_path: path.as_device_path(),
                    from_boot_manager: false,
                },
            )
            .map_err(|e| raw(e.status()))
    }

    fn set_load_options(&self, image: &Handle, options: &[u16]) -> Result<(), efi::Status> {
        let mut child = self.get_protocol::<LoadedImage>(*image)?;
        let size = u32::try_from(core::mem::size_of_val(options))
            .map_err(|_| efi::Status::BAD_BUFFER_SIZE)?;
        let data = if options.is_empty() {
            EMPTY_OPTIONS.as_ptr()
        } else {
            options.as_ptr()
        };
        // SAFETY: the caller keeps `options` alive until the child has run;
        // EMPTY_OPTIONS is static.
        unsafe { child.set_load_options(data.cast::<u8>(), size) };
        Ok(())
    }

    fn start_image(&self, image: &Handle) -> ChildExit {
        let mut size: usize = 0;
        let mut data: *mut efi::Char16 = core::ptr::null_mut();

        // StartImage goes through the raw table so the exit data survives.
        // SAFETY: `raw_bt` points at the live boot services table.
        let status = unsafe {
            let bs = self.raw_bt;
            let status = ((*bs).start_image)(raw_handle(*image), &mut size, &mut data);
            if !data.is_null() {
                ((*bs).free_pool)(data.cast());
            }
            status
        };

        ChildExit {
            status,
            exit_data_size: size,
            exit_data: data as usize,
        }
    }

    fn image_info(&self, image: &Handle) -> Option<ImageInfo> {
        let child = self.get_protocol::<LoadedImage>(*image).ok()?;
        // SAFETY: the interface behind `LoadedImage` is the firmware's
        // EFI_LOADED_IMAGE_PROTOCOL and stays valid while `child` is open.
        let proto = unsafe { &*(&*child as *const LoadedImage).cast::<loaded_image::Protocol>() };
        Some(ImageInfo {
            revision: proto.revision,
            parent: proto.parent_handle as usize,
            base: proto.image_base as usize,
            size: proto.image_size,
            code_type: proto.image_code_type,
            data_type: proto.image_data_type,
            load_options_size: proto.load_options_size,
        })
    }

    fn unload_image(&self, image: Handle) -> Result<(), efi::Status> {
        self.bt.unload_image(image).map_err(|e| raw(e.status()))
    }
}
