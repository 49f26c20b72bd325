//! In-memory firmware for tests.
//!
//! Volumes are maps of path → bytes. Every resource the core can acquire
//! (open file, mounted root, volume path, file path, loaded image) bumps a
//! counter on creation and on release, so tests can assert that nothing
//! leaked and nothing was released twice. Failures can be injected per step.

use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};

use r_efi::efi::Status;

use super::{ChildExit, Directory, Firmware, ImageInfo, ReadFile};
use crate::bootconf::BOOTCONF_PATH;
use crate::handoff::decode_ucs2;
use crate::verify::{HEADER_SIZE, LFANEW_OFFSET};

/// A minimal PE/COFF image for `machine` with its PE header at `lfanew`.
pub fn pe_image_at(lfanew: u32, machine: u16) -> Vec<u8> {
    let mut h = alloc::vec![0u8; HEADER_SIZE * 2];
    h[..2].copy_from_slice(b"MZ");
    h[LFANEW_OFFSET..LFANEW_OFFSET + 4].copy_from_slice(&lfanew.to_le_bytes());
    let at = lfanew as usize;
    if at + 6 <= HEADER_SIZE {
        h[at..at + 4].copy_from_slice(b"PE\0\0");
        h[at + 4..at + 6].copy_from_slice(&machine.to_le_bytes());
    }
    h
}

pub fn pe_image(machine: u16) -> Vec<u8> {
    pe_image_at(0x80, machine)
}

fn inc(c: &Cell<usize>) {
    c.set(c.get() + 1);
}

fn dec(c: &Cell<usize>) {
    let v = c.get();
    assert!(v > 0, "resource released more often than acquired");
    c.set(v - 1);
}

#[derive(Default)]
struct Counters {
    open_files: Cell<usize>,
    files_opened: Cell<usize>,
    mounted: Cell<usize>,
    mounts: Cell<usize>,
    volume_paths_live: Cell<usize>,
    volume_paths_freed: Cell<usize>,
    file_paths_live: Cell<usize>,
    file_paths_freed: Cell<usize>,
    images_live: Cell<usize>,
}

/// Shared resource accounting.
#[derive(Clone, Default)]
pub struct MockFs(Rc<Counters>);

impl MockFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_files(&self) -> usize {
        self.0.open_files.get()
    }

    pub fn files_opened(&self) -> usize {
        self.0.files_opened.get()
    }

    pub fn mounted(&self) -> usize {
        self.0.mounted.get()
    }

    pub fn mounts(&self) -> usize {
        self.0.mounts.get()
    }

    pub fn volume_paths_live(&self) -> usize {
        self.0.volume_paths_live.get()
    }

    pub fn volume_paths_freed(&self) -> usize {
        self.0.volume_paths_freed.get()
    }

    pub fn file_paths_live(&self) -> usize {
        self.0.file_paths_live.get()
    }

    pub fn file_paths_freed(&self) -> usize {
        self.0.file_paths_freed.get()
    }

    pub fn images_live(&self) -> usize {
        self.0.images_live.get()
    }
}

#[derive(Clone)]
struct MockFileSpec {
    data: Rc<Vec<u8>>,
    read_error: Option<Status>,
}

pub struct MockFile {
    fs: MockFs,
    data: Rc<Vec<u8>>,
    pos: usize,
    read_error: Option<Status>,
}

impl ReadFile for MockFile {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Status> {
        if let Some(s) = self.read_error {
            return Err(s);
        }
        let rest = &self.data[self.pos..];
        let n = rest.len().min(buf.len());
        buf[..n].copy_from_slice(&rest[..n]);
        self.pos += n;
        Ok(n)
    }
}

impl Drop for MockFile {
    fn drop(&mut self) {
        dec(&self.fs.0.open_files);
    }
}

pub struct MockDir {
    fs: MockFs,
    files: BTreeMap<String, MockFileSpec>,
    mounted: bool,
}

impl MockDir {
    /// A directory that is not a mounted volume root.
    pub fn new(fs: &MockFs) -> Self {
        Self {
            fs: fs.clone(),
            files: BTreeMap::new(),
            mounted: false,
        }
    }

    pub fn add_file(&mut self, path: &str, data: Vec<u8>) {
        self.files.insert(
            path.to_string(),
            MockFileSpec {
                data: Rc::new(data),
                read_error: None,
            },
        );
    }

    pub fn fail_reads(&mut self, path: &str, status: Status) {
        if let Some(spec) = self.files.get_mut(path) {
            spec.read_error = Some(status);
        }
    }
}

impl Directory for MockDir {
    type File = MockFile;

    fn open_read(&mut self, path: &str) -> Result<MockFile, Status> {
        let spec = self.files.get(path).ok_or(Status::NOT_FOUND)?;
        inc(&self.fs.0.open_files);
        inc(&self.fs.0.files_opened);
        Ok(MockFile {
            fs: self.fs.clone(),
            data: spec.data.clone(),
            pos: 0,
            read_error: spec.read_error,
        })
    }
}

impl Drop for MockDir {
    fn drop(&mut self) {
        if self.mounted {
            dec(&self.fs.0.mounted);
        }
    }
}

/// One firmware volume.
#[derive(Clone)]
pub struct MockVolume {
    files: BTreeMap<String, MockFileSpec>,
    has_fs: bool,
    has_device_path: bool,
}

impl MockVolume {
    pub fn new() -> Self {
        Self {
            files: BTreeMap::new(),
            has_fs: true,
            has_device_path: true,
        }
    }

    pub fn with_file(mut self, path: &str, data: Vec<u8>) -> Self {
        self.files.insert(
            path.to_string(),
            MockFileSpec {
                data: Rc::new(data),
                read_error: None,
            },
        );
        self
    }

    pub fn with_bootconf(self, text: &str) -> Self {
        self.with_file(BOOTCONF_PATH, text.as_bytes().to_vec())
    }

    pub fn with_read_failure(mut self, path: &str, status: Status) -> Self {
        if let Some(spec) = self.files.get_mut(path) {
            spec.read_error = Some(status);
        }
        self
    }

    pub fn without_fs(mut self) -> Self {
        self.has_fs = false;
        self
    }

    pub fn without_device_path(mut self) -> Self {
        self.has_device_path = false;
        self
    }
}

pub struct MockVolumePath {
    fs: MockFs,
    volume: usize,
}

impl Drop for MockVolumePath {
    fn drop(&mut self) {
        dec(&self.fs.0.volume_paths_live);
        inc(&self.fs.0.volume_paths_freed);
    }
}

pub struct MockFilePath {
    fs: MockFs,
    text: String,
}

impl MockFilePath {
    fn new(fs: &MockFs, text: String) -> Self {
        inc(&fs.0.file_paths_live);
        Self { fs: fs.clone(), text }
    }
}

impl Drop for MockFilePath {
    fn drop(&mut self) {
        dec(&self.fs.0.file_paths_live);
        inc(&self.fs.0.file_paths_freed);
    }
}

#[derive(Debug)]
pub struct MockImage(pub usize);

pub struct MockFirmware {
    pub fs: MockFs,
    volumes: Vec<MockVolume>,
    volumes_error: Option<Status>,
    fail_file_path: bool,
    load_error: Option<Status>,
    load_options_error: Option<Status>,
    unload_error: Option<Status>,
    exit: ChildExit,
    calls: RefCell<Vec<String>>,
    load_options_size: Cell<Option<usize>>,
    next_image: Cell<usize>,
    image_info_queries: Cell<usize>,
}

impl MockFirmware {
    pub fn new(volumes: Vec<MockVolume>) -> Self {
        Self {
            fs: MockFs::new(),
            volumes,
            volumes_error: None,
            fail_file_path: false,
            load_error: None,
            load_options_error: None,
            unload_error: None,
            exit: ChildExit {
                status: Status::SUCCESS,
                exit_data_size: 0,
                exit_data: 0,
            },
            calls: RefCell::new(Vec::new()),
            load_options_size: Cell::new(None),
            next_image: Cell::new(1),
            image_info_queries: Cell::new(0),
        }
    }

    /// `n` empty volumes, each with a file system and a device path.
    pub fn with_volume_count(n: usize) -> Self {
        Self::new((0..n).map(|_| MockVolume::new()).collect())
    }

    pub fn failing_volumes(mut self, status: Status) -> Self {
        self.volumes_error = Some(status);
        self
    }

    pub fn failing_file_path(mut self) -> Self {
        self.fail_file_path = true;
        self
    }

    pub fn failing_load(mut self, status: Status) -> Self {
        self.load_error = Some(status);
        self
    }

    pub fn failing_load_options(mut self, status: Status) -> Self {
        self.load_options_error = Some(status);
        self
    }

    pub fn failing_unload(mut self, status: Status) -> Self {
        self.unload_error = Some(status);
        self
    }

    pub fn child_exit(mut self, status: Status, exit_data_size: usize, exit_data: usize) -> Self {
        self.exit = ChildExit {
            status,
            exit_data_size,
            exit_data,
        };
        self
    }

    /// Image-related firmware calls, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn last_load_options_size(&self) -> Option<usize> {
        self.load_options_size.get()
    }

    pub fn image_info_queries(&self) -> usize {
        self.image_info_queries.get()
    }

    fn record(&self, call: String) {
        self.calls.borrow_mut().push(call);
    }
}

impl Firmware for MockFirmware {
    type Volume = usize;
    type Root = MockDir;
    type VolumePath = MockVolumePath;
    type FilePath = MockFilePath;
    type Image = MockImage;

    fn volumes(&self) -> Result<Vec<usize>, Status> {
        match self.volumes_error {
            Some(s) => Err(s),
            None => Ok((0..self.volumes.len()).collect()),
        }
    }

    fn mount(&self, volume: usize) -> Result<MockDir, Status> {
        let vol = self.volumes.get(volume).ok_or(Status::INVALID_PARAMETER)?;
        if !vol.has_fs {
            return Err(Status::UNSUPPORTED);
        }
        inc(&self.fs.0.mounts);
        inc(&self.fs.0.mounted);
        Ok(MockDir {
            fs: self.fs.clone(),
            files: vol.files.clone(),
            mounted: true,
        })
    }

    fn device_path(&self, volume: usize) -> Result<MockVolumePath, Status> {
        let vol = self.volumes.get(volume).ok_or(Status::NOT_FOUND)?;
        if !vol.has_device_path {
            return Err(Status::UNSUPPORTED);
        }
        inc(&self.fs.0.volume_paths_live);
        Ok(MockVolumePath {
            fs: self.fs.clone(),
            volume,
        })
    }

    fn file_device_path(&self, volume: &MockVolumePath, path: &str) -> Option<MockFilePath> {
        self.record(alloc::format!("file_device_path({})", path));
        let built = MockFilePath::new(&self.fs, alloc::format!("HD({})/File({})", volume.volume, path));
        if self.fail_file_path {
            drop(built);
            return None;
        }
        Some(built)
    }

    fn describe(&self, path: &MockFilePath) -> String {
        path.text.clone()
    }

    fn load_image(&self, _path: &MockFilePath) -> Result<MockImage, Status> {
        self.record("load_image".to_string());
        if let Some(s) = self.load_error {
            return Err(s);
        }
        let id = self.next_image.get();
        self.next_image.set(id + 1);
        inc(&self.fs.0.images_live);
        Ok(MockImage(id))
    }

    fn set_load_options(&self, _image: &MockImage, options: &[u16]) -> Result<(), Status> {
        self.record(alloc::format!("set_load_options({})", decode_ucs2(options)));
        if let Some(s) = self.load_options_error {
            return Err(s);
        }
        self.load_options_size.set(Some(options.len() * 2));
        Ok(())
    }

    fn image_info(&self, image: &MockImage) -> Option<ImageInfo> {
        inc(&self.image_info_queries);
        Some(ImageInfo {
            revision: 0x1000,
            parent: 0x1,
            base: 0x10_0000 * image.0,
            size: 0x2000,
            code_type: 1,
            data_type: 2,
            load_options_size: self.load_options_size.get().unwrap_or(0) as u32,
        })
    }

    fn start_image(&self, _image: &MockImage) -> ChildExit {
        self.record("start_image".to_string());
        self.exit
    }

    fn unload_image(&self, _image: MockImage) -> Result<(), Status> {
        self.record("unload_image".to_string());
        dec(&self.fs.0.images_live);
        match self.unload_error {
            Some(s) => Err(s),
            None => Ok(()),
        }
    }
}
