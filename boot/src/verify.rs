//! verify.rs — loader image vetting
//!
//! A loader named by a volume is only trusted as far as its container header:
//! the first 512 bytes must be a PE/COFF image for the one machine type this
//! stub is built for. No signatures are checked here.
//!
//! Header layout consulted (little-endian):
//!   0x000  "MZ"                       DOS magic
//!   0x03C  e_lfanew (u32)             offset of the PE header, < 0x180
//!   lfanew "PE\0\0"                   PE signature
//!   +4     machine (u16)              must be IMAGE_FILE_MACHINE_AMD64
//!
//! All fields are decoded from the byte buffer through bounds-checked
//! `zerocopy` views; the buffer is untrusted on-disk data.

use zerocopy::byteorder::{LittleEndian, U16, U32};
use zerocopy::{FromBytes, LayoutVerified, Unaligned};

use crate::error::BootError;
use crate::firmware::{Directory, ReadFile};
use crate::logger::log_debug;

/// Bytes of the image read and inspected.
pub const HEADER_SIZE: usize = 512;
pub const DOS_MAGIC: [u8; 2] = *b"MZ";
pub const PE_SIGNATURE: [u8; 4] = *b"PE\0\0";
/// Location of `e_lfanew` in the DOS header.
pub const LFANEW_OFFSET: usize = 0x3c;
/// `e_lfanew` must point below this.
pub const LFANEW_LIMIT: usize = 0x180;
/// IMAGE_FILE_MACHINE_AMD64; this stub only chainloads x86_64 images.
pub const SUPPORTED_MACHINE: u16 = 0x8664;

/// Outcome of inspecting an in-memory header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderVerdict {
    Valid,
    Truncated,
    InvalidFormat(&'static str),
}

impl HeaderVerdict {
    pub fn into_result(self) -> Result<(), BootError> {
        match self {
            HeaderVerdict::Valid => Ok(()),
            HeaderVerdict::Truncated => Err(BootError::Truncated),
            HeaderVerdict::InvalidFormat(why) => Err(BootError::InvalidFormat(why)),
        }
    }
}

/// PE signature plus the first COFF field.
#[derive(FromBytes, Unaligned, Clone, Copy)]
#[repr(C)]
struct PeSignature {
    signature: [u8; 4],
    machine: U16<LittleEndian>,
}

/// Classify a header buffer as read from disk.
pub fn inspect_header(header: &[u8]) -> HeaderVerdict {
    if header.len() < HEADER_SIZE {
        return HeaderVerdict::Truncated;
    }
    let header = &header[..HEADER_SIZE];

    if header[..2] != DOS_MAGIC {
        return HeaderVerdict::InvalidFormat("missing MZ magic");
    }

    let lfanew = match header
        .get(LFANEW_OFFSET..LFANEW_OFFSET + 4)
        .and_then(LayoutVerified::<_, U32<LittleEndian>>::new_unaligned)
    {
        Some(v) => v.get() as usize,
        None => return HeaderVerdict::InvalidFormat("short DOS header"),
    };
    if lfanew >= LFANEW_LIMIT {
        return HeaderVerdict::InvalidFormat("PE header offset out of range");
    }

    // lfanew < 0x180 keeps the 6-byte view well inside 512 bytes.
    let pe = match header
        .get(lfanew..)
        .and_then(LayoutVerified::<_, PeSignature>::new_unaligned_from_prefix)
    {
        Some((pe, _)) => pe,
        None => return HeaderVerdict::InvalidFormat("short PE header"),
    };
    if pe.signature != PE_SIGNATURE {
        return HeaderVerdict::InvalidFormat("missing PE signature");
    }
    if pe.machine.get() != SUPPORTED_MACHINE {
        return HeaderVerdict::InvalidFormat("unsupported machine type");
    }

    HeaderVerdict::Valid
}

/// Open `path` below `dir`, read its header and classify it.
///
/// I/O errors come back unchanged as [`BootError::Io`]. The file handle is
/// scoped to this call and closed on every return path.
pub fn validate<D: Directory>(dir: &mut D, path: &str) -> Result<(), BootError> {
    let mut header = [0u8; HEADER_SIZE];
    let read = {
        let mut file = dir.open_read(path).map_err(BootError::Io)?;
        read_header(&mut file, &mut header).map_err(BootError::Io)?
    };

    let verdict = inspect_header(&header[..read]);
    log_debug("verify", &alloc::format!("{}: {:?}", path, verdict));
    verdict.into_result()
}

/// Fill `buf` as far as the file allows; short reads are retried until EOF.
fn read_header<F: ReadFile>(file: &mut F, buf: &mut [u8]) -> Result<usize, r_efi::efi::Status> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = file.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}
