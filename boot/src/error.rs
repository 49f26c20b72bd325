//! Chainloader error handling
//!
//! Firmware calls report `r_efi` status codes; everything above them reports a
//! [`BootError`], which always knows the status it hands back to firmware.

use core::fmt;

use r_efi::efi::Status;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootError {
    /// Open/read/mount failure, status propagated verbatim.
    Io(Status),
    /// Fewer header bytes on disk than a PE/COFF image needs.
    Truncated,
    /// Bad MZ/PE magic, out-of-range `e_lfanew` or foreign machine type.
    InvalidFormat(&'static str),
    /// No volume produced a usable candidate.
    NotFound,
    /// A device path could not be built for the chosen loader.
    InvalidParameter,
    /// `bootconf` could not be parsed.
    Config(&'static str),
    /// Firmware refused to load the child image.
    Load(Status),
    /// The child's load options could not be rewritten.
    LoadOptions(Status),
}

impl BootError {
    /// Status handed back to firmware for this error.
    pub fn status(&self) -> Status {
        match self {
            BootError::Io(s) | BootError::Load(s) | BootError::LoadOptions(s) => *s,
            BootError::Truncated => Status::END_OF_FILE,
            BootError::InvalidFormat(_) => Status::LOAD_ERROR,
            BootError::NotFound => Status::NOT_FOUND,
            BootError::InvalidParameter => Status::INVALID_PARAMETER,
            BootError::Config(_) => Status::VOLUME_CORRUPTED,
        }
    }
}

impl fmt::Display for BootError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootError::Io(s) => write!(f, "i/o error: {}", status_name(*s)),
            BootError::Truncated => f.write_str("image header truncated"),
            BootError::InvalidFormat(why) => write!(f, "not a loadable image: {}", why),
            BootError::NotFound => f.write_str("no bootable candidate found"),
            BootError::InvalidParameter => f.write_str("cannot construct loader device path"),
            BootError::Config(why) => write!(f, "bootconf: {}", why),
            BootError::Load(s) => write!(f, "load-image failed: {}", status_name(*s)),
            BootError::LoadOptions(s) => {
                write!(f, "cannot rewrite load options: {}", status_name(*s))
            }
        }
    }
}

/// Symbolic `EFI_*` name of a status code, for logs.
pub fn status_name(s: Status) -> &'static str {
    match s {
        Status::SUCCESS => "EFI_SUCCESS",
        Status::LOAD_ERROR => "EFI_LOAD_ERROR",
        Status::INVALID_PARAMETER => "EFI_INVALID_PARAMETER",
        Status::UNSUPPORTED => "EFI_UNSUPPORTED",
        Status::BAD_BUFFER_SIZE => "EFI_BAD_BUFFER_SIZE",
        Status::BUFFER_TOO_SMALL => "EFI_BUFFER_TOO_SMALL",
        Status::NOT_READY => "EFI_NOT_READY",
        Status::DEVICE_ERROR => "EFI_DEVICE_ERROR",
        Status::WRITE_PROTECTED => "EFI_WRITE_PROTECTED",
        Status::OUT_OF_RESOURCES => "EFI_OUT_OF_RESOURCES",
        Status::VOLUME_CORRUPTED => "EFI_VOLUME_CORRUPTED",
        Status::VOLUME_FULL => "EFI_VOLUME_FULL",
        Status::NO_MEDIA => "EFI_NO_MEDIA",
        Status::MEDIA_CHANGED => "EFI_MEDIA_CHANGED",
        Status::NOT_FOUND => "EFI_NOT_FOUND",
        Status::ACCESS_DENIED => "EFI_ACCESS_DENIED",
        Status::NO_RESPONSE => "EFI_NO_RESPONSE",
        Status::NO_MAPPING => "EFI_NO_MAPPING",
        Status::TIMEOUT => "EFI_TIMEOUT",
        Status::NOT_STARTED => "EFI_NOT_STARTED",
        Status::ALREADY_STARTED => "EFI_ALREADY_STARTED",
        Status::ABORTED => "EFI_ABORTED",
        Status::ICMP_ERROR => "EFI_ICMP_ERROR",
        Status::TFTP_ERROR => "EFI_TFTP_ERROR",
        Status::PROTOCOL_ERROR => "EFI_PROTOCOL_ERROR",
        Status::INCOMPATIBLE_VERSION => "EFI_INCOMPATIBLE_VERSION",
        Status::SECURITY_VIOLATION => "EFI_SECURITY_VIOLATION",
        Status::CRC_ERROR => "EFI_CRC_ERROR",
        Status::END_OF_MEDIA => "EFI_END_OF_MEDIA",
        Status::END_OF_FILE => "EFI_END_OF_FILE",
        Status::INVALID_LANGUAGE => "EFI_INVALID_LANGUAGE",
        Status::COMPROMISED_DATA => "EFI_COMPROMISED_DATA",
        _ => "-UNKNOWN-",
    }
}
