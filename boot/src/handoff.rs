//! NØNOS Chainload Handoff — command line contract with the next stage
//!
//! The loader we chainload never sees the stub's own invocation arguments.
//! Its load options are either empty or the single update literal below,
//! encoded the way firmware expects them: NUL-terminated UCS-2, with the
//! size given in bytes including the terminator.

use alloc::vec::Vec;

/// Load option passed to the loader when update mode was requested.
pub const UPDATE_FLAG: &str = "nonos-update=1";

/// Load options as handed to firmware.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoadOptions {
    ucs2: Vec<u16>,
}

impl LoadOptions {
    /// No load options at all (size 0).
    pub fn empty() -> Self {
        Self { ucs2: Vec::new() }
    }

    /// Encode `args`; an empty string yields [`LoadOptions::empty`].
    /// Characters outside the BMP are replaced with `?`.
    pub fn from_args(args: &str) -> Self {
        if args.is_empty() {
            return Self::empty();
        }
        let mut ucs2: Vec<u16> = args
            .chars()
            .map(|c| if (c as u32) <= 0xFFFF { c as u16 } else { b'?' as u16 })
            .collect();
        ucs2.push(0);
        Self { ucs2 }
    }

    pub fn as_ucs2(&self) -> &[u16] {
        &self.ucs2
    }

    /// `LoadOptionsSize` value for the child's loaded image.
    pub fn size_in_bytes(&self) -> usize {
        self.ucs2.len() * core::mem::size_of::<u16>()
    }

    pub fn is_empty(&self) -> bool {
        self.ucs2.is_empty()
    }
}

/// Decode load options back to text (diagnostics, tests).
pub fn decode_ucs2(raw: &[u16]) -> alloc::string::String {
    raw.iter()
        .take_while(|&&c| c != 0)
        .map(|&c| char::from_u32(c as u32).unwrap_or('?'))
        .collect()
}
