//! Boot candidates and the chosen boot.
//!
//! A [`BootCandidate`] owns everything collected for one volume: its device
//! path, the validated loader path and the parsed bootconf. Selection moves
//! exactly one of them into a [`ChosenBoot`]; the others are dropped, which
//! releases their resources once.

use alloc::string::String;
use core::fmt;

use crate::bootconf::{BootConf, BootIntent};
use crate::firmware::Firmware;
use crate::handoff::UPDATE_FLAG;

/// Most candidates tracked at once; volumes past this are not scanned.
pub const MAX_CANDIDATES: usize = 16;

/// A discovered, validated potential boot target.
pub struct BootCandidate<F: Firmware> {
    /// Position in firmware volume order, for logs and tie-breaks.
    pub index: usize,
    pub volume: F::Volume,
    pub device_path: F::VolumePath,
    pub loader_path: String,
    pub conf: BootConf,
    /// `boot-requested-at`; 0 when unset.
    pub requested_at: u64,
}

impl<F: Firmware> BootCandidate<F> {
    pub fn intent(&self) -> BootIntent {
        self.conf.intent()
    }
}

impl<F: Firmware> fmt::Debug for BootCandidate<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BootCandidate")
            .field("index", &self.index)
            .field("volume", &self.volume)
            .field("loader_path", &self.loader_path)
            .field("requested_at", &self.requested_at)
            .field("intent", &self.intent())
            .finish()
    }
}

/// The single boot target that survived selection.
pub struct ChosenBoot<F: Firmware> {
    pub index: usize,
    pub volume: F::Volume,
    pub device_path: F::VolumePath,
    pub loader_path: String,
    pub conf: BootConf,
    pub requested_at: u64,
    /// Empty, or [`UPDATE_FLAG`].
    pub args: &'static str,
}

impl<F: Firmware> ChosenBoot<F> {
    /// Take ownership of a candidate's resources. The candidate is consumed,
    /// so nothing is left behind for the rejected set to release.
    pub fn adopt(candidate: BootCandidate<F>, update: bool) -> Self {
        let BootCandidate {
            index,
            volume,
            device_path,
            loader_path,
            conf,
            requested_at,
        } = candidate;

        Self {
            index,
            volume,
            device_path,
            loader_path,
            conf,
            requested_at,
            args: if update { UPDATE_FLAG } else { "" },
        }
    }

    pub fn update_mode(&self) -> bool {
        !self.args.is_empty()
    }
}

impl<F: Firmware> fmt::Debug for ChosenBoot<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChosenBoot")
            .field("index", &self.index)
            .field("volume", &self.volume)
            .field("loader_path", &self.loader_path)
            .field("requested_at", &self.requested_at)
            .field("args", &self.args)
            .finish()
    }
}
