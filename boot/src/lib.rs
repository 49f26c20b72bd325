//! NØNOS Chainloader — slot resolution + chainload core
//!
//! The stage-0 stub finds every firmware volume carrying a `bootconf`, keeps
//! the ones whose loader is a real x86_64 PE/COFF image, ranks them by
//! `boot-requested-at`, honours `boot-other`/`update` intent and hands control
//! to exactly one loader.
//!
//! Everything in here talks to firmware through the traits in [`firmware`],
//! so the decision core runs (and is tested) on the host as well.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod bootconf;
pub mod candidate;
pub mod chainload;
pub mod collect;
pub mod error;
pub mod firmware;
pub mod handoff;
pub mod logger;
pub mod rank;
pub mod select;
pub mod verify;

pub use candidate::{BootCandidate, ChosenBoot};
pub use error::{status_name, BootError};

use crate::firmware::Firmware;

/// Scan, rank and select: the whole resolution pass up to (not including)
/// the chainload itself.
pub fn resolve<F: Firmware>(fw: &F) -> Result<ChosenBoot<F>, BootError> {
    let mut candidates = collect::collect_candidates(fw)?;
    let swaps = rank::rank_candidates(&mut candidates);
    logger::log_debug(
        "rank",
        &alloc::format!("{} candidate(s) ranked, {} swap(s)", candidates.len(), swaps),
    );
    select::select_candidate(candidates)
}
