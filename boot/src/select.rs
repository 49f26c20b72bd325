//! select.rs — pick exactly one candidate from the ranked list
//!
//! Walk from the newest candidate towards the oldest. A candidate with
//! `boot-other` defers to the next older one; the first that does not defer
//! wins, and if every candidate defers the oldest wins. The `update` flag of
//! the newest deferring candidate is inherited by whichever one wins, and an
//! inherited `true` is never cleared by the winner's own `false`.

use alloc::format;
use arrayvec::ArrayVec;

use crate::bootconf::BootIntent;
use crate::candidate::{ChosenBoot, MAX_CANDIDATES};
use crate::collect::Candidates;
use crate::error::BootError;
use crate::firmware::Firmware;
use crate::logger::{log_critical, log_debug, log_info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    /// Position in the ascending list.
    pub index: usize,
    /// Effective update mode for the winner.
    pub update: bool,
}

/// Apply boot intent to an ascending (oldest first) list of intents.
pub fn decide(intents: &[BootIntent]) -> Option<Decision> {
    let mut inherited: Option<bool> = None;
    let mut chosen = None;

    for (i, intent) in intents.iter().enumerate().rev() {
        chosen = Some(i);
        if !intent.contains(BootIntent::BOOT_OTHER) {
            break;
        }
        if inherited.is_none() {
            inherited = Some(intent.contains(BootIntent::UPDATE));
        }
    }

    let index = chosen?;
    let update = inherited.unwrap_or(false) || intents[index].contains(BootIntent::UPDATE);
    Some(Decision { index, update })
}

/// Move the winner out of `candidates` and release every other candidate.
pub fn select_candidate<F: Firmware>(mut candidates: Candidates<F>) -> Result<ChosenBoot<F>, BootError> {
    let intents: ArrayVec<BootIntent, MAX_CANDIDATES> =
        candidates.iter().map(|c| c.intent()).collect();

    let decision = match decide(&intents) {
        Some(d) => d,
        None => {
            log_critical("select", "no bootable candidate on any volume");
            return Err(BootError::NotFound);
        }
    };

    for (i, c) in candidates.iter().enumerate() {
        log_debug(
            "select",
            &format!(
                "#{} volume #{} at {} {:?}{}",
                i,
                c.index,
                c.requested_at,
                c.intent(),
                if i == decision.index { " <- selected" } else { "" }
            ),
        );
    }

    let chosen = ChosenBoot::adopt(candidates.remove(decision.index), decision.update);
    // The rejected candidates are released here, each exactly once.
    drop(candidates);

    log_info(
        "select",
        &format!(
            "volume #{}: {}{}",
            chosen.index,
            chosen.loader_path,
            if chosen.update_mode() { " (update mode)" } else { "" }
        ),
    );
    Ok(chosen)
}
