//! collect.rs — candidate discovery across firmware volumes
//!
//! Walks every simple-file-system handle in firmware order, mounts it, reads
//! its bootconf and resolves a loader that passes [`verify::validate`]. Each
//! volume is mounted only for the duration of its own probe, so at most one
//! volume is mounted at a time and none is left mounted afterwards.
//!
//! Nothing here is fatal: a volume that cannot be used is logged and skipped.

use alloc::format;
use alloc::string::{String, ToString};

use arrayvec::ArrayVec;

use crate::bootconf::{BootConf, BootIntent, BOOTCONF_MAX_SIZE, BOOTCONF_PATH};
use crate::candidate::{BootCandidate, MAX_CANDIDATES};
use crate::error::{status_name, BootError};
use crate::firmware::{Directory, Firmware};
use crate::logger::{log_debug, log_info, log_warn};
use crate::verify;

/// Loader run when a bootconf does not name (a usable) one.
pub const DEFAULT_LOADER: &str = "\\EFI\\nonos\\grubx64.efi";

/// Candidates in discovery order.
pub type Candidates<F> = ArrayVec<BootCandidate<F>, MAX_CANDIDATES>;

/// Probe every volume, up to [`MAX_CANDIDATES`] usable ones.
pub fn collect_candidates<F: Firmware>(fw: &F) -> Result<Candidates<F>, BootError> {
    let mut candidates = Candidates::<F>::new();

    let volumes = match fw.volumes() {
        Ok(v) => v,
        Err(s) => {
            log_warn("collect", &format!("no file system handles: {}", status_name(s)));
            return Ok(candidates);
        }
    };

    for (index, &volume) in volumes.iter().enumerate() {
        if candidates.is_full() {
            log_warn(
                "collect",
                &format!(
                    "candidate limit ({}) reached, {} volume(s) not scanned",
                    MAX_CANDIDATES,
                    volumes.len() - index
                ),
            );
            break;
        }

        if let Some(candidate) = probe_volume(fw, index, volume) {
            log_info(
                "collect",
                &format!(
                    "volume #{}: candidate {} (requested-at {})",
                    index, candidate.loader_path, candidate.requested_at
                ),
            );
            candidates.push(candidate);
        }
    }

    log_info("collect", &format!("{} candidate(s) found", candidates.len()));
    Ok(candidates)
}

/// Turn one volume into a candidate, or explain why not.
fn probe_volume<F: Firmware>(fw: &F, index: usize, volume: F::Volume) -> Option<BootCandidate<F>> {
    // Dropped (unmounted) on every return from here.
    let mut root = match fw.mount(volume) {
        Ok(root) => root,
        Err(s) => {
            log_warn("collect", &format!("volume #{}: not mounted: {}", index, status_name(s)));
            return None;
        }
    };

    let device_path = match fw.device_path(volume) {
        Ok(dp) => dp,
        Err(s) => {
            log_warn("collect", &format!("volume #{}: no device path: {}", index, status_name(s)));
            return None;
        }
    };

    if !root.exists(BOOTCONF_PATH) {
        return None;
    }

    let conf = match root
        .read_all(BOOTCONF_PATH, BOOTCONF_MAX_SIZE)
        .map_err(BootError::Io)
        .and_then(|raw| BootConf::parse(&raw))
    {
        Ok(conf) => conf,
        Err(e) => {
            log_warn("collect", &format!("volume #{}: {}: {}", index, BOOTCONF_PATH, e));
            return None;
        }
    };

    if conf.intent().contains(BootIntent::IMAGE_INVALID) {
        log_info("collect", &format!("volume #{}: image marked invalid, skipped", index));
        return None;
    }

    let loader_path = match resolve_loader(&mut root, &conf, index) {
        Some(path) => path,
        None => {
            log_warn("collect", &format!("volume #{}: no valid loader", index));
            return None;
        }
    };

    let requested_at = conf.requested_at();
    Some(BootCandidate {
        index,
        volume,
        device_path,
        loader_path,
        conf,
        requested_at,
    })
}

/// The bootconf's `loader` if it exists and validates, else the default.
fn resolve_loader<D: Directory>(root: &mut D, conf: &BootConf, index: usize) -> Option<String> {
    if let Some(alt) = conf.loader() {
        if try_loader(root, &alt, index) {
            return Some(alt);
        }
        log_debug("collect", &format!("volume #{}: falling back to {}", index, DEFAULT_LOADER));
    }

    if try_loader(root, DEFAULT_LOADER, index) {
        return Some(DEFAULT_LOADER.to_string());
    }
    None
}

fn try_loader<D: Directory>(root: &mut D, path: &str, index: usize) -> bool {
    if !root.exists(path) {
        log_debug("collect", &format!("volume #{}: {} not present", index, path));
        return false;
    }
    match verify::validate(root, path) {
        Ok(()) => true,
        Err(e) => {
            log_warn(
                "collect",
                &format!(
                    "volume #{}: {} rejected: {} ({})",
                    index,
                    path,
                    e,
                    status_name(e.status())
                ),
            );
            false
        }
    }
}
