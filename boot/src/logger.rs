//! Component-tagged logging for the chainloader.
//!
//! Call sites name the component ("collect", "chainload", ...) and the
//! message; the component becomes the `log` target. On firmware the sink is
//! the console logger installed by `uefi-services`; on the host nothing is
//! installed and the calls are no-ops.

use log::{Level, LevelFilter};

/// Highest level the stub emits for this build.
pub const fn max_level() -> LevelFilter {
    if cfg!(feature = "logging") {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

/// Apply [`max_level`] to the global logger.
pub fn init() {
    log::set_max_level(max_level());
}

#[inline]
fn emit(level: Level, component: &str, msg: &str) {
    log::log!(target: component, level, "[{}] {}", component, msg);
}

pub fn log_info(component: &str, msg: &str) {
    emit(Level::Info, component, msg);
}

pub fn log_warn(component: &str, msg: &str) {
    emit(Level::Warn, component, msg);
}

/// Unrecoverable for the current boot attempt.
pub fn log_critical(component: &str, msg: &str) {
    emit(Level::Error, component, msg);
}

pub fn log_debug(component: &str, msg: &str) {
    emit(Level::Debug, component, msg);
}
