//! chainload.rs — hand control to the chosen loader
//!
//! BUILD_PATH → LOAD_IMAGE → CLEAR_CMDLINE → INJECT_ARGS → EXECUTE, with
//! cleanup on every exit: the child image (if one was loaded) is unloaded,
//! then the device path built for it is freed. Both are owned values here,
//! so an early `?` return runs the same cleanup as a normal one.
//!
//! A child that returns a non-zero status is logged, not treated as our
//! failure: the stub's job ended when it handed over control.

use alloc::format;
use core::fmt;

use crate::candidate::ChosenBoot;
use crate::error::{status_name, BootError};
use crate::firmware::{ChildExit, Firmware};
use crate::handoff::{decode_ucs2, LoadOptions};
use crate::logger::{log_critical, log_debug, log_info, log_warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    BuildPath,
    LoadImage,
    ClearCmdline,
    InjectArgs,
    Execute,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::BuildPath => "build-path",
            Stage::LoadImage => "load-image",
            Stage::ClearCmdline => "clear-cmdline",
            Stage::InjectArgs => "inject-args",
            Stage::Execute => "execute",
        })
    }
}

/// A loaded child image, unloaded on drop.
struct LoadedChild<'f, F: Firmware> {
    fw: &'f F,
    image: Option<F::Image>,
}

impl<'f, F: Firmware> LoadedChild<'f, F> {
    fn new(fw: &'f F, image: F::Image) -> Self {
        Self { fw, image: Some(image) }
    }

    fn image(&self) -> &F::Image {
        // Only `drop` takes the image out.
        match &self.image {
            Some(image) => image,
            None => unreachable!("child image already unloaded"),
        }
    }
}

impl<F: Firmware> Drop for LoadedChild<'_, F> {
    fn drop(&mut self) {
        if let Some(image) = self.image.take() {
            if let Err(s) = self.fw.unload_image(image) {
                log_warn("chainload", &format!("unload of image failed: {}", status_name(s)));
            }
        }
    }
}

fn abort(stage: Stage, err: BootError) -> BootError {
    log_critical("chainload", &format!("{} failed: {}", stage, err));
    err
}

/// Load and start `boot`'s loader. Returns once the child gives control back.
pub fn chainload<F: Firmware>(fw: &F, boot: &ChosenBoot<F>) -> Result<ChildExit, BootError> {
    let path = fw
        .file_device_path(&boot.device_path, &boot.loader_path)
        .ok_or_else(|| abort(Stage::BuildPath, BootError::InvalidParameter))?;
    log_info("chainload", &format!("loading bootloader @ {}", fw.describe(&path)));

    let image = fw
        .load_image(&path)
        .map_err(|s| abort(Stage::LoadImage, BootError::Load(s)))?;
    // Declared after `path`, so dropped (unloaded) before it is freed.
    let child = LoadedChild::new(fw, image);

    fw.set_load_options(child.image(), &[])
        .map_err(|s| abort(Stage::ClearCmdline, BootError::LoadOptions(s)))?;

    let options = LoadOptions::from_args(boot.args);
    if !options.is_empty() {
        fw.set_load_options(child.image(), options.as_ucs2())
            .map_err(|s| abort(Stage::InjectArgs, BootError::LoadOptions(s)))?;
    }
    log_debug(
        "chainload",
        &format!(
            "load options: \"{}\" ({} bytes)",
            decode_ucs2(options.as_ucs2()),
            options.size_in_bytes()
        ),
    );

    if cfg!(feature = "logging") {
        if let Some(info) = fw.image_info(child.image()) {
            log_debug("chainload", &format!("loaded image: {}", info));
        }
    }

    log_info("chainload", &format!("{}: starting {}", Stage::Execute, boot.loader_path));
    let exit = fw.start_image(child.image());
    if !exit.clean() {
        log_warn(
            "chainload",
            &format!(
                "start image returned with exit code: {}; data @ {:#x} ({} bytes)",
                status_name(exit.status),
                exit.exit_data,
                exit.exit_data_size
            ),
        );
    }

    Ok(exit)
}
