//! NØNOS Chainloader entry point.
//!
//! Resolve a slot, chainload its loader, and come back with whatever status
//! the child returned. A failure of our own is shown on the console for a few
//! seconds before its status goes back to firmware.

#![cfg_attr(target_os = "uefi", no_std)]
#![cfg_attr(target_os = "uefi", no_main)]

#[cfg(target_os = "uefi")]
mod ui;

#[cfg(target_os = "uefi")]
mod efi {
    extern crate alloc;

    use alloc::format;

    use nonos_chainloader::chainload::chainload;
    use nonos_chainloader::firmware::uefi::UefiFirmware;
    use nonos_chainloader::logger::{self, log_info};
    use nonos_chainloader::{resolve, BootError};
    use uefi::prelude::*;

    /// How long a failure stays on screen.
    const FAILURE_STALL_US: usize = 3_000_000;

    #[entry]
    fn efi_main(image: Handle, mut system_table: SystemTable<Boot>) -> Status {
        if uefi_services::init(&mut system_table).is_err() {
            return Status::LOAD_ERROR;
        }
        logger::init();
        crate::ui::draw_boot_banner(system_table.stdout());

        match run(image, &system_table) {
            Ok(child) => Status(child.as_usize()),
            Err(err) => {
                crate::ui::display_failure(system_table.stdout(), &err);
                system_table.boot_services().stall(FAILURE_STALL_US);
                Status(err.status().as_usize())
            }
        }
    }

    fn run(image: Handle, st: &SystemTable<Boot>) -> Result<r_efi::efi::Status, BootError> {
        let fw = UefiFirmware::new(image, st);
        if let Some(at) = fw.self_location() {
            log_info("boot", &format!("within chainloader @ {}", at));
        }

        let chosen = resolve(&fw)?;
        let exit = chainload(&fw, &chosen)?;
        Ok(exit.status)
    }
}

#[cfg(not(target_os = "uefi"))]
fn main() {
    eprintln!("nonos_chainloader is a UEFI application; build it for x86_64-unknown-uefi");
    std::process::exit(1);
}
