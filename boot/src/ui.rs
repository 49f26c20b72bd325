//! NØNOS Chainloader console - banner and fault block on the firmware TextOutput.
//!
//! Everything here is best effort: a console that refuses a color or a string
//! must never stop the boot, so write errors are discarded.

use core::fmt::Write;

use nonos_chainloader::{status_name, BootError};
use uefi::proto::console::text::{Color, Output};

/// Render the stage-0 splash.
pub fn draw_boot_banner(out: &mut Output) {
    let _ = out.set_color(Color::LightCyan, Color::Black);
    let _ = out.clear();

    let banner = [
        "\r\n",
        "              ╔═════════════════════════════════════════════════════════════╗\r\n",
        "              ║                 NØNOS :: STAGE-0 CHAINLOADER                ║\r\n",
        "              ║        --- A/B slot resolution, single loader hand-off ---  ║\r\n",
        "              ╚═════════════════════════════════════════════════════════════╝\r\n",
        "\r\n",
    ];
    for line in banner {
        let _ = out.write_str(line);
    }

    let _ = out.set_color(Color::LightGray, Color::Black);
    let _ = out.write_str("     [✓] scanning volumes for bootconf\r\n");
    let _ = out.set_color(Color::White, Color::Black);
}

/// Red failure block naming the error and its firmware status.
pub fn display_failure(out: &mut Output, err: &BootError) {
    let _ = out.set_color(Color::Red, Color::Black);
    let _ = out.write_str("\r\n──────────────────── BOOT FAILURE ────────────────────\r\n");
    let _ = write!(out, "[!]: {}\r\n", err);
    let _ = write!(out, "[!]: status {}\r\n", status_name(err.status()));
    let _ = out.write_str("──────────────────────────────────────────────────────\r\n");
    let _ = out.set_color(Color::White, Color::Black);
}
