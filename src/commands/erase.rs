//! Erase command implementation

use bluemo_core::flash::{self, DeviceSession};
use std::time::Duration;

use super::create_spinner;

/// Seconds to wait before erasing, to allow an abort
pub const ERASE_COUNTDOWN_SECS: u32 = 3;

/// Run the erase command
pub fn run_erase<S: DeviceSession + ?Sized>(
    session: &mut S,
    probe_size: u32,
    skip_countdown: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if !skip_countdown {
        for remaining in (1..=ERASE_COUNTDOWN_SECS).rev() {
            println!("Erasing all in {} seconds...", remaining);
            std::thread::sleep(Duration::from_secs(1));
        }
    }

    let erased = erase_log(session, probe_size)?;
    println!("Erased {} block(s), device reset", erased);
    Ok(())
}

/// Erase the written part of the data sink region with a spinner
pub fn erase_log<S: DeviceSession + ?Sized>(
    session: &mut S,
    probe_size: u32,
) -> Result<u32, Box<dyn std::error::Error>> {
    let region = flash::describe(session)?;

    let pb = create_spinner(format!(
        "Erasing written blocks from 0x{:08X} (block {} bytes)...",
        region.start(),
        region.block_size()
    ))?;

    let erased = match flash::erase_all(session, &region, probe_size) {
        Ok(n) => n,
        Err(e) => {
            pb.abandon_with_message("Erase failed");
            return Err(e.into());
        }
    };

    pb.finish_with_message(format!("Erased {} block(s)", erased));
    Ok(erased)
}
