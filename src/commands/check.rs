//! Check and time commands

use bluemo_core::flash::DeviceSession;
use bluemo_yasp::{Transport, YaspClient};

/// Print the data sink configuration (how far logging has progressed)
pub fn run_check<S: DeviceSession + ?Sized>(
    session: &mut S,
) -> Result<(), Box<dyn std::error::Error>> {
    let sink = session.data_sink_config()?;
    let used = sink.write_address.saturating_sub(sink.start_address);

    println!("Data sink start:  0x{:08X}", sink.start_address);
    println!("Data sink write:  0x{:08X}", sink.write_address);
    println!("Logged:           {} bytes ({} KiB)", used, used / 1024);
    Ok(())
}

/// Print the device time
pub fn run_time<T: Transport>(
    client: &mut YaspClient<T>,
) -> Result<(), Box<dyn std::error::Error>> {
    let ts = client.rtc_sync()?;
    println!("Device Time: {:.6} s ({} ticks)", ts.seconds(), ts.ticks);
    Ok(())
}
