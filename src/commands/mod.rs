//! CLI command implementations
//!
//! Live commands (`collect`, `download`, `erase`, `check`, `time`) talk to
//! the device through a [`YaspClient`]. The paging steps are generic over
//! [`DeviceSession`](bluemo_core::flash::DeviceSession) so they run against
//! the in-memory dummy device in tests. `decode` works offline on an image
//! file.

mod check;
mod collect;
mod decode;
mod download;
mod erase;

pub use check::{run_check, run_time};
pub use collect::run_collect;
pub use decode::run_decode;
pub use download::run_download;
pub use erase::run_erase;

use bluemo_yasp::{Transport, YaspClient};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::config::DeviceSettings;

/// Client over whichever transport the connection string selected
pub type Client = YaspClient<Box<dyn Transport>>;

/// Open the device link and speed up the connection interval
pub fn connect(settings: &DeviceSettings) -> Result<Client, Box<dyn std::error::Error>> {
    let mut client = bluemo_yasp::open_client(&settings.port)?;

    let rsp = client.conn_param_update(settings.conn_handle, settings.conn_interval_max)?;
    println!("{:?}", rsp);

    Ok(client)
}

/// Create a byte progress bar with a phase message
fn create_progress_bar(total: u64, phase: &str) -> Result<ProgressBar, Box<dyn std::error::Error>> {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{bytes}}/{{total_bytes}} ({{bytes_per_sec}}, {{eta}}) {}",
                phase
            ))?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

/// Create a spinner with a message
fn create_spinner(message: String) -> Result<ProgressBar, Box<dyn std::error::Error>> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}
