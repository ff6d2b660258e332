//! Download command implementation

use bluemo_core::flash::{self, DeviceSession};
use bluemo_yasp::{
    AdsDataRate, AdsStreamParams, Command, DataSink, MsgCode, Transport, YaspClient,
};
use std::fs::File;
use std::io::Write;
use std::path::Path;

use super::create_progress_bar;

/// Stop logging syncs, mark the end of the log and download it
pub fn run_download<T: Transport>(
    client: &mut YaspClient<T>,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let rsp = client.data_sink_control(MsgCode::RtcSync, DataSink::Ble)?;
    println!("{:?}", rsp);
    println!("Device Time: {:.6}", client.rtc_sync()?.seconds());

    client.post_command(&Command::RtcSync)?;
    client.post_command(&Command::AdsAnalogStream(AdsStreamParams {
        data_rate: AdsDataRate::SingleSample,
        ..AdsStreamParams::default()
    }))?;

    download_image(client, output)?;
    Ok(())
}

/// Scan the data sink region into `output`
///
/// Pages are written as they arrive, so a failed scan leaves the pages
/// read so far on disk. Returns the image size in bytes.
pub fn download_image<S: DeviceSession + ?Sized>(
    session: &mut S,
    output: &Path,
) -> Result<u64, Box<dyn std::error::Error>> {
    let region = flash::describe(session)?;
    println!(
        "Data region: 0x{:08X} - 0x{:08X} ({} pages of {} bytes)",
        region.start(),
        region.end(),
        region.page_count(),
        region.page_size()
    );

    let mut file = File::create(output)?;
    let pb = create_progress_bar(region.span() as u64, "Reading")?;

    let total = flash::scan(session, &region, |page| {
        file.write_all(&page.bytes)?;
        pb.inc(page.bytes.len() as u64);
        Ok(())
    })?;
    file.flush()?;

    pb.finish_with_message("Read complete");
    println!("Wrote {} bytes to {:?}", total, output);

    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bluemo_dummy::{DummyConfig, DummyDevice};

    fn config() -> DummyConfig {
        DummyConfig {
            start_address: 0x1000,
            flash_size_kib: 5,
            block_size: 0x100,
            page_size: 0x100,
        }
    }

    #[test]
    fn test_download_stops_at_blank_page() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nvm_data.dat");
        let mut device = DummyDevice::with_data(config(), &[0x5A; 0x1F0]);

        let total = download_image(&mut device, &path).unwrap();
        assert_eq!(total, 0x200);

        let image = std::fs::read(&path).unwrap();
        assert_eq!(image.len(), 0x200);
        assert_eq!(&image[..0x1F0], &[0x5A; 0x1F0][..]);
    }

    #[test]
    fn test_download_failure_keeps_partial_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nvm_data.dat");
        let mut device = DummyDevice::with_data(config(), &[0x00; 0x300]);
        device.fail_read_at(0x1200);

        assert!(download_image(&mut device, &path).is_err());
        assert_eq!(std::fs::read(&path).unwrap().len(), 0x200);
    }

    #[test]
    fn test_download_empty_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nvm_data.dat");
        let mut device = DummyDevice::new(config());

        assert_eq!(download_image(&mut device, &path).unwrap(), 0);
        assert!(std::fs::read(&path).unwrap().is_empty());
    }
}
