//! Collect command implementation

use bluemo_yasp::{
    AdsDataRate, AdsInputMux, AdsPga, AdsStreamParams, Command, DataSink, MsgCode, Transport,
    YaspClient,
};

/// Analog stream logged during collection: 16 samples per message,
/// custom period 10, ±0.256 V range
pub const COLLECT_STREAM: AdsStreamParams = AdsStreamParams {
    instance: 0,
    pga: AdsPga::Fsr0p256,
    data_rate: AdsDataRate::CustomPeriod,
    input_mux: AdsInputMux::Ain0Ain1,
    custom_period: 10,
    watermark: 16,
};

/// Route syncs and analog samples to flash, then start logging
///
/// The sync and stream commands are posted without waiting: with their
/// class routed to flash, the answers land in the log rather than on the
/// link.
pub fn run_collect<T: Transport>(
    client: &mut YaspClient<T>,
) -> Result<(), Box<dyn std::error::Error>> {
    for code in [MsgCode::RtcSync, MsgCode::AdsAnalogStream] {
        let rsp = client.data_sink_control(code, DataSink::SpiFlash)?;
        println!("{:?}", rsp);
    }

    client.post_command(&Command::RtcSync)?;
    client.post_command(&Command::AdsAnalogStream(COLLECT_STREAM))?;

    println!(
        "Collection started ({} samples per batch, period {})",
        COLLECT_STREAM.watermark, COLLECT_STREAM.custom_period
    );
    Ok(())
}
