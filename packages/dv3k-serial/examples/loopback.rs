use std::f32::consts::TAU;

use dv3k_serial::{
    commands::{
        vocoder::{DecodeChannel, EncodeSpeech},
        Configure, Rate,
    },
    protocol::SAMPLES_PER_FRAME,
    serial, Connection, ConnectionOptions, SerialError,
};
use log::info;

const SAMPLE_RATE: f32 = 8000.0;
const FRAMES: usize = 50;

#[tokio::main]
async fn main() -> Result<(), SerialError> {
    simplelog::TermLogger::init(
        log::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Always,
    )
    .unwrap();

    let mut connection = serial::find_device()?.connect(ConnectionOptions::default())?;
    connection.execute_command(Configure::new(Rate::DMR)).await?;

    // One second of a 1 kHz tone through the encoder and back out of the decoder
    let mut phase = 0usize;
    for frame in 0..FRAMES {
        let mut samples = [0i16; SAMPLES_PER_FRAME];
        for sample in samples.iter_mut() {
            *sample = ((phase as f32 * TAU * 1000.0 / SAMPLE_RATE).sin() * 8000.0) as i16;
            phase += 1;
        }

        let encoded = connection.execute_command(EncodeSpeech { samples }).await?;
        let decoded = connection
            .execute_command(DecodeChannel::new(encoded.bits.clone()))
            .await?;

        let peak = decoded
            .speech
            .samples()
            .iter()
            .map(|s| s.unsigned_abs())
            .max()
            .unwrap_or(0);
        info!(
            "frame {}: {:02x?} -> peak {}",
            frame,
            encoded.bits.as_bytes(),
            peak
        );
    }

    connection.close().await
}
