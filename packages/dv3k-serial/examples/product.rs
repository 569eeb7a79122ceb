use dv3k_serial::{
    commands::control::{GetProductId, GetVersion, ReadConfig, Reset},
    serial, Connection, ConnectionOptions, SerialError,
};
use log::info;

#[tokio::main]
async fn main() -> Result<(), SerialError> {
    simplelog::TermLogger::init(
        log::LevelFilter::Debug,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Always,
    )
    .unwrap();

    // Either the port given on the command line or the first one we can find
    let device = match std::env::args().nth(1) {
        Some(path) => serial::SerialDevice::new(path),
        None => serial::find_device()?,
    };

    let mut connection = device.connect(ConnectionOptions::default())?;

    connection.execute_command(Reset).await?;
    let product = connection.execute_command(GetProductId).await?;
    let version = connection.execute_command(GetVersion).await?;
    let config = connection.execute_command(ReadConfig).await?;

    info!("Product: {} | Version: {}", product, version);
    info!("Configuration: {:?} (rate index {})", config, config.rate());

    connection.close().await
}
