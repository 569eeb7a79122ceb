use dv3k_serial::{serial, SerialError};
use log::info;

fn main() -> Result<(), SerialError> {
    simplelog::TermLogger::init(
        log::LevelFilter::Debug,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Always,
    )
    .unwrap();

    for device in serial::find_devices()? {
        info!("{} {:?}", device.port_name(), device.usb_info());
    }

    Ok(())
}
