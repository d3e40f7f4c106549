//! A minimal Venus Plus client: connects to a remote fake GPU, runs the
//! version handshake and physical device enumeration, and prints what it
//! finds. Exercises the driver the same way a real Vulkan application's
//! instance/device setup would, without needing one.

use std::io;

use clap::Parser;
use color_eyre as ey;
use ey::eyre::Context;
use log::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct CommandLineArguments {
    /// Address of the venus_server to connect to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port of the venus_server to connect to
    #[arg(long, default_value_t = 7691)]
    port: u16,

    /// Application name reported in vkCreateInstance
    #[arg(long, default_value = "venus-client")]
    application_name: String,
}

fn setup_logging() -> ey::Result<()> {
    fern::Dispatch::new()
        .format(|out, message, record| out.finish(format_args!("[{}][{}] {}", record.target(), record.level(), message)))
        .level(log::LevelFilter::Info)
        .chain(io::stdout())
        .apply()
        .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;
    Ok(())
}

fn main() -> ey::Result<()> {
    ey::install()?;
    let command_line_arguments = CommandLineArguments::parse();
    setup_logging()?;

    let addr = format!("{}:{}", command_line_arguments.host, command_line_arguments.port);
    let driver = venus_driver::Driver::connect(&addr).wrap_err("Failed to connect to venus_server")?;

    let version = driver.enumerate_instance_version().wrap_err("Failed to enumerate instance version")?;
    info!(
        "remote instance version: {}.{}.{}",
        version >> 22,
        (version >> 12) & 0x3ff,
        version & 0xfff
    );

    let instance = driver
        .create_instance(&command_line_arguments.application_name, &[])
        .wrap_err("Failed to create instance")?;
    let physical_devices = driver
        .enumerate_physical_devices(instance)
        .wrap_err("Failed to enumerate physical devices")?;
    info!("found {} physical device(s)", physical_devices.len());

    for physical_device in &physical_devices {
        let props = driver
            .get_physical_device_properties(*physical_device)
            .wrap_err("Failed to get physical device properties")?;
        info!(
            "physical device: {} (vendor {:#06x}, device {:#06x})",
            props.device_name, props.vendor_id, props.device_id
        );
        let memory_props = driver
            .get_physical_device_memory_properties(*physical_device)
            .wrap_err("Failed to get physical device memory properties")?;
        for (index, heap) in memory_props.memory_heaps.iter().enumerate() {
            info!("  memory heap {}: {} bytes (flags {:#x})", index, heap.size, heap.flags);
        }
    }

    driver.destroy_instance(instance).wrap_err("Failed to destroy instance")?;
    Ok(())
}
