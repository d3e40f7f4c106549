//! Runs the remote half of Venus Plus: binds a TCP listener and answers
//! whatever driver connects to it.

use std::io;

use clap::Parser;
use color_eyre as ey;
use ey::eyre::Context;
use log::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct CommandLineArguments {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(long, default_value_t = 7691)]
    port: u16,
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
    let server = venus_server::Server::bind(&addr).wrap_err("Failed to bind venus_server")?;
    info!("listening on {}", server.local_addr().wrap_err("Failed to read local address")?);
    server.run().wrap_err("Server loop exited with an error")?;
    Ok(())
}
