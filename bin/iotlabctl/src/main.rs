//! ---
//! iotlab_section: "05-networking-external-interfaces"
//! iotlab_subsection: "binary"
//! iotlab_type: "source"
//! iotlab_scope: "code"
//! iotlab_description: "Operator CLI for lab devices and simulated sensors."
//! iotlab_version: "v0.0.0-prealpha"
//! iotlab_owner: "tbd"
//! ---
use anyhow::Result;
use clap::{Parser, Subcommand};
use iotlab_logging as logging;
use iotlab_sensor::SensorReader;

mod device;

#[derive(Debug, Parser)]
#[command(author, version, about = "IoT lab operator utility", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Toggle a device output on and off until interrupted")]
    Toggle(device::ToggleOptions),
    #[command(about = "Send a single `<key>=<1|0>` command")]
    Send(device::SendOptions),
    #[command(about = "Print the simulated reading of a sensor as JSON")]
    Sensor {
        /// Sensor identifier.
        id: String,
    },
}

fn main() -> Result<()> {
    logging::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Toggle(opts) => device::toggle(opts)?,
        Commands::Send(opts) => device::send(opts)?,
        Commands::Sensor { id } => {
            let reading = SensorReader::new().read(&id);
            println!("{}", serde_json::to_string_pretty(&reading)?);
        }
    }
    Ok(())
}
