//! Command-line interface for the robo arm.
//!
//! Each invocation opens the arm, sends one command, checks the reply and
//! closes the arm again. The exit status is non-zero when the arm is not
//! attached, an argument is out of range or the reply does not match.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;
use tracing_subscriber::filter::LevelFilter;

use roboarm::tracing::{self, prelude::*};
use roboarm::{transport, Config, Direction, RoboArm};

#[derive(Parser, Debug)]
#[command(name = "roboarm")]
#[command(about = "Control a robotic arm over its USB serial bridge", long_about = None)]
#[command(version)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// USB serial number of the bridge (overrides configuration)
    #[arg(short, long, global = true)]
    serial: Option<String>,

    /// Delay between sending a command and reading the reply, in milliseconds
    #[arg(long, global = true)]
    settle_ms: Option<u64>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Log sent and received lines
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List attached USB serial devices
    Ports,

    /// Check whether the arm answers
    Hw,

    /// Read the step counter
    Position,

    /// Read both joint angles
    Angles,

    /// Move a number of steps
    Step {
        /// up or down
        direction: Direction,
        /// 1 to 100
        steps: i32,
    },

    /// Start cyclic movement
    Start {
        /// 1 to 100
        speed: i32,
    },

    /// Stop cyclic movement
    Stop,

    /// Set both joint angles
    SetAngles {
        /// 0 to 90 degrees
        up: i32,
        /// 0 to 90 degrees
        down: i32,
    },

    /// Run the arm's calibration routine
    Calibrate,

    /// Move a number of steps at a given speed
    Move {
        /// up or down
        direction: Direction,
        /// 1 to 100
        speed: i32,
        /// 1 to 100
        steps: i32,
    },
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(serial) = &cli.serial {
        config.device.serial_number = serial.clone();
    }
    if let Some(settle_ms) = cli.settle_ms {
        config.device.settle_delay_ms = settle_ms;
    }
    Ok(config)
}

fn print_ports(json_output: bool) -> Result<()> {
    let devices = transport::available_devices()?;
    if json_output {
        println!("{}", serde_json::to_string_pretty(&devices)?);
        return Ok(());
    }
    if devices.is_empty() {
        println!("No USB serial devices found.");
    }
    for device in devices {
        println!(
            "{}  {:04x}:{:04x}  serial={}  {}",
            device.port_name,
            device.vid,
            device.pid,
            device.serial_number.as_deref().unwrap_or("-"),
            device.product.as_deref().unwrap_or(""),
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    tracing::init_journald_or_stdout(level);

    if let Commands::Ports = cli.command {
        return print_ports(cli.json);
    }

    let config = load_config(&cli)?;
    let mut arm = RoboArm::connect(&config)
        .with_context(|| format!("opening robo arm {}", config.device.serial_number))?;
    debug!(command = ?cli.command, "Connected");

    match cli.command {
        // Listed without opening the arm
        Commands::Ports => {}
        Commands::Hw => {
            let responding = arm.is_responding().await;
            if cli.json {
                println!("{}", json!({ "responding": responding }));
            } else {
                println!("{}", if responding { "responding" } else { "not responding" });
            }
            if !responding {
                bail!("robo arm is not responding");
            }
        }
        Commands::Position => {
            let position = arm.position().await?;
            if cli.json {
                println!("{}", json!({ "position": position }));
            } else {
                println!("{}", position);
            }
        }
        Commands::Angles => {
            let angles = arm.angles().await?;
            if cli.json {
                println!("{}", serde_json::to_string(&angles)?);
            } else {
                println!("up={} down={}", angles.up, angles.down);
            }
        }
        Commands::Step { direction, steps } => arm.step(direction, steps).await?,
        Commands::Start { speed } => arm.start_cyclic_movement(speed).await?,
        Commands::Stop => arm.stop_cyclic_movement().await?,
        Commands::SetAngles { up, down } => arm.set_angles(up, down).await?,
        Commands::Calibrate => arm.calibrate().await?,
        Commands::Move {
            direction,
            speed,
            steps,
        } => arm.continuous_movement(direction, speed, steps).await?,
    }

    Ok(())
}
