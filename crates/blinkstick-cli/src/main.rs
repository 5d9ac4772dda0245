//! BlinkStick Control Tool
//!
//! CLI for listing BlinkSticks and sending a single color or animation.

use anyhow::{bail, Result};
use blinkstick_hw::{DeviceFinder, HidFinder};
use blinkstick_node::{spawn_node, Color, Message, NodeConfig, Task, TracingLog};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
enum CliTask {
    /// Set the color immediately
    #[default]
    Set,
    /// Fade to the color and back to black
    Pulse,
    /// Fade to the color
    Morph,
    /// Flash the color on and off
    Blink,
}

impl From<CliTask> for Task {
    fn from(task: CliTask) -> Self {
        match task {
            CliTask::Set => Task::Set,
            CliTask::Pulse => Task::Pulse,
            CliTask::Morph => Task::Morph,
            CliTask::Blink => Task::Blink,
        }
    }
}

#[derive(Parser)]
#[command(name = "blinkstickctl")]
#[command(about = "Control tool for BlinkStick devices")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List connected BlinkSticks
    List,
    /// Send one payload and wait for the animation to finish
    Send {
        /// Color name, hex code, "random", or "r,g,b"
        payload: String,

        /// Serial number of the target device (default: first found)
        #[arg(long)]
        serial: Option<String>,

        /// Animation to run
        #[arg(long, default_value = "set", value_enum)]
        task: CliTask,

        /// Pulse/morph duration in milliseconds
        #[arg(long, default_value_t = 1000)]
        duration: u64,

        /// Pulse/morph steps
        #[arg(long, default_value_t = 50)]
        steps: u32,

        /// Blink repeats
        #[arg(long, default_value_t = 1)]
        repeats: u32,

        /// Blink delay in milliseconds
        #[arg(long, default_value_t = 500)]
        delay: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::List => handle_list(),
        Commands::Send {
            payload,
            serial,
            task,
            duration,
            steps,
            repeats,
            delay,
        } => {
            let config = NodeConfig {
                name: "blinkstickctl".to_string(),
                serial,
                task: task.into(),
                duration,
                steps,
                repeats,
                delay,
                ..Default::default()
            };
            handle_send(config, payload).await
        }
    }
}

fn handle_list() -> Result<()> {
    let devices = HidFinder::new().find_all();
    if devices.is_empty() {
        println!("No BlinkStick found");
        return Ok(());
    }

    for device in devices {
        println!(
            "{}\t{}\t{}",
            device.serial,
            device.product.as_deref().unwrap_or("BlinkStick"),
            device.path
        );
    }
    Ok(())
}

async fn handle_send(config: NodeConfig, payload: String) -> Result<()> {
    let task = config.task;
    let color = send(config, payload, Box::new(HidFinder::new())).await?;
    println!("{} done: {}", task, color);
    Ok(())
}

/// Runs one payload through a local node and reports how it ended.
async fn send(
    config: NodeConfig,
    payload: String,
    finder: Box<dyn DeviceFinder>,
) -> Result<Color> {
    let node = spawn_node(
        config.clone(),
        finder,
        Box::new(TracingLog::new(config.name.clone())),
    );

    let handled = node.status().handled;
    node.input(Message::new(Value::String(payload)))?;
    let status = node.settled(handled).await?;
    debug!("Node settled: {:?}", status);

    let handled = status.handled;
    node.close();
    node.settled(handled).await?;

    if let Some(error) = status.last_error {
        bail!(error);
    }
    match status.last_color {
        Some(color) => Ok(color),
        None => bail!("Nothing was sent to the BlinkStick"),
    }
}
