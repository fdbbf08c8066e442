// Copyright (c) 2026 agrisys
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/agrisys/agrinode-rs

//! agrinode - Agricultural Field Node Simulator and Device Controller
//!
//! Loads a node inventory, connects to the MQTT broker, and drives the
//! simulation/automation controller until interrupted.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tokio::sync::{broadcast, mpsc};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use agrinode::core::Controller;
use agrinode::nodes::NodeRegistry;
use agrinode::streaming::MqttClient;
use agrinode::{Config, VERSION};

/// agrinode - Agricultural Field Node Simulator and Device Controller
#[derive(Parser, Debug)]
#[command(name = "agrinode")]
#[command(author = "agrisys")]
#[command(version = VERSION)]
#[command(about = "Simulates agricultural field nodes and their devices over MQTT")]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Node inventory file (overrides config)
    #[arg(long)]
    data_file: Option<PathBuf>,

    /// MQTT broker address (overrides config and MQTT_BROKER)
    #[arg(long)]
    broker: Option<String>,

    /// MQTT broker port
    #[arg(long)]
    port: Option<u16>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Enable trace-level logging
    #[arg(long)]
    trace: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.trace {
        Level::TRACE
    } else if args.debug {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_ansi(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("agrinode v{} - Agricultural Field Node Simulator", VERSION);

    // Load or create configuration
    let config_path = args.config.unwrap_or_else(Config::default_path);
    let mut config = Config::load_or_create(&config_path)?;

    // Override with environment and command line args
    if let Ok(broker) = std::env::var("MQTT_BROKER") {
        config.streaming.mqtt_broker = broker;
    }
    if let Some(broker) = args.broker {
        config.streaming.mqtt_broker = broker;
    }
    if let Some(port) = args.port {
        config.streaming.mqtt_port = port;
    }
    if let Some(data_file) = args.data_file {
        config.data_file = data_file;
    }

    info!("Configuration loaded from {:?}", config_path);

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(config))
}

async fn run(config: Config) -> Result<()> {
    // Inventory load failure is the one fatal error in the system
    let registry = NodeRegistry::load(&config.data_file)?;

    info!(
        "Connecting to MQTT broker at {}:{}...",
        config.streaming.mqtt_broker, config.streaming.mqtt_port
    );
    let (inbound_tx, inbound_rx) = mpsc::channel(100);
    let mqtt = MqttClient::connect(&config.streaming, inbound_tx);

    let (shutdown_tx, _) = broadcast::channel(1);
    let controller = Controller::new(config, registry, mqtt, inbound_rx);
    let handle = tokio::spawn(controller.run(shutdown_tx.subscribe()));

    info!("Press Ctrl+C to shutdown");
    tokio::signal::ctrl_c().await?;

    info!("Shutdown signal received, disconnecting...");
    let _ = shutdown_tx.send(());
    handle.await?;

    info!("agrinode shutdown complete");
    Ok(())
}
