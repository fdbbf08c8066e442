// Copyright (c) 2026 agrisys
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/agrisys/agrinode-rs

//! agrinode - Agricultural Field Node Simulator and Device Controller
//!
//! Simulates a fleet of agricultural field nodes over MQTT:
//! - Bounded random-walk sensor drift with a day/night light cycle
//! - Threshold-driven auto-activation of watering and humidity devices
//! - Timeout-bounded auto-shutoff sweeps
//! - Device and control commands applied from the bus
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────┐
//! │                     Controller                        │
//! ├───────────────────────────────────────────────────────┤
//! │  ┌───────────┐   ┌────────────┐   ┌───────────────┐   │
//! │  │ Sensor    │ → │ Automation │ → │ MQTT          │   │
//! │  │ Simulator │   │ Engine     │   │ Streaming     │   │
//! │  └───────────┘   └────────────┘   └───────────────┘   │
//! │        ↓               ↓                 ↑            │
//! │  ┌───────────────────────────────┐  ┌──────────┐      │
//! │  │         Node Registry         │ ←│ Commands │      │
//! │  └───────────────────────────────┘  └──────────┘      │
//! └───────────────────────────────────────────────────────┘
//! ```

pub mod commands;
pub mod config;
pub mod core;
pub mod nodes;
pub mod simulation;
pub mod streaming;

// Re-exports for convenience
pub use commands::CommandProcessor;
pub use config::Config;
pub use core::{AutomationEngine, Controller};
pub use nodes::{Node, NodeRegistry};
pub use simulation::SensorSimulator;
pub use streaming::MqttClient;

/// agrinode version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// agrinode name
pub const NAME: &str = "agrinode";
