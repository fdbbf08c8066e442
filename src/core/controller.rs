// Copyright (c) 2026 agrisys
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/agrisys/agrinode-rs

//! Controller loop - drives simulation and sweep timers, applies commands
//!
//! The controller is the sole owner of the node registry. Every periodic
//! pass and every inbound command runs to completion on this task before the
//! next unit of work starts, so no mutation ever interleaves with another.

use chrono::{Local, Utc};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval_at, Duration, Instant};
use tracing::{error, info, warn};

use crate::commands::{CommandProcessor, ControlCommand, DeviceCommand, Route};
use crate::config::Config;
use crate::nodes::NodeRegistry;
use crate::simulation::SensorSimulator;
use crate::streaming::{topics, InboundMessage, MqttClient};

use super::AutomationEngine;

/// Which status surface an applied command invalidated
enum Applied {
    Device(String),
    Control(String),
}

/// Owns the registry and serializes all work against it
pub struct Controller {
    config: Config,
    registry: NodeRegistry,
    simulator: SensorSimulator,
    engine: AutomationEngine,
    mqtt: MqttClient,
    inbound_rx: mpsc::Receiver<InboundMessage>,
}

impl Controller {
    pub fn new(
        config: Config,
        registry: NodeRegistry,
        mqtt: MqttClient,
        inbound_rx: mpsc::Receiver<InboundMessage>,
    ) -> Self {
        Self {
            config,
            registry,
            simulator: SensorSimulator::new(),
            engine: AutomationEngine::new(),
            mqtt,
            inbound_rx,
        }
    }

    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        let prefix = self.config.streaming.topic_prefix.clone();

        for filter in [
            topics::device_command_filter(&prefix),
            topics::control_command_filter(&prefix),
        ] {
            if let Err(e) = self.mqtt.subscribe(&filter).await {
                error!("Error subscribing to {}: {}", filter, e);
            }
        }

        self.publish_snapshot().await;

        let sim_period = Duration::from_secs(self.config.simulation.tick_interval_secs);
        let sweep_period = Duration::from_secs(self.config.simulation.sweep_interval_secs);
        let mut sim_interval = interval_at(Instant::now() + sim_period, sim_period);
        let mut sweep_interval = interval_at(Instant::now() + sweep_period, sweep_period);

        info!("Controller running over {} nodes", self.registry.len());

        loop {
            tokio::select! {
                Some(message) = self.inbound_rx.recv() => {
                    self.handle_message(message).await;
                }
                _ = sim_interval.tick() => {
                    self.simulation_pass().await;
                }
                _ = sweep_interval.tick() => {
                    self.sweep_pass().await;
                }
                _ = shutdown.recv() => {
                    info!("Controller shutting down...");
                    break;
                }
            }
        }

        if let Err(e) = self.mqtt.disconnect().await {
            warn!("Error disconnecting from MQTT broker: {}", e);
        }
    }

    /// Apply one inbound message and publish the status surface it touched.
    /// Failures of any kind are logged and dropped without mutation.
    async fn handle_message(&mut self, message: InboundMessage) {
        let prefix = self.config.streaming.topic_prefix.clone();

        let applied = crate::commands::route(&prefix, &message.topic).and_then(|route| {
            match route {
                Route::Device(node_id) => {
                    let command: DeviceCommand = serde_json::from_slice(&message.payload)?;
                    info!("Received device command for node {}: {:?}", node_id, command);
                    CommandProcessor::apply_device_command(
                        &mut self.registry,
                        &node_id,
                        &command,
                        Utc::now(),
                    )?;
                    Ok(Applied::Device(node_id))
                }
                Route::Control(node_id) => {
                    let command: ControlCommand = serde_json::from_slice(&message.payload)?;
                    info!("Received control command for node {}: {:?}", node_id, command);
                    CommandProcessor::apply_control_command(&mut self.registry, &node_id, &command)?;
                    Ok(Applied::Control(node_id))
                }
            }
        });

        match applied {
            Ok(Applied::Device(node_id)) => self.publish_device_status(&node_id).await,
            Ok(Applied::Control(node_id)) => self.publish_control_status(&node_id).await,
            Err(e) => error!("Error processing message on {}: {}", message.topic, e),
        }
    }

    /// Advance every online node's sensors, re-evaluate its auto devices,
    /// and publish: sensor data unconditionally, device status on change.
    async fn simulation_pass(&mut self) {
        let now = Local::now();
        let now_utc = now.with_timezone(&Utc);
        let prefix = self.config.streaming.topic_prefix.clone();

        let mut outbound = Vec::new();
        for node in self.registry.iter_mut() {
            if !self.simulator.tick(node, now) {
                continue;
            }
            let devices_changed = self.engine.evaluate(node, now_utc);

            if let Some(payload) = encode(&node.id, "sensor data", &node.sensors) {
                outbound.push((topics::sensor_data(&prefix, &node.id), payload));
            }
            if devices_changed {
                if let Some(payload) = encode(&node.id, "device status", &node.devices) {
                    outbound.push((topics::device_status(&prefix, &node.id), payload));
                }
            }
        }

        self.send_all(outbound).await;
    }

    /// Enforce runtime ceilings; publish device status only for nodes where
    /// a device was forced off.
    async fn sweep_pass(&mut self) {
        let now = Utc::now();
        let prefix = self.config.streaming.topic_prefix.clone();

        let mut outbound = Vec::new();
        for node in self.registry.iter_mut() {
            if self.engine.sweep_node(node, now) {
                if let Some(payload) = encode(&node.id, "device status", &node.devices) {
                    outbound.push((topics::device_status(&prefix, &node.id), payload));
                }
            }
        }

        self.send_all(outbound).await;
    }

    /// One-time startup snapshot: sensors, device status, and controls for
    /// every node, so subscribers have a baseline before the first tick.
    async fn publish_snapshot(&self) {
        let prefix = &self.config.streaming.topic_prefix;

        let mut outbound = Vec::new();
        for node in self.registry.iter() {
            if let Some(payload) = encode(&node.id, "sensor data", &node.sensors) {
                outbound.push((topics::sensor_data(prefix, &node.id), payload));
            }
            if let Some(payload) = encode(&node.id, "device status", &node.devices) {
                outbound.push((topics::device_status(prefix, &node.id), payload));
            }
            if let Some(payload) = encode(&node.id, "control status", &node.controls) {
                outbound.push((topics::control_status(prefix, &node.id), payload));
            }
        }

        self.send_all(outbound).await;
        info!("Published initial snapshot for {} nodes", self.registry.len());
    }

    async fn publish_device_status(&self, node_id: &str) {
        let Some(node) = self.registry.get(node_id) else {
            return;
        };
        let topic = topics::device_status(&self.config.streaming.topic_prefix, node_id);
        if let Err(e) = self.mqtt.publish(&topic, &node.devices).await {
            warn!("Error publishing device status for node {}: {}", node_id, e);
        }
    }

    async fn publish_control_status(&self, node_id: &str) {
        let Some(node) = self.registry.get(node_id) else {
            return;
        };
        let topic = topics::control_status(&self.config.streaming.topic_prefix, node_id);
        if let Err(e) = self.mqtt.publish(&topic, &node.controls).await {
            warn!("Error publishing control status for node {}: {}", node_id, e);
        }
    }

    async fn send_all(&self, outbound: Vec<(String, Vec<u8>)>) {
        for (topic, payload) in outbound {
            if let Err(e) = self.mqtt.publish_raw(&topic, payload).await {
                warn!("Error publishing to {}: {}", topic, e);
            }
        }
    }
}

fn encode<T: Serialize>(node_id: &str, what: &str, value: &T) -> Option<Vec<u8>> {
    match serde_json::to_vec(value) {
        Ok(payload) => Some(payload),
        Err(e) => {
            warn!("Error encoding {} for node {}: {}", what, node_id, e);
            None
        }
    }
}
