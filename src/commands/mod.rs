// Copyright (c) 2026 agrisys
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/agrisys/agrinode-rs

//! Inbound command processing - payload types, topic routing, and application

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::nodes::{ControlSettings, DeviceMode, NodeRegistry};

/// Device command payload (`nodes/{id}/device/command`)
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceCommand {
    pub device: String,
    #[serde(default)]
    pub state: Option<bool>,
    #[serde(default)]
    pub mode: Option<DeviceMode>,
}

/// Generic control command payload (`nodes/{id}/command`)
#[derive(Debug, Clone, Deserialize)]
pub struct ControlCommand {
    pub control: String,
    pub value: ControlSettings,
}

/// Errors raised while handling an inbound message. All of them are logged
/// and dropped without mutating any node state.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("unknown node '{0}'")]
    UnknownNode(String),

    #[error("unknown device '{device}' on node '{node}'")]
    UnknownDevice { node: String, device: String },

    #[error("malformed payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),

    #[error("unroutable topic '{0}'")]
    UnroutableTopic(String),
}

/// Where an inbound message is headed, with the node id lifted out of the
/// topic path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// `{prefix}/nodes/{id}/device/command`
    Device(String),
    /// `{prefix}/nodes/{id}/command`
    Control(String),
}

/// Resolve a subscription topic to its command route.
pub fn route(prefix: &str, topic: &str) -> Result<Route, CommandError> {
    let unroutable = || CommandError::UnroutableTopic(topic.to_string());

    let rest = topic
        .strip_prefix(prefix)
        .and_then(|r| r.strip_prefix("/nodes/"))
        .ok_or_else(unroutable)?;

    let (node_id, tail) = rest.split_once('/').ok_or_else(unroutable)?;
    if node_id.is_empty() {
        return Err(unroutable());
    }

    match tail {
        "device/command" => Ok(Route::Device(node_id.to_string())),
        "command" => Ok(Route::Control(node_id.to_string())),
        _ => Err(unroutable()),
    }
}

/// Applies parsed commands to the registry
pub struct CommandProcessor;

impl CommandProcessor {
    /// Apply a device command: optionally set the on/off state (stamping
    /// `lastActivated` together with any switch-on) and optionally set the
    /// mode. Unknown node or device leaves the registry untouched.
    pub fn apply_device_command(
        registry: &mut NodeRegistry,
        node_id: &str,
        command: &DeviceCommand,
        now: DateTime<Utc>,
    ) -> Result<(), CommandError> {
        let node = registry
            .get_mut(node_id)
            .ok_or_else(|| CommandError::UnknownNode(node_id.to_string()))?;

        let device = node
            .devices
            .get_mut(&command.device)
            .ok_or_else(|| CommandError::UnknownDevice {
                node: node_id.to_string(),
                device: command.device.clone(),
            })?;

        if let Some(state) = command.state {
            device.is_active = state;
            if state {
                device.last_activated = Some(now);
            }
        }

        if let Some(mode) = command.mode {
            device.mode = mode;
        }

        info!(
            "Updated {} device for node {}: active={} mode={:?}",
            command.device, node_id, device.is_active, device.mode
        );
        Ok(())
    }

    /// Apply a generic control command: create the named control if absent,
    /// then shallow-merge the supplied keys over the existing settings.
    pub fn apply_control_command(
        registry: &mut NodeRegistry,
        node_id: &str,
        command: &ControlCommand,
    ) -> Result<(), CommandError> {
        let node = registry
            .get_mut(node_id)
            .ok_or_else(|| CommandError::UnknownNode(node_id.to_string()))?;

        let settings = node.controls.entry(command.control.clone()).or_default();
        for (key, value) in &command.value {
            settings.insert(key.clone(), value.clone());
        }

        info!("Updated {} control for node {}", command.control, node_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::Node;
    use chrono::TimeZone;

    fn registry_with_node() -> NodeRegistry {
        let node: Node = serde_json::from_str(r#"{"id": "node-1"}"#).unwrap();
        NodeRegistry::from_nodes(vec![node]).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_route_device_command() {
        let route = route("agrisys", "agrisys/nodes/node-1/device/command").unwrap();
        assert_eq!(route, Route::Device("node-1".to_string()));
    }

    #[test]
    fn test_route_control_command() {
        let route = route("agrisys", "agrisys/nodes/field-7/command").unwrap();
        assert_eq!(route, Route::Control("field-7".to_string()));
    }

    #[test]
    fn test_route_rejects_foreign_topics() {
        assert!(route("agrisys", "agrisys/nodes/node-1/sensors").is_err());
        assert!(route("agrisys", "other/nodes/node-1/command").is_err());
        assert!(route("agrisys", "agrisys/nodes//command").is_err());
        assert!(route("agrisys", "agrisys/test").is_err());
    }

    #[test]
    fn test_device_command_sets_state_and_stamps() {
        let mut registry = registry_with_node();
        let command = DeviceCommand {
            device: "watering".to_string(),
            state: Some(true),
            mode: None,
        };

        CommandProcessor::apply_device_command(&mut registry, "node-1", &command, now()).unwrap();

        let device = registry.get("node-1").unwrap().devices.get("watering").unwrap();
        assert!(device.is_active);
        assert_eq!(device.last_activated, Some(now()));
    }

    #[test]
    fn test_device_command_off_leaves_stamp() {
        let mut registry = registry_with_node();
        let on = DeviceCommand {
            device: "watering".to_string(),
            state: Some(true),
            mode: None,
        };
        CommandProcessor::apply_device_command(&mut registry, "node-1", &on, now()).unwrap();

        let off = DeviceCommand {
            device: "watering".to_string(),
            state: Some(false),
            mode: None,
        };
        let later = now() + chrono::Duration::seconds(30);
        CommandProcessor::apply_device_command(&mut registry, "node-1", &off, later).unwrap();

        let device = registry.get("node-1").unwrap().devices.get("watering").unwrap();
        assert!(!device.is_active);
        assert_eq!(device.last_activated, Some(now()));
    }

    #[test]
    fn test_device_command_sets_mode() {
        let mut registry = registry_with_node();
        let command = DeviceCommand {
            device: "humidity".to_string(),
            state: None,
            mode: Some(DeviceMode::Manual),
        };

        CommandProcessor::apply_device_command(&mut registry, "node-1", &command, now()).unwrap();

        let device = registry.get("node-1").unwrap().devices.get("humidity").unwrap();
        assert_eq!(device.mode, DeviceMode::Manual);
        assert!(!device.is_active);
    }

    #[test]
    fn test_device_command_unknown_node() {
        let mut registry = registry_with_node();
        let command = DeviceCommand {
            device: "watering".to_string(),
            state: Some(true),
            mode: None,
        };

        let err =
            CommandProcessor::apply_device_command(&mut registry, "node-9", &command, now())
                .unwrap_err();
        assert!(matches!(err, CommandError::UnknownNode(_)));
    }

    #[test]
    fn test_device_command_unknown_device_no_mutation() {
        let mut registry = registry_with_node();
        let command = DeviceCommand {
            device: "lighting".to_string(),
            state: Some(true),
            mode: None,
        };

        let err =
            CommandProcessor::apply_device_command(&mut registry, "node-1", &command, now())
                .unwrap_err();
        assert!(matches!(err, CommandError::UnknownDevice { .. }));

        let node = registry.get("node-1").unwrap();
        assert!(!node.devices.contains_key("lighting"));
        assert!(node.devices.values().all(|d| !d.is_active));
    }

    #[test]
    fn test_device_command_rejects_unknown_mode_string() {
        let result: Result<DeviceCommand, _> =
            serde_json::from_str(r#"{"device": "watering", "mode": "turbo"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_control_command_merges_settings() {
        let mut registry = registry_with_node();

        let first: ControlCommand =
            serde_json::from_str(r#"{"control": "fan", "value": {"speed": 3}}"#).unwrap();
        CommandProcessor::apply_control_command(&mut registry, "node-1", &first).unwrap();

        let second: ControlCommand =
            serde_json::from_str(r#"{"control": "fan", "value": {"mode": "on"}}"#).unwrap();
        CommandProcessor::apply_control_command(&mut registry, "node-1", &second).unwrap();

        let fan = registry.get("node-1").unwrap().controls.get("fan").unwrap();
        assert_eq!(fan.get("speed").unwrap(), 3);
        assert_eq!(fan.get("mode").unwrap(), "on");
    }

    #[test]
    fn test_control_command_overwrites_same_key() {
        let mut registry = registry_with_node();

        let first: ControlCommand =
            serde_json::from_str(r#"{"control": "fan", "value": {"speed": 3}}"#).unwrap();
        CommandProcessor::apply_control_command(&mut registry, "node-1", &first).unwrap();

        let second: ControlCommand =
            serde_json::from_str(r#"{"control": "fan", "value": {"speed": 5}}"#).unwrap();
        CommandProcessor::apply_control_command(&mut registry, "node-1", &second).unwrap();

        let fan = registry.get("node-1").unwrap().controls.get("fan").unwrap();
        assert_eq!(fan.get("speed").unwrap(), 5);
        assert_eq!(fan.len(), 1);
    }
}
