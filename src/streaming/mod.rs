//! Streaming module - MQTT transport and topic layout

mod mqtt;

pub use mqtt::{InboundMessage, MqttClient};

use serde::{Deserialize, Serialize};

/// MQTT transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamingConfig {
    pub mqtt_broker: String,
    pub mqtt_port: u16,
    pub mqtt_client_id: String,
    pub mqtt_username: Option<String>,
    pub mqtt_password: Option<String>,
    pub keep_alive_secs: u64,

    /// Leading segment of every topic, e.g. `agrisys/nodes/{id}/sensors`
    pub topic_prefix: String,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            mqtt_broker: "localhost".to_string(),
            mqtt_port: 1883,
            mqtt_client_id: "agrinode".to_string(),
            mqtt_username: None,
            mqtt_password: None,
            keep_alive_secs: 30,
            topic_prefix: "agrisys".to_string(),
        }
    }
}

/// Topic construction for the node pub/sub surface
pub mod topics {
    /// `{prefix}/nodes/{id}/sensors` - outbound sensor readings
    pub fn sensor_data(prefix: &str, node_id: &str) -> String {
        format!("{prefix}/nodes/{node_id}/sensors")
    }

    /// `{prefix}/nodes/{id}/device/status` - outbound device states
    pub fn device_status(prefix: &str, node_id: &str) -> String {
        format!("{prefix}/nodes/{node_id}/device/status")
    }

    /// `{prefix}/nodes/{id}/controls` - outbound control settings
    pub fn control_status(prefix: &str, node_id: &str) -> String {
        format!("{prefix}/nodes/{node_id}/controls")
    }

    /// Wildcard subscription for device commands across all nodes
    pub fn device_command_filter(prefix: &str) -> String {
        format!("{prefix}/nodes/+/device/command")
    }

    /// Wildcard subscription for generic control commands across all nodes
    pub fn control_command_filter(prefix: &str) -> String {
        format!("{prefix}/nodes/+/command")
    }
}
