// Copyright (c) 2026 agrisys
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/agrisys/agrinode-rs

//! Node data model - field units, sensor readings, and device states

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Operational status of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Online,
    Offline,
}

impl Default for NodeStatus {
    fn default() -> Self {
        Self::Online
    }
}

/// Qualitative band derived from a reading's value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadingStatus {
    Low,
    Optimal,
    High,
}

/// A single sensor reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub value: f64,
    pub unit: String,
    pub status: ReadingStatus,
}

/// Device operating mode
///
/// Commands carrying any other string fail to parse and are dropped at the
/// boundary - an unrecognized mode is never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceMode {
    Auto,
    Manual,
}

/// State of a controllable device (watering, humidity)
///
/// `last_activated` is stamped in the same step as every false-to-true
/// transition of `is_active`; the two fields never change independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceState {
    pub is_active: bool,
    pub mode: DeviceMode,
    pub last_activated: Option<DateTime<Utc>>,
}

impl Default for DeviceState {
    fn default() -> Self {
        Self {
            is_active: false,
            mode: DeviceMode::Auto,
            last_activated: None,
        }
    }
}

/// Arbitrary key/value settings attached to a named control
pub type ControlSettings = serde_json::Map<String, serde_json::Value>;

/// A simulated field unit with sensors, devices, and controls
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    #[serde(default)]
    pub status: NodeStatus,
    #[serde(default)]
    pub sensors: BTreeMap<String, Reading>,
    #[serde(default)]
    pub devices: BTreeMap<String, DeviceState>,
    #[serde(default)]
    pub controls: BTreeMap<String, ControlSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl Node {
    /// Populate the default device set on nodes whose inventory record has no
    /// `devices` entry. Runs once at load time so no later code path ever
    /// observes a node without its device map.
    pub fn ensure_default_devices(&mut self) {
        if self.devices.is_empty() {
            self.devices
                .insert("watering".to_string(), DeviceState::default());
            self.devices
                .insert("humidity".to_string(), DeviceState::default());
        }
    }

    pub fn is_online(&self) -> bool {
        self.status == NodeStatus::Online
    }
}
