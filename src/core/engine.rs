//! Device automation engine - threshold activation and runtime ceilings

use chrono::{DateTime, Duration, Utc};
use tracing::info;

use crate::nodes::{DeviceMode, Node};

/// Fixed activation policy for one device kind
pub struct DevicePolicy {
    pub device: &'static str,
    pub sensor: &'static str,
    pub threshold: f64,
    pub max_runtime_secs: i64,
}

impl DevicePolicy {
    pub fn max_runtime(&self) -> Duration {
        Duration::seconds(self.max_runtime_secs)
    }
}

/// Per-device policy table. Devices activate in auto mode while the driving
/// sensor reads below the threshold, and are forced off once they have run
/// longer than the ceiling regardless of the sensor.
pub const POLICIES: &[DevicePolicy] = &[
    DevicePolicy {
        device: "watering",
        sensor: "soilMoisture",
        threshold: 40.0,
        max_runtime_secs: 5 * 60,
    },
    DevicePolicy {
        device: "humidity",
        sensor: "humidity",
        threshold: 60.0,
        max_runtime_secs: 10 * 60,
    },
];

/// Evaluates auto-mode devices against sensor readings and enforces
/// maximum auto runtimes. Manual-mode devices are never touched.
pub struct AutomationEngine;

impl AutomationEngine {
    pub fn new() -> Self {
        Self
    }

    /// Re-derive each auto device's on/off state from its sensor threshold.
    ///
    /// `last_activated` is stamped in the same step as any off-to-on flip.
    /// Returns whether any device changed, so the caller knows to publish.
    /// Idempotent: a second call with unchanged readings is a no-op.
    pub fn evaluate(&self, node: &mut Node, now: DateTime<Utc>) -> bool {
        let Node {
            id,
            sensors,
            devices,
            ..
        } = node;

        let mut changed = false;
        for policy in POLICIES {
            let Some(device) = devices.get_mut(policy.device) else {
                continue;
            };
            if device.mode != DeviceMode::Auto {
                continue;
            }
            let Some(reading) = sensors.get(policy.sensor) else {
                continue;
            };

            let should_activate = reading.value < policy.threshold;
            if should_activate != device.is_active {
                device.is_active = should_activate;
                if should_activate {
                    device.last_activated = Some(now);
                }
                changed = true;
                info!(
                    "Auto {} {} for node {} ({}: {})",
                    if should_activate { "activated" } else { "deactivated" },
                    policy.device,
                    id,
                    policy.sensor,
                    reading.value
                );
            }
        }

        changed
    }

    /// Force off any auto device that has been running longer than its
    /// ceiling. The sensor condition is deliberately not re-checked - the
    /// ceiling holds even while the triggering condition persists. A running
    /// device with no recorded activation time counts as started at the epoch
    /// and is shut off on the next sweep.
    pub fn sweep_node(&self, node: &mut Node, now: DateTime<Utc>) -> bool {
        let Node { id, devices, .. } = node;

        let mut changed = false;
        for policy in POLICIES {
            let Some(device) = devices.get_mut(policy.device) else {
                continue;
            };
            if device.mode != DeviceMode::Auto || !device.is_active {
                continue;
            }

            let started = device.last_activated.unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
            let elapsed = now.signed_duration_since(started);
            if elapsed > policy.max_runtime() {
                device.is_active = false;
                changed = true;
                info!(
                    "Auto deactivated {} for node {} after {} minutes",
                    policy.device,
                    id,
                    elapsed.num_minutes()
                );
            }
        }

        changed
    }
}

impl Default for AutomationEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::{DeviceState, Reading, ReadingStatus};
    use chrono::TimeZone;

    fn test_node(moisture: f64, device: &str, state: DeviceState) -> Node {
        let mut node: Node = serde_json::from_str(r#"{"id": "node-1"}"#).unwrap();
        node.sensors.insert(
            "soilMoisture".to_string(),
            Reading {
                value: moisture,
                unit: "%".to_string(),
                status: ReadingStatus::Optimal,
            },
        );
        node.devices.insert(device.to_string(), state);
        node
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_evaluate_activates_watering_below_threshold() {
        let engine = AutomationEngine::new();
        let mut node = test_node(35.0, "watering", DeviceState::default());

        assert!(engine.evaluate(&mut node, now()));

        let device = node.devices.get("watering").unwrap();
        assert!(device.is_active);
        assert_eq!(device.last_activated, Some(now()));
    }

    #[test]
    fn test_evaluate_deactivates_when_condition_clears() {
        let engine = AutomationEngine::new();
        let stamp = now() - Duration::seconds(60);
        let mut node = test_node(
            55.0,
            "watering",
            DeviceState {
                is_active: true,
                mode: DeviceMode::Auto,
                last_activated: Some(stamp),
            },
        );

        assert!(engine.evaluate(&mut node, now()));

        let device = node.devices.get("watering").unwrap();
        assert!(!device.is_active);
        // the stamp marks activations only; deactivation leaves it alone
        assert_eq!(device.last_activated, Some(stamp));
    }

    #[test]
    fn test_evaluate_is_idempotent() {
        let engine = AutomationEngine::new();
        let mut node = test_node(35.0, "watering", DeviceState::default());

        assert!(engine.evaluate(&mut node, now()));
        assert!(!engine.evaluate(&mut node, now()));
    }

    #[test]
    fn test_evaluate_ignores_manual_devices() {
        let engine = AutomationEngine::new();
        let mut node = test_node(
            10.0,
            "watering",
            DeviceState {
                is_active: false,
                mode: DeviceMode::Manual,
                last_activated: None,
            },
        );

        assert!(!engine.evaluate(&mut node, now()));
        assert!(!node.devices.get("watering").unwrap().is_active);
    }

    #[test]
    fn test_evaluate_uses_humidity_threshold() {
        let engine = AutomationEngine::new();
        let mut node: Node = serde_json::from_str(r#"{"id": "node-1"}"#).unwrap();
        node.sensors.insert(
            "humidity".to_string(),
            Reading {
                value: 59.9,
                unit: "%".to_string(),
                status: ReadingStatus::Optimal,
            },
        );
        node.devices
            .insert("humidity".to_string(), DeviceState::default());

        assert!(engine.evaluate(&mut node, now()));
        assert!(node.devices.get("humidity").unwrap().is_active);
    }

    #[test]
    fn test_evaluate_skips_missing_sensor() {
        let engine = AutomationEngine::new();
        let mut node: Node = serde_json::from_str(r#"{"id": "node-1"}"#).unwrap();
        node.devices
            .insert("watering".to_string(), DeviceState::default());

        assert!(!engine.evaluate(&mut node, now()));
    }

    #[test]
    fn test_sweep_forces_off_past_runtime_ceiling() {
        let engine = AutomationEngine::new();
        // soil moisture is still far below the threshold; the ceiling wins
        let mut node = test_node(
            10.0,
            "watering",
            DeviceState {
                is_active: true,
                mode: DeviceMode::Auto,
                last_activated: Some(now() - Duration::seconds(301)),
            },
        );

        assert!(engine.sweep_node(&mut node, now()));
        assert!(!node.devices.get("watering").unwrap().is_active);
    }

    #[test]
    fn test_sweep_leaves_device_within_runtime() {
        let engine = AutomationEngine::new();
        let mut node = test_node(
            10.0,
            "watering",
            DeviceState {
                is_active: true,
                mode: DeviceMode::Auto,
                last_activated: Some(now() - Duration::seconds(299)),
            },
        );

        assert!(!engine.sweep_node(&mut node, now()));
        assert!(node.devices.get("watering").unwrap().is_active);
    }

    #[test]
    fn test_sweep_treats_missing_stamp_as_epoch() {
        let engine = AutomationEngine::new();
        let mut node = test_node(
            10.0,
            "watering",
            DeviceState {
                is_active: true,
                mode: DeviceMode::Auto,
                last_activated: None,
            },
        );

        assert!(engine.sweep_node(&mut node, now()));
        assert!(!node.devices.get("watering").unwrap().is_active);
    }

    #[test]
    fn test_sweep_ignores_manual_devices() {
        let engine = AutomationEngine::new();
        let mut node = test_node(
            10.0,
            "watering",
            DeviceState {
                is_active: true,
                mode: DeviceMode::Manual,
                last_activated: Some(now() - Duration::hours(24)),
            },
        );

        assert!(!engine.sweep_node(&mut node, now()));
        assert!(node.devices.get("watering").unwrap().is_active);
    }

    #[test]
    fn test_humidity_runtime_ceiling_is_ten_minutes() {
        let engine = AutomationEngine::new();
        let mut node: Node = serde_json::from_str(r#"{"id": "node-1"}"#).unwrap();
        node.devices.insert(
            "humidity".to_string(),
            DeviceState {
                is_active: true,
                mode: DeviceMode::Auto,
                last_activated: Some(now() - Duration::seconds(9 * 60)),
            },
        );

        assert!(!engine.sweep_node(&mut node, now()));

        node.devices.get_mut("humidity").unwrap().last_activated =
            Some(now() - Duration::seconds(11 * 60));
        assert!(engine.sweep_node(&mut node, now()));
        assert!(!node.devices.get("humidity").unwrap().is_active);
    }
}
