// Copyright (c) 2026 agrisys
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/agrisys/agrinode-rs

//! Sensor simulation - bounded random walks with a day/night light cycle

use chrono::{DateTime, TimeZone, Timelike, Utc};
use rand::prelude::*;

use crate::nodes::{Node, Reading, ReadingStatus};

/// First and last hour of the daytime light regime (inclusive).
const DAYTIME_HOURS: std::ops::RangeInclusive<u32> = 6..=20;

/// Baseline lux the nighttime walk re-centers on every tick.
const NIGHT_LIGHT_BASELINE: f64 = 10.0;

/// Sensor kinds the simulator knows how to advance. Readings under any other
/// key are carried through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorKind {
    SoilMoisture,
    Light,
    Humidity,
    Temperature,
}

impl SensorKind {
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "soilMoisture" => Some(Self::SoilMoisture),
            "light" => Some(Self::Light),
            "humidity" => Some(Self::Humidity),
            "temperature" => Some(Self::Temperature),
            _ => None,
        }
    }

    /// Derive the qualitative band for a value of this sensor kind.
    pub fn band(self, value: f64) -> ReadingStatus {
        let (low, high) = match self {
            Self::SoilMoisture => (40.0, 70.0),
            Self::Light => (200.0, 1200.0),
            Self::Humidity => (50.0, 75.0),
            Self::Temperature => (18.0, 28.0),
        };

        if value < low {
            ReadingStatus::Low
        } else if value > high {
            ReadingStatus::High
        } else {
            ReadingStatus::Optimal
        }
    }
}

/// Advances node sensor readings on each simulation tick
pub struct SensorSimulator {
    rng: StdRng,
}

impl SensorSimulator {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic simulator for tests.
    #[cfg(test)]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Advance every known sensor on the node and stamp `lastUpdated`.
    ///
    /// Offline nodes are skipped entirely; returns whether the node ticked.
    /// The day/night light regime is keyed on the hour of the timestamp the
    /// caller supplies (the controller passes local time).
    pub fn tick<Tz: TimeZone>(&mut self, node: &mut Node, now: DateTime<Tz>) -> bool {
        if !node.is_online() {
            return false;
        }

        let hour = now.hour();
        for (key, reading) in node.sensors.iter_mut() {
            let Some(kind) = SensorKind::from_key(key) else {
                continue;
            };
            self.step(kind, reading, hour);
        }

        node.last_updated = Some(now.with_timezone(&Utc));
        true
    }

    fn step(&mut self, kind: SensorKind, reading: &mut Reading, hour: u32) {
        reading.value = match kind {
            SensorKind::SoilMoisture => self.walk(reading.value, 2.0).clamp(0.0, 100.0),
            SensorKind::Humidity => self.walk(reading.value, 1.0).clamp(0.0, 100.0),
            SensorKind::Temperature => self.walk(reading.value, 0.2).max(0.0),
            SensorKind::Light => self.step_light(reading.value, hour),
        };
        reading.status = kind.band(reading.value);
    }

    /// Daytime light walks around the previous value; nighttime discards it
    /// and re-centers on a fixed baseline, so the value is not a continuation
    /// of the prior reading across the day/night boundary.
    fn step_light(&mut self, previous: f64, hour: u32) -> f64 {
        if DAYTIME_HOURS.contains(&hour) {
            self.walk(previous, 50.0).max(0.0)
        } else {
            self.walk(NIGHT_LIGHT_BASELINE, 5.0).max(0.0)
        }
    }

    /// Draw the next value uniformly from `center ± delta`, rounded to one
    /// decimal place like the readings in the inventory.
    fn walk(&mut self, center: f64, delta: f64) -> f64 {
        let drawn = self.rng.gen_range(center - delta..=center + delta);
        (drawn * 10.0).round() / 10.0
    }
}

impl Default for SensorSimulator {
    fn default() -> Self {
        Self::new()
    }
}
