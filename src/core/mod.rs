//! Core module - device automation and the controller loop

mod controller;
mod engine;

pub use controller::Controller;
pub use engine::{AutomationEngine, DevicePolicy, POLICIES};
