//! Node module - data model and in-memory registry

mod model;
mod registry;

pub use model::{ControlSettings, DeviceMode, DeviceState, Node, NodeStatus, Reading, ReadingStatus};
pub use registry::{NodeRegistry, StoreError};
