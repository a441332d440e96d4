//! GyroGate - motion-to-input mapping engine
//!
//! Turns gamepad motion (gyro + accelerometer) and regular inputs into
//! virtual controller, keyboard and mouse outputs through user-defined,
//! layered YAML mappings with regex-based autoloading.

pub mod cli;
pub mod config;
pub mod device;
pub mod input_store;
pub mod mapping;
pub mod math;
pub mod motion;
pub mod output;
pub mod pad;
pub mod paths;
pub mod runtime;

pub use input_store::InputStore;
pub use mapping::{Mapping, MappingConfig};
pub use pad::GyroGatePad;
pub use runtime::{AutoloadTable, Runtime};
