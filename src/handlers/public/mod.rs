// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Service info, health probe and the sensor intake used by field devices.
pub mod health;
pub mod sensor;

pub use health::{health, root};
pub use sensor::sensor_data_post;
