pub mod camera;
pub mod config;
pub mod detection;
pub mod error;
pub mod geometry;
pub mod mailbox;
pub mod memory;
pub mod system;
pub mod tracking;
