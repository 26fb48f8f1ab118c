//! Control a robotic arm attached through a USB-to-serial bridge.
//!
//! The arm speaks a line protocol of carriage-return terminated ASCII
//! commands and answers each with an echo that is checked against a fixed
//! literal. [`RoboArm`] wraps one connection and exposes one method per
//! command.

pub mod arm;
pub mod config;
pub mod error;
pub mod protocol;
pub mod tracing;
pub mod transport;

pub use arm::RoboArm;
pub use config::Config;
pub use error::{Error, Result};
pub use protocol::{Angles, Direction};
