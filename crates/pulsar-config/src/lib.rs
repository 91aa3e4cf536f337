//! System-configuration document (YAML) for the emitted Beacon, plus the
//! logging configuration shared by the compiler CLI.

mod logging;
mod system;

pub use logging::{LogFormat, LoggingConfig};
pub use system::{RedisConfig, SystemConfig};
