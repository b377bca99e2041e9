use sensornet::DEFAULT_FRAME_CAPACITY;

use crate::logging::LogFormat;

/// Default rendezvous host.
pub const DEFAULT_RENDEZVOUS_HOST: &str = "comp375.sandiego.edu";

/// Default rendezvous port.
pub const DEFAULT_RENDEZVOUS_PORT: u16 = 47789;

/// Default log filter expression used by the binary.
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Smallest receive buffer accepted by validation.
pub const MIN_FRAME_CAPACITY: usize = 16;

/// Owned rendezvous host used where allocation is required (e.g. serde).
pub fn default_rendezvous_host_string() -> String {
    DEFAULT_RENDEZVOUS_HOST.to_string()
}

/// Default rendezvous port.
pub fn default_rendezvous_port() -> u16 {
    DEFAULT_RENDEZVOUS_PORT
}

/// Default receive buffer capacity in bytes.
pub fn default_frame_capacity() -> usize {
    DEFAULT_FRAME_CAPACITY
}

/// Default log filter expression used by the binary.
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

/// Default logging format for the binary.
pub fn default_log_format() -> LogFormat {
    LogFormat::Compact
}
