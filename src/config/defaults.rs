//! Default configuration values

use super::ChunkPolicy;

/// Default GCDM server URL
pub fn default_server_url() -> String {
    "http://localhost:1234".to_string()
}

/// Default connect timeout in seconds
pub const fn default_connect_timeout() -> u64 {
    10
}

/// Default per-call timeout in seconds
pub const fn default_timeout() -> u64 {
    300 // 5 minutes
}

/// Default maximum size of a single decoded gRPC message (64 MiB)
pub const fn default_max_message_bytes() -> usize {
    64 * 1024 * 1024
}

/// Default handling of multi-chunk data streams
pub const fn default_chunk_policy() -> ChunkPolicy {
    ChunkPolicy::All
}

/// Environment variable overriding the server URL
pub const ENV_SERVER_URL: &str = "GCDM_SERVER_URL";

/// Environment variable overriding the per-call timeout
pub const ENV_TIMEOUT_SECS: &str = "GCDM_TIMEOUT_SECS";

/// Environment variable holding the log filter
pub const ENV_LOG: &str = "GCDM_LOG";
