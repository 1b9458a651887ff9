//! Centralized environment variable names and default values for salesagg jobs.

// Environment variable names
pub const ENV_DELIMITER: &str = "SALESAGG_DELIMITER";
pub const ENV_HEADER_PREFIX: &str = "SALESAGG_HEADER_PREFIX";
pub const ENV_ALLOW_UNSORTED: &str = "SALESAGG_ALLOW_UNSORTED";
pub const ENV_THREADS: &str = "SALESAGG_THREADS";

// Defaults matching the sales dataset layout
pub const DEFAULT_DELIMITER: char = ',';
pub const DEFAULT_HEADER_PREFIX: &str = "Region,Country,Item Type";

/// Lines handed to one parallel map task by the in-process driver.
pub const MAP_CHUNK_LINES: usize = 64 * 1024;
