// Fundamental configuration constants
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8787;
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8787";

// Route segments: /api/chart/<name>/websocket
pub const API_PATH: &str = "api";
pub const CHART_PATH: &str = "chart";
pub const WEBSOCKET_PATH: &str = "websocket";
pub const HEALTH_PATH: &str = "health";

// Room identity
pub const ROOM_ID_BYTES: usize = 32;
pub const MAX_ROOM_NAME_LEN: usize = 32;

// Room actor inbox capacity
pub const DEFAULT_ROOM_QUEUE_CAPACITY: usize = 64;

// Client side
pub const DEFAULT_REJOIN_FLOOR_SECS: u64 = 10;

// Close code sent when a socket misbehaves after being evicted or on a setup fault
pub const CLOSE_CODE_INTERNAL_ERROR: u16 = 1011;
