//! Server and client configuration
//! Handles the environment-driven parameters for the room server and the
//! diagram client.

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::constants::{
    DEFAULT_HOST, DEFAULT_PORT, DEFAULT_REJOIN_FLOOR_SECS, DEFAULT_ROOM_QUEUE_CAPACITY,
    DEFAULT_SERVER_URL,
};
use crate::error::{ChartRoomError, Result};

/// Read `key` as a `T`, falling back to `default` when it is unset.
/// A value that is set but unparseable is a configuration error.
fn env_or<T: FromStr>(key: &str, default: T, expected: &str) -> Result<T> {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|_| {
            ChartRoomError::ConfigError(format!("{} is not a valid {}: {:?}", key, expected, raw))
        }),
        Err(_) => Ok(default),
    }
}

/// Server configuration parameters
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Capacity of each room actor's inbox
    pub room_queue_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            room_queue_capacity: DEFAULT_ROOM_QUEUE_CAPACITY,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables if available
    pub fn from_env() -> Result<Self> {
        let host = env::var("CHARTROOM_HOST").unwrap_or(DEFAULT_HOST.to_string());

        let port = env_or("CHARTROOM_PORT", DEFAULT_PORT, "port")?;
        let room_queue_capacity =
            env_or("CHARTROOM_ROOM_QUEUE", DEFAULT_ROOM_QUEUE_CAPACITY, "queue capacity")?;

        let config = Self {
            host,
            port,
            room_queue_capacity,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject values the room actors cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.room_queue_capacity == 0 {
            return Err(ChartRoomError::ConfigError(
                "CHARTROOM_ROOM_QUEUE must be greater than zero".to_string(),
            ));
        }
        self.socket_addr().map(|_| ())
    }

    /// Address the HTTP listener binds to
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| ChartRoomError::ConfigError(format!("Failed to parse server address: {}", e)))
    }
}

/// Client configuration parameters
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base http(s) URL of the room server
    pub server_url: Url,
    /// Minimum spacing between two join attempts
    pub rejoin_floor: Duration,
}

impl ClientConfig {
    pub fn new(server_url: &str) -> Result<Self> {
        let server_url = Url::parse(server_url)?;
        match server_url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(ChartRoomError::ConfigError(format!(
                    "Server URL must use http or https, got {}",
                    other
                )))
            }
        }

        Ok(Self {
            server_url,
            rejoin_floor: Duration::from_secs(DEFAULT_REJOIN_FLOOR_SECS),
        })
    }

    /// Load configuration from environment variables if available
    pub fn from_env() -> Result<Self> {
        let server_url =
            env::var("CHARTROOM_SERVER_URL").unwrap_or(DEFAULT_SERVER_URL.to_string());

        let floor_secs = env_or(
            "CHARTROOM_REJOIN_FLOOR_SECS",
            DEFAULT_REJOIN_FLOOR_SECS,
            "number of seconds",
        )?;

        Ok(Self::new(&server_url)?.with_rejoin_floor(Duration::from_secs(floor_secs)))
    }

    pub fn with_rejoin_floor(mut self, floor: Duration) -> Self {
        self.rejoin_floor = floor;
        self
    }
}
