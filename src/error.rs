use std::error::Error;
use std::fmt;
use std::sync::PoisonError;

#[derive(Debug)]
pub enum ChartRoomError {
    // Routing errors
    RoomNameTooLong(usize),
    InvalidRoomId(String),

    // Room actor errors
    RoomUnavailable(String),
    RegistryLock(String),

    // Connection errors
    ConnectionError(String),
    ConnectionClosed,

    // Message errors
    MessageParseError(String),
    InvalidSnapshot(String),

    // Configuration errors
    ConfigError(String),
}

impl fmt::Display for ChartRoomError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RoomNameTooLong(len) => write!(f, "Name too long: {} characters", len),
            Self::InvalidRoomId(id) => write!(f, "Invalid room id: {}", id),
            Self::RoomUnavailable(id) => write!(f, "Room actor unavailable: {}", id),
            Self::RegistryLock(msg) => write!(f, "Room registry lock error: {}", msg),
            Self::ConnectionError(msg) => write!(f, "Connection error: {}", msg),
            Self::ConnectionClosed => write!(f, "Connection closed unexpectedly"),
            Self::MessageParseError(msg) => write!(f, "Message parse error: {}", msg),
            Self::InvalidSnapshot(msg) => write!(f, "Invalid snapshot: {}", msg),
            Self::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl Error for ChartRoomError {}

// A poisoned registry mutex means a room actor spawn panicked mid-insert
impl<T> From<PoisonError<T>> for ChartRoomError {
    fn from(err: PoisonError<T>) -> Self {
        ChartRoomError::RegistryLock(format!("Mutex poisoned: {}", err))
    }
}

impl From<serde_json::Error> for ChartRoomError {
    fn from(err: serde_json::Error) -> Self {
        ChartRoomError::MessageParseError(err.to_string())
    }
}

impl From<url::ParseError> for ChartRoomError {
    fn from(err: url::ParseError) -> Self {
        ChartRoomError::ConfigError(format!("Invalid URL: {}", err))
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ChartRoomError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        match err {
            tokio_tungstenite::tungstenite::Error::ConnectionClosed => ChartRoomError::ConnectionClosed,
            other => ChartRoomError::ConnectionError(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for ChartRoomError {
    fn from(err: reqwest::Error) -> Self {
        ChartRoomError::ConnectionError(err.to_string())
    }
}

// Generic result type for chartroom
pub type Result<T> = std::result::Result<T, ChartRoomError>;
