//! Error handling for the thermostat controller.

/// A specialized `Result` type for thermostat operations.
pub type Result<T> = std::result::Result<T, ThermoError>;

/// The main error type for thermostat operations.
#[derive(Debug, thiserror::Error)]
pub enum ThermoError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Sensor read failed or produced an implausible value
    #[error("Sensor error: {0}")]
    Sensor(String),

    /// Actuator output could not be driven
    #[error("Hardware error: {0}")]
    Hardware(String),

    /// GPIO operation failed (only available with gpio feature)
    #[cfg(feature = "gpio")]
    #[error("GPIO error: {0}")]
    Gpio(String),

    /// Sample history could not be read or written
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// A request carried a missing or malformed field
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Web server error
    #[error("Web server error: {0}")]
    WebServer(String),

    /// Startup or shutdown sequencing failed
    #[error("Lifecycle error: {0}")]
    Lifecycle(String),
}

impl ThermoError {
    /// Create a new sensor error
    pub fn sensor_error(msg: impl Into<String>) -> Self {
        Self::Sensor(msg.into())
    }

    /// Create a new hardware error
    pub fn hardware_error(msg: impl Into<String>) -> Self {
        Self::Hardware(msg.into())
    }

    /// Create a new GPIO error
    #[cfg(feature = "gpio")]
    pub fn gpio_error(msg: impl Into<String>) -> Self {
        Self::Gpio(msg.into())
    }

    /// Create a new persistence error
    pub fn persistence_error(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    /// Create a new validation error
    pub fn validation_error(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a new configuration error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new web server error
    pub fn web_server_error(msg: impl Into<String>) -> Self {
        Self::WebServer(msg.into())
    }

    /// Create a new lifecycle error
    pub fn lifecycle_error(msg: impl Into<String>) -> Self {
        Self::Lifecycle(msg.into())
    }

    /// Whether the error was caused by the caller rather than the system.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
