use miette::{Diagnostic, Result};
use thiserror::Error;

/// Main error type for the application
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("Environment error: {0}")]
    #[diagnostic(
        code(ical_notifier::environment),
        help("Set the variable in the environment or in a .env file")
    )]
    Environment(String),

    #[error("Configuration error: {0}")]
    #[diagnostic(code(ical_notifier::config))]
    Config(String),

    #[error("Calendar feed error: {0}")]
    #[diagnostic(code(ical_notifier::feed))]
    Feed(String),

    #[error("Discord webhook error: {0}")]
    #[diagnostic(code(ical_notifier::webhook))]
    Webhook(String),

    #[error("Event store error: {0}")]
    #[diagnostic(code(ical_notifier::event_store))]
    EventStore(String),

    #[error(transparent)]
    #[diagnostic(code(ical_notifier::io))]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    #[diagnostic(code(ical_notifier::http))]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    #[diagnostic(code(ical_notifier::serialization))]
    Serialization(String),

    #[error("Other error: {0}")]
    #[diagnostic(code(ical_notifier::other))]
    Other(String),
}

// Implement From for TOML deserialization errors
impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Type alias for Result with our Error type
pub type NotifierResult<T> = Result<T, Error>;

/// Helper to create environment errors
pub fn env_error(var: &str) -> Error {
    Error::Environment(format!("Missing environment variable: {}", var))
}

/// Helper to create configuration errors
pub fn config_error(message: &str) -> Error {
    Error::Config(message.to_string())
}

/// Helper to create calendar feed errors
pub fn feed_error(message: &str) -> Error {
    Error::Feed(message.to_string())
}

/// Helper to create webhook errors
pub fn webhook_error(message: &str) -> Error {
    Error::Webhook(message.to_string())
}

/// Helper to create event store errors
pub fn store_error(message: &str) -> Error {
    Error::EventStore(message.to_string())
}
