//! Error types for zyxsh.

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Main error type for zyxsh operations.
#[derive(Error, Debug)]
pub enum Error {
    /// SSH transport-level errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Errors while talking to the remote shell
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Driver-level errors
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),
}

/// Transport layer errors (SSH connection, authentication).
///
/// Any of these is fatal for the command execution; nothing is retried.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Failed to connect to host
    #[error("Connection failed to {host}:{port}: {source}")]
    ConnectionFailed {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// SSH handshake or protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Authentication failed
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// SSH key error
    #[error("SSH key error: {0}")]
    Key(String),

    /// Host is not in known_hosts and strict checking is enabled
    #[error("Host key for {host}:{port} is not known")]
    HostKeyUnknown { host: String, port: u16 },

    /// Host key differs from the one recorded in known_hosts
    #[error("Host key for {host}:{port} changed (known_hosts line {line})")]
    HostKeyChanged { host: String, port: u16, line: usize },

    /// known_hosts could not be read or written
    #[error("known_hosts error: {0}")]
    KnownHosts(String),

    /// Operation timed out
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),
}

/// Errors raised while driving the interactive shell.
#[derive(Error, Debug)]
pub enum ChannelError {
    /// No prompt terminator seen before the prompt deadline
    #[error("No prompt received within {0:?}")]
    PromptTimeout(Duration),

    /// Output stream ended before a prompt was seen
    #[error("Channel closed")]
    Closed,

    /// Writing to the remote shell failed
    #[error("Channel I/O error: {0}")]
    Io(#[from] io::Error),

    /// Invalid pager regex
    #[error("Invalid regex pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// Driver layer errors.
#[derive(Error, Debug)]
pub enum DriverError {
    /// Invalid configuration in the driver builder
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

/// Result type alias using zyxsh's Error.
pub type Result<T> = std::result::Result<T, Error>;
