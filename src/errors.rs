//! Error types shared across the application.

use std::fmt::{Display, Formatter};

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error enumeration covering all domain failure modes.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// Session lifecycle or initialization failure.
    Session(String),
    /// Processing-module instantiation or registry failure.
    Module(String),
    /// I/O mapping resolution or multiplexer failure.
    Mapping(String),
    /// Peer registration or liveness bookkeeping failure.
    Peer(String),
    /// Remote node dispatch failure.
    Transport(String),
    /// Requested entity does not exist.
    NotFound(String),
    /// File-system or I/O operation failure.
    Io(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Session(msg) => write!(f, "session: {msg}"),
            Self::Module(msg) => write!(f, "module: {msg}"),
            Self::Mapping(msg) => write!(f, "mapping: {msg}"),
            Self::Peer(msg) => write!(f, "peer: {msg}"),
            Self::Transport(msg) => write!(f, "transport: {msg}"),
            Self::NotFound(msg) => write!(f, "not found: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
