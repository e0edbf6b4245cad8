use std::fmt;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CollectionError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to parse data: {0}")]
    Parse(String),

    #[error("System API error: {0}")]
    SystemApi(String),

    #[error("Storage failed: {0}")]
    Storage(#[from] StorageError),
}

#[derive(Error, Debug)]
pub enum EvaluationError {
    #[error("Storage failed: {0}")]
    Storage(#[from] StorageError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Write operation failed: {0}")]
    Write(String),

    #[error("Read operation failed: {0}")]
    Read(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read { path: String, source: io::Error },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid value for {key}: {value}")]
    InvalidEnv { key: String, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// What went wrong while handing a notification to the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Server unreachable or TLS negotiation failed.
    Connection,
    Authentication,
    Timeout,
    /// The server answered with a transient or permanent SMTP error code.
    Rejected,
    /// Addresses or headers could not be turned into a valid message.
    MalformedMessage,
    Protocol,
    /// The server closed the connection without a proper reply.
    Disconnected,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connection => "ConnectionError",
            Self::Authentication => "AuthenticationError",
            Self::Timeout => "TimeoutError",
            Self::Rejected => "RejectedError",
            Self::MalformedMessage => "MalformedMessageError",
            Self::Protocol => "ProtocolError",
            Self::Disconnected => "ServerDisconnected",
        };
        f.write_str(name)
    }
}

/// Where in a delivery attempt the transport failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendStage {
    Connect,
    Authenticate,
    /// Sender, recipients and the start of the data section.
    Envelope,
    /// The message body has been written and the final reply is pending.
    Payload,
}

impl SendStage {
    pub fn message_handed_off(&self) -> bool {
        matches!(self, Self::Payload)
    }
}

impl fmt::Display for SendStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connect => "connect",
            Self::Authenticate => "authenticate",
            Self::Envelope => "envelope",
            Self::Payload => "payload",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} during {stage}: {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub stage: SendStage,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, stage: SendStage, message: impl Into<String>) -> Self {
        Self {
            kind,
            stage,
            message: message.into(),
        }
    }

    /// A disconnect after the full message was written counts as delivered.
    ///
    /// Some SMTP servers drop the connection instead of acknowledging the end
    /// of data. This is best-effort: nothing confirms the message was queued.
    /// Disconnects at any earlier stage stay critical.
    pub fn is_tolerated_disconnect(&self) -> bool {
        self.kind == TransportErrorKind::Disconnected && self.stage.message_handed_off()
    }
}
