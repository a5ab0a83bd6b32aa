use thiserror::Error;

pub type MsgTypeResult<T> = Result<T, MsgTypeError>;

#[derive(Debug, Error)]
pub enum MsgTypeError {
    #[error("Malformed message type identifier: {0}")]
    MalformedIdentifier(String),
    #[error("Malformed protocol uri: {0}")]
    MalformedProtocolUri(String),
    #[error("Unsupported protocol version: {name} {major}.{minor}")]
    UnsupportedVersion {
        name: String,
        major: u8,
        minor: u8,
    },
}

impl MsgTypeError {
    pub fn malformed(identifier: impl Into<String>) -> Self {
        Self::MalformedIdentifier(identifier.into())
    }
}
