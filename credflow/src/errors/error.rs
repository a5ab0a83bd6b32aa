use std::fmt;

pub type CredflowResult<T> = Result<T, CredflowError>;

#[derive(Copy, Clone, Eq, PartialEq, Debug, thiserror::Error)]
pub enum CredflowErrorKind {
    // Common
    #[error("Object is in invalid state for requested operation")]
    InvalidState,
    #[error("Unable to serialize")]
    SerializationError,
    #[error("Invalid input parameter")]
    InvalidInput,

    // Dispatch
    #[error("Invalid message format")]
    MalformedMessage,

    // Exchange coordination
    #[error("No registered format service supports the message formats")]
    NoMatchingFormatPlugin,
    #[error("No attachment found for the resolved format")]
    AttachmentNotFound,
    #[error("No prior message stored for the exchange thread")]
    PriorMessageNotFound,
    #[error("Received content differs from what was previously negotiated")]
    SemanticMismatch,

    // Proof requests and revocation
    #[error("Invalid revocation interval")]
    InvalidRevocationInterval,
    #[error("Revocation interval and credential timestamp cannot be reconciled")]
    RevocationWindowMismatch,
    #[error("Revocation interval present but no credential timestamp provided")]
    MissingTimestamp,
    #[error("Revealed attribute encoding does not match its raw value")]
    EncodingError,

    // Presentation exchange
    #[error("Input descriptor not found in presentation definition")]
    DescriptorNotFound,
    #[error("Cannot unambiguously select a credential for the descriptor")]
    AmbiguousCredential,

    // Collaborators
    #[error("Registry item not found")]
    VdrItemNotFound,
    #[error("Invalid registry response")]
    InvalidVdrResponse,
    #[error("Unknown error")]
    UnknownError,
}

#[derive(Clone, thiserror::Error)]
pub struct CredflowError {
    msg: String,
    kind: CredflowErrorKind,
}

fn format_error(err: &CredflowError, f: &mut fmt::Formatter) -> fmt::Result {
    writeln!(f, "Error: {}", err.msg())
}

impl fmt::Display for CredflowError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        format_error(self, f)
    }
}

impl fmt::Debug for CredflowError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        format_error(self, f)
    }
}

impl CredflowError {
    pub fn from_msg<D>(kind: CredflowErrorKind, msg: D) -> CredflowError
    where
        D: fmt::Display + Send + Sync + 'static,
    {
        CredflowError {
            msg: msg.to_string(),
            kind,
        }
    }

    pub fn kind(&self) -> CredflowErrorKind {
        self.kind
    }

    pub fn msg(&self) -> &str {
        &self.msg
    }
}

pub fn err_msg<D>(kind: CredflowErrorKind, msg: D) -> CredflowError
where
    D: fmt::Display + Send + Sync + 'static,
{
    CredflowError::from_msg(kind, msg)
}
