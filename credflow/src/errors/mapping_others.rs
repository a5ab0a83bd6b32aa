use credflow_messages::{decorators::attachment::AttachmentDecodeError, errors::MsgTypeError};
use credflow_vdr::error::VdrError;

use super::error::{CredflowError, CredflowErrorKind};

impl From<serde_json::Error> for CredflowError {
    fn from(err: serde_json::Error) -> Self {
        Self::from_msg(CredflowErrorKind::SerializationError, err)
    }
}

impl From<MsgTypeError> for CredflowError {
    fn from(err: MsgTypeError) -> Self {
        Self::from_msg(CredflowErrorKind::MalformedMessage, err)
    }
}

impl From<AttachmentDecodeError> for CredflowError {
    fn from(err: AttachmentDecodeError) -> Self {
        Self::from_msg(CredflowErrorKind::MalformedMessage, err)
    }
}

impl From<anoncreds_types::Error> for CredflowError {
    fn from(err: anoncreds_types::Error) -> Self {
        let kind = match err.kind() {
            anoncreds_types::ErrorKind::ConversionError => CredflowErrorKind::SerializationError,
            _ => CredflowErrorKind::InvalidInput,
        };
        Self::from_msg(kind, err)
    }
}

impl From<VdrError> for CredflowError {
    fn from(err: VdrError) -> Self {
        let kind = match err {
            VdrError::ObjectNotFound(_) => CredflowErrorKind::VdrItemNotFound,
            VdrError::InvalidResponse(_) => CredflowErrorKind::InvalidVdrResponse,
            VdrError::InvalidJson(_) => CredflowErrorKind::SerializationError,
            VdrError::IOError(_) | VdrError::UnknownError(_) => CredflowErrorKind::UnknownError,
        };
        Self::from_msg(kind, err)
    }
}
