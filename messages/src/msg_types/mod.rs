//! Parsing and matching of DIDComm protocol message type identifiers of
//! the shape `<doc-uri>/<protocol-name>/<major>.<minor>/<message-name>`.

pub mod registry;

use std::{fmt, str::FromStr};

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::MsgTypeError;

pub const DIDCOMM_ORG_PREFIX: &str = "https://didcomm.org";
pub const LEGACY_DID_SOV_PREFIX: &str = "did:sov:BzCbsNYhMrjHiqZDTUASHg;spec";

/// A fully parsed protocol message type, e.g.
/// `https://didcomm.org/present-proof/2.0/request-presentation`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MessageType {
    pub document_uri: String,
    pub protocol_name: String,
    pub major: u8,
    pub minor: u8,
    pub message_name: String,
}

/// The protocol identifier portion of a message type, e.g.
/// `https://didcomm.org/present-proof/2.0`. Used for feature discovery.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ProtocolUri {
    pub document_uri: String,
    pub protocol_name: String,
    pub major: u8,
    pub minor: u8,
}

fn parse_version(version: &str) -> Option<(u8, u8)> {
    let (major, minor) = version.split_once('.')?;
    Some((major.parse().ok()?, minor.parse().ok()?))
}

/// Messages sent by older agents may still carry the legacy did:sov
/// document uri. Both prefixes identify the same protocol family, so the
/// legacy one is normalized before any comparison.
pub fn normalize_legacy_did_sov_prefix(document_uri: &str) -> &str {
    if document_uri == LEGACY_DID_SOV_PREFIX {
        DIDCOMM_ORG_PREFIX
    } else {
        document_uri
    }
}

impl MessageType {
    pub fn new(
        document_uri: impl Into<String>,
        protocol_name: impl Into<String>,
        major: u8,
        minor: u8,
        message_name: impl Into<String>,
    ) -> Self {
        Self {
            document_uri: document_uri.into(),
            protocol_name: protocol_name.into(),
            major,
            minor,
            message_name: message_name.into(),
        }
    }

    /// Whether a message of the `incoming` type can be handled by a handler
    /// declaring `self` as its supported type.
    ///
    /// Document uri, protocol name, message name and major version must all
    /// be equal. The minor version is deliberately not compared in either
    /// direction: evolution within a major version must never break
    /// interoperability, regardless of which side is newer.
    pub fn supports(&self, incoming: &Self) -> bool {
        let incoming_document_uri = normalize_legacy_did_sov_prefix(&incoming.document_uri);

        self.document_uri == incoming_document_uri
            && self.protocol_name == incoming.protocol_name
            && self.major == incoming.major
            && self.message_name == incoming.message_name
    }

    pub fn protocol_uri(&self) -> ProtocolUri {
        ProtocolUri {
            document_uri: self.document_uri.clone(),
            protocol_name: self.protocol_name.clone(),
            major: self.major,
            minor: self.minor,
        }
    }
}

impl ProtocolUri {
    /// Same matching policy as [`MessageType::supports`], minus the
    /// message name.
    pub fn supports(&self, incoming: &Self) -> bool {
        let incoming_document_uri = normalize_legacy_did_sov_prefix(&incoming.document_uri);

        self.document_uri == incoming_document_uri
            && self.protocol_name == incoming.protocol_name
            && self.major == incoming.major
    }
}

impl FromStr for MessageType {
    type Err = MsgTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Segments are taken from the right; the document uri is whatever
        // remains and may itself contain slashes.
        let mut segments = s.rsplitn(4, '/');

        let (Some(message_name), Some(version), Some(protocol_name), Some(document_uri)) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(MsgTypeError::malformed(s));
        };

        let Some((major, minor)) = parse_version(version) else {
            return Err(MsgTypeError::malformed(s));
        };

        if document_uri.is_empty() || protocol_name.is_empty() || message_name.is_empty() {
            return Err(MsgTypeError::malformed(s));
        }

        Ok(Self {
            document_uri: document_uri.to_owned(),
            protocol_name: protocol_name.to_owned(),
            major,
            minor,
            message_name: message_name.to_owned(),
        })
    }
}

impl FromStr for ProtocolUri {
    type Err = MsgTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut segments = s.rsplitn(3, '/');

        let (Some(version), Some(protocol_name), Some(document_uri)) =
            (segments.next(), segments.next(), segments.next())
        else {
            return Err(MsgTypeError::MalformedProtocolUri(s.to_owned()));
        };

        let Some((major, minor)) = parse_version(version) else {
            return Err(MsgTypeError::MalformedProtocolUri(s.to_owned()));
        };

        if document_uri.is_empty() || protocol_name.is_empty() {
            return Err(MsgTypeError::MalformedProtocolUri(s.to_owned()));
        }

        Ok(Self {
            document_uri: document_uri.to_owned(),
            protocol_name: protocol_name.to_owned(),
            major,
            minor,
        })
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}.{}/{}",
            self.document_uri, self.protocol_name, self.major, self.minor, self.message_name
        )
    }
}

impl fmt::Display for ProtocolUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}.{}",
            self.document_uri, self.protocol_name, self.major, self.minor
        )
    }
}

impl Serialize for MessageType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for MessageType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let type_str = String::deserialize(deserializer)?;
        type_str.parse().map_err(de::Error::custom)
    }
}

impl Serialize for ProtocolUri {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ProtocolUri {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let uri_str = String::deserialize(deserializer)?;
        uri_str.parse().map_err(de::Error::custom)
    }
}
