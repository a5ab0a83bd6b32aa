//! Messages of the discover-features 1.0 protocol
//! ([RFC 0031](<https://github.com/hyperledger/aries-rfcs/blob/main/features/0031-discover-features/README.md>)).

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::{
    decorators::thread::Thread,
    msg_types::{registry::Role, MessageType, ProtocolUri, DIDCOMM_ORG_PREFIX},
};

pub const PROTOCOL_NAME: &str = "discover-features";

fn discover_features_type(message_name: &str) -> MessageType {
    MessageType::new(DIDCOMM_ORG_PREFIX, PROTOCOL_NAME, 1, 0, message_name)
}

/// Asks the other agent which protocols it supports. The query string may
/// end with a `*` wildcard, e.g. `https://didcomm.org/present-proof/*`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, TypedBuilder)]
pub struct Query {
    #[serde(rename = "@id")]
    pub id: String,
    #[builder(default = Query::message_type())]
    #[serde(rename = "@type")]
    pub msg_type: MessageType,
    pub query: String,
    #[builder(default, setter(strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, TypedBuilder)]
pub struct Disclose {
    #[serde(rename = "@id")]
    pub id: String,
    #[builder(default = Disclose::message_type())]
    #[serde(rename = "@type")]
    pub msg_type: MessageType,
    #[builder(default, setter(strip_option))]
    #[serde(rename = "~thread", skip_serializing_if = "Option::is_none")]
    pub thread: Option<Thread>,
    pub protocols: Vec<ProtocolDescriptor>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, TypedBuilder)]
pub struct ProtocolDescriptor {
    pub pid: ProtocolUri,
    #[builder(default, setter(strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<Role>>,
}

impl Query {
    pub fn message_type() -> MessageType {
        discover_features_type("query")
    }

    /// Whether the given protocol identifier matches this query, honoring a
    /// trailing `*` wildcard.
    pub fn matches(&self, pid: &ProtocolUri) -> bool {
        let pid = pid.to_string();
        match self.query.strip_suffix('*') {
            Some(prefix) => pid.starts_with(prefix),
            None => pid == self.query,
        }
    }
}

impl Disclose {
    pub fn message_type() -> MessageType {
        discover_features_type("disclose")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_wildcard_matching() {
        let query = Query::builder()
            .id("query-1".to_owned())
            .query("https://didcomm.org/present-proof/*".to_owned())
            .build();

        let present_proof: ProtocolUri = "https://didcomm.org/present-proof/2.0".parse().unwrap();
        let issue_credential: ProtocolUri =
            "https://didcomm.org/issue-credential/2.0".parse().unwrap();

        assert!(query.matches(&present_proof));
        assert!(!query.matches(&issue_credential));
    }

    #[test]
    fn test_query_exact_matching() {
        let query = Query::builder()
            .id("query-1".to_owned())
            .query("https://didcomm.org/present-proof/2.0".to_owned())
            .build();

        assert!(query.matches(&"https://didcomm.org/present-proof/2.0".parse().unwrap()));
        assert!(!query.matches(&"https://didcomm.org/present-proof/1.0".parse().unwrap()));
    }

    #[test]
    fn test_disclose_shape() {
        let disclose = Disclose::builder()
            .id("disclose-1".to_owned())
            .protocols(vec![ProtocolDescriptor::builder()
                .pid("https://didcomm.org/present-proof/2.0".parse().unwrap())
                .roles(vec![Role::Verifier])
                .build()])
            .build();

        let value = serde_json::to_value(&disclose).unwrap();

        assert_eq!(value["@type"], "https://didcomm.org/discover-features/1.0/disclose");
        assert_eq!(value["protocols"][0]["pid"], "https://didcomm.org/present-proof/2.0");
        assert_eq!(value["protocols"][0]["roles"][0], "verifier");
    }
}
