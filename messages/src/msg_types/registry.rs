use std::collections::HashMap;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

use super::{ProtocolUri, DIDCOMM_ORG_PREFIX};

type RegistryMap = HashMap<(&'static str, u8), Vec<RegistryEntry>>;

/// The roles an agent can play within a registered protocol.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, strum_macros::AsRefStr)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Role {
    Issuer,
    Holder,
    Prover,
    Verifier,
    Requester,
    Responder,
}

/// An entry in the protocol registry.
#[derive(Debug, Clone)]
pub struct RegistryEntry {
    /// The [`ProtocolUri`] corresponding to this entry
    pub protocol: ProtocolUri,
    /// The minor version in numeric form (for easier semver resolution)
    pub minor: u8,
    /// A [`String`] representation of the *pid*
    pub str_pid: String,
    /// The roles available in the protocol
    pub roles: Vec<Role>,
}

fn map_insert(map: &mut RegistryMap, protocol_name: &'static str, major: u8, minor: u8, roles: Vec<Role>) {
    let protocol = ProtocolUri {
        document_uri: DIDCOMM_ORG_PREFIX.to_owned(),
        protocol_name: protocol_name.to_owned(),
        major,
        minor,
    };

    let str_pid = format!("{DIDCOMM_ORG_PREFIX}/{protocol_name}/{major}.{minor}");
    let entry = RegistryEntry {
        protocol,
        minor,
        str_pid,
        roles,
    };

    map.entry((protocol_name, major)).or_default().push(entry);
}

lazy_static! {
    /// The protocol registry, used as a baseline for the protocols and versions
    /// that an agent supports along with semver resolution.
    ///
    /// Keys are comprised of the protocol name and major version while
    /// the values are [`RegistryEntry`] instances.
    pub static ref PROTOCOL_REGISTRY: RegistryMap = {
        let mut m = HashMap::new();
        map_insert(&mut m, "issue-credential", 2, 0, vec![Role::Issuer, Role::Holder]);
        map_insert(&mut m, "present-proof", 2, 0, vec![Role::Prover, Role::Verifier]);
        map_insert(&mut m, "discover-features", 1, 0, vec![Role::Requester, Role::Responder]);
        m
    };
}

/// Looks into the protocol registry for (in order):
/// * the exact protocol version requested
/// * the maximum minor version of a protocol less than the minor version requested (e.g: requesting
///   1.7 should yield 1.6).
pub fn get_supported_version(name: &'static str, major: u8, minor: u8) -> Option<u8> {
    PROTOCOL_REGISTRY
        .get(&(name, major))
        .and_then(|v| v.iter().rev().map(|r| r.minor).find(|v| *v <= minor))
}
