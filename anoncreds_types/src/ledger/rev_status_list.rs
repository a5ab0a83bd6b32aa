use bitvec::vec::BitVec;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::identifiers::{IssuerId, RevocationRegistryDefinitionId};

/// The state of a revocation registry at one point in time. Bit `i` set
/// means the credential at registry index `i` was revoked at or before
/// `timestamp`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RevocationStatusList {
    pub rev_reg_def_id: RevocationRegistryDefinitionId,
    pub issuer_id: IssuerId,
    #[serde(
        serialize_with = "serialize_revocation_list",
        deserialize_with = "deserialize_revocation_list"
    )]
    pub revocation_list: BitVec,
    // Opaque accumulator value matching the list.
    pub current_accumulator: Value,
    pub timestamp: u64,
}

impl RevocationStatusList {
    pub fn is_revoked(&self, index: usize) -> Option<bool> {
        self.revocation_list.get(index).map(|bit| *bit)
    }

    pub fn len(&self) -> usize {
        self.revocation_list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.revocation_list.is_empty()
    }
}

// On the wire the list is an array of 0/1 integers.
fn serialize_revocation_list<S>(list: &BitVec, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_seq(list.iter().map(|bit| u8::from(*bit)))
}

fn deserialize_revocation_list<'de, D>(deserializer: D) -> Result<BitVec, D::Error>
where
    D: Deserializer<'de>,
{
    let bits = Vec::<u8>::deserialize(deserializer)?;
    bits.iter()
        .map(|bit| match bit {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(de::Error::custom(format!(
                "Revocation list entries must be 0 or 1, got {other}"
            ))),
        })
        .collect()
}
