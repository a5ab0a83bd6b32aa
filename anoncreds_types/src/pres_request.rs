use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use typed_builder::TypedBuilder;

use crate::{
    error::{invalid, Error},
    nonce::Nonce,
};

/// An anoncreds proof request: named groups of requested attributes and
/// predicates, optionally bounded by non-revocation intervals.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, TypedBuilder)]
pub struct PresentationRequestPayload {
    pub nonce: Nonce,
    pub name: String,
    pub version: String,
    #[builder(default)]
    #[serde(default)]
    pub requested_attributes: HashMap<String, AttributeInfo>,
    #[builder(default)]
    #[serde(default)]
    pub requested_predicates: HashMap<String, PredicateInfo>,
    #[builder(default, setter(strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub non_revoked: Option<NonRevokedInterval>,
}

impl PresentationRequestPayload {
    /// Every group name (attribute names and predicate names alike) must be
    /// unique across the request, otherwise the prover cannot unambiguously
    /// map credential attributes to groups.
    pub fn assert_no_duplicate_group_names(&self) -> Result<(), Error> {
        let mut seen = HashSet::new();

        let attribute_names = self.requested_attributes.values().flat_map(|info| {
            info.name
                .iter()
                .chain(info.names.iter().flatten())
                .map(String::as_str)
        });
        let predicate_names = self
            .requested_predicates
            .values()
            .map(|info| info.name.as_str());

        for name in attribute_names.chain(predicate_names) {
            if !seen.insert(name) {
                return Err(invalid!(
                    "Duplicate group name '{name}' in proof request '{}'",
                    self.name
                ));
            }
        }
        Ok(())
    }
}

#[derive(Clone, Default, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct NonRevokedInterval {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<u64>,
}

impl NonRevokedInterval {
    #[must_use]
    pub const fn new(from: Option<u64>, to: Option<u64>) -> Self {
        Self { from, to }
    }

    // Returns the most stringent interval,
    // i.e. the latest from and the earliest to
    pub fn compare_and_set(&mut self, to_compare: &Self) {
        match (self.from, to_compare.from) {
            (Some(old_from), Some(new_from)) => {
                if old_from.lt(&new_from) {
                    self.from = to_compare.from;
                }
            }
            (None, Some(_)) => self.from = to_compare.from,
            _ => (),
        }
        match (self.to, to_compare.to) {
            (Some(old_to), Some(new_to)) => {
                if new_to.lt(&old_to) {
                    self.to = to_compare.to;
                }
            }
            (None, Some(_)) => self.to = to_compare.to,
            _ => (),
        }
    }

    /// Rewrites `from` when the verifier accepted an earlier state for the
    /// timestamp it originally asked for.
    pub fn update_with_override(&mut self, override_map: &HashMap<u64, u64>) {
        if let Some(from) = self.from {
            if let Some(&override_timestamp) = override_map.get(&from) {
                self.from = Some(override_timestamp);
            }
        }
    }

    pub fn is_valid(&self, timestamp: u64) -> Result<(), Error> {
        if timestamp.lt(&self.from.unwrap_or(0)) || timestamp.gt(&self.to.unwrap_or(u64::MAX)) {
            Err(invalid!("Invalid timestamp {timestamp}"))
        } else {
            Ok(())
        }
    }

    /// The revocation interval best practice from Aries RFC 0441: `to` must
    /// be present, and when `from` is also present it must not exceed `to`.
    /// Intervals where `from` differs from `to` are reconciled against the
    /// registry before use.
    pub fn assert_best_practice(&self) -> Result<(), Error> {
        let Some(to) = self.to else {
            return Err(invalid!(
                "Revocation interval is missing the required 'to' value"
            ));
        };
        if let Some(from) = self.from {
            if from > to {
                return Err(invalid!(
                    "Revocation interval 'from' ({from}) must not exceed 'to' ({to})"
                ));
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, TypedBuilder)]
pub struct AttributeInfo {
    #[builder(default, setter(strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[builder(default, setter(strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub names: Option<Vec<String>>,
    #[builder(default, setter(strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restrictions: Option<Vec<Value>>,
    #[builder(default, setter(strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub non_revoked: Option<NonRevokedInterval>,
}

pub type PredicateValue = i32;

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, TypedBuilder)]
pub struct PredicateInfo {
    pub name: String,
    pub p_type: PredicateTypes,
    pub p_value: PredicateValue,
    #[builder(default, setter(strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restrictions: Option<Vec<Value>>,
    #[builder(default, setter(strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub non_revoked: Option<NonRevokedInterval>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub enum PredicateTypes {
    #[serde(rename = ">=")]
    GE,
    #[serde(rename = "<=")]
    LE,
    #[serde(rename = ">")]
    GT,
    #[serde(rename = "<")]
    LT,
}

impl fmt::Display for PredicateTypes {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Self::GE => write!(f, "GE"),
            Self::GT => write!(f, "GT"),
            Self::LE => write!(f, "LE"),
            Self::LT => write!(f, "LT"),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn request_with_groups(
        attributes: HashMap<String, AttributeInfo>,
        predicates: HashMap<String, PredicateInfo>,
    ) -> PresentationRequestPayload {
        PresentationRequestPayload::builder()
            .nonce(Nonce::from_dec("123456").unwrap())
            .name("proof".to_owned())
            .version("1.0".to_owned())
            .requested_attributes(attributes)
            .requested_predicates(predicates)
            .build()
    }

    #[test]
    fn compare_and_set_works() {
        let mut int = NonRevokedInterval::default();
        let wide_int = NonRevokedInterval::new(Some(1), Some(100));
        let mid_int = NonRevokedInterval::new(Some(5), Some(80));
        let narrow_int = NonRevokedInterval::new(Some(10), Some(50));

        assert_eq!(int.from, None);
        assert_eq!(int.to, None);

        // From None to Some
        int.compare_and_set(&wide_int);
        assert_eq!(int.from, wide_int.from);
        assert_eq!(int.to, wide_int.to);

        // Update when more narrow
        int.compare_and_set(&mid_int);
        assert_eq!(int.from, mid_int.from);
        assert_eq!(int.to, mid_int.to);

        // Do Not Update when wider
        int.compare_and_set(&wide_int);
        assert_eq!(int.from, mid_int.from);
        assert_eq!(int.to, mid_int.to);

        int.compare_and_set(&narrow_int);
        assert_eq!(int.from, narrow_int.from);
        assert_eq!(int.to, narrow_int.to);
    }

    #[test]
    fn override_works() {
        let mut interval = NonRevokedInterval::default();
        let override_map = HashMap::from([(10u64, 5u64)]);

        interval.from = Some(10);
        interval.update_with_override(&override_map);
        assert_eq!(interval.from.unwrap(), 5u64);
    }

    #[test]
    fn best_practice_requires_to() {
        NonRevokedInterval::new(Some(10), None)
            .assert_best_practice()
            .unwrap_err();
        NonRevokedInterval::new(None, Some(10))
            .assert_best_practice()
            .unwrap();
    }

    #[test]
    fn best_practice_requires_ordered_endpoints() {
        NonRevokedInterval::new(Some(10), Some(5))
            .assert_best_practice()
            .unwrap_err();
        NonRevokedInterval::new(Some(20), Some(20))
            .assert_best_practice()
            .unwrap();
        NonRevokedInterval::new(Some(90), Some(100))
            .assert_best_practice()
            .unwrap();
    }

    #[test]
    fn duplicate_attribute_names_are_rejected() {
        let attributes = HashMap::from([
            (
                "attr1".to_owned(),
                AttributeInfo::builder().name("age".to_owned()).build(),
            ),
            (
                "attr2".to_owned(),
                AttributeInfo::builder()
                    .names(vec!["age".to_owned(), "height".to_owned()])
                    .build(),
            ),
        ]);

        request_with_groups(attributes, HashMap::new())
            .assert_no_duplicate_group_names()
            .unwrap_err();
    }

    #[test]
    fn predicate_name_clashing_with_attribute_is_rejected() {
        let attributes = HashMap::from([(
            "attr1".to_owned(),
            AttributeInfo::builder().name("age".to_owned()).build(),
        )]);
        let predicates = HashMap::from([(
            "pred1".to_owned(),
            PredicateInfo::builder()
                .name("age".to_owned())
                .p_type(PredicateTypes::GE)
                .p_value(18)
                .build(),
        )]);

        request_with_groups(attributes, predicates)
            .assert_no_duplicate_group_names()
            .unwrap_err();
    }

    #[test]
    fn distinct_group_names_pass() {
        let attributes = HashMap::from([(
            "attr1".to_owned(),
            AttributeInfo::builder()
                .names(vec!["name".to_owned(), "height".to_owned()])
                .build(),
        )]);
        let predicates = HashMap::from([(
            "pred1".to_owned(),
            PredicateInfo::builder()
                .name("age".to_owned())
                .p_type(PredicateTypes::GE)
                .p_value(18)
                .build(),
        )]);

        request_with_groups(attributes, predicates)
            .assert_no_duplicate_group_names()
            .unwrap();
    }

    #[test]
    fn proof_request_round_trip() {
        let value = json!({
            "nonce": "1234567890",
            "name": "proof",
            "version": "1.0",
            "requested_attributes": {
                "attr1_referent": {
                    "name": "name",
                    "restrictions": [{ "cred_def_id": "cd:1" }]
                }
            },
            "requested_predicates": {
                "pred1_referent": { "name": "age", "p_type": ">=", "p_value": 18 }
            },
            "non_revoked": { "from": 100, "to": 100 }
        });

        let request: PresentationRequestPayload = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(
            request.requested_predicates["pred1_referent"].p_type,
            PredicateTypes::GE
        );
        assert_eq!(serde_json::to_value(&request).unwrap(), value);
    }
}
