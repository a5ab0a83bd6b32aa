//! Semantic comparison of proof requests, used to decide whether a
//! presentation was produced against the request that was actually sent.

use serde_json::Value;

use crate::pres_request::{
    AttributeInfo, NonRevokedInterval, PredicateInfo, PresentationRequestPayload,
};

/// Whether two proof requests ask for the same thing.
///
/// The `name`, `version` and `nonce` fields carry no semantics and are
/// ignored, as are the referent keys of the attribute and predicate maps.
/// Groups are matched greedily: for each group on one side the first equal
/// group on the other side is consumed.
pub fn are_proof_requests_equal(
    a: &PresentationRequestPayload,
    b: &PresentationRequestPayload,
) -> bool {
    if !intervals_equal(a.non_revoked.as_ref(), b.non_revoked.as_ref()) {
        return false;
    }

    let a_attributes: Vec<&AttributeInfo> = a.requested_attributes.values().collect();
    let b_attributes: Vec<&AttributeInfo> = b.requested_attributes.values().collect();
    if !multiset_equal(&a_attributes, &b_attributes, attribute_groups_equal) {
        return false;
    }

    let a_predicates: Vec<&PredicateInfo> = a.requested_predicates.values().collect();
    let b_predicates: Vec<&PredicateInfo> = b.requested_predicates.values().collect();
    multiset_equal(&a_predicates, &b_predicates, predicate_groups_equal)
}

fn multiset_equal<T: ?Sized>(a: &[&T], b: &[&T], eq: impl Fn(&T, &T) -> bool) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut remaining = b.to_vec();
    for item in a {
        let Some(position) = remaining.iter().position(|other| eq(item, other)) else {
            return false;
        };
        remaining.remove(position);
    }
    true
}

fn attribute_groups_equal(a: &AttributeInfo, b: &AttributeInfo) -> bool {
    a.name == b.name
        && names_equal(a.names.as_deref(), b.names.as_deref())
        && restrictions_equal(a.restrictions.as_deref(), b.restrictions.as_deref())
        && intervals_equal(a.non_revoked.as_ref(), b.non_revoked.as_ref())
}

fn predicate_groups_equal(a: &PredicateInfo, b: &PredicateInfo) -> bool {
    a.name == b.name
        && a.p_type == b.p_type
        && a.p_value == b.p_value
        && restrictions_equal(a.restrictions.as_deref(), b.restrictions.as_deref())
        && intervals_equal(a.non_revoked.as_ref(), b.non_revoked.as_ref())
}

// Order does not matter, duplicates do.
fn names_equal(a: Option<&[String]>, b: Option<&[String]>) -> bool {
    let mut a: Vec<&String> = a.unwrap_or_default().iter().collect();
    let mut b: Vec<&String> = b.unwrap_or_default().iter().collect();
    a.sort();
    b.sort();
    a == b
}

// An absent restrictions list is equivalent to an empty one.
fn restrictions_equal(a: Option<&[Value]>, b: Option<&[Value]>) -> bool {
    let a = a.unwrap_or_default();
    let b = b.unwrap_or_default();
    multiset_equal(
        &a.iter().collect::<Vec<_>>(),
        &b.iter().collect::<Vec<_>>(),
        |x: &Value, y: &Value| x == y,
    )
}

// An absent interval is equivalent to an unbounded one.
fn intervals_equal(a: Option<&NonRevokedInterval>, b: Option<&NonRevokedInterval>) -> bool {
    let unbounded = NonRevokedInterval::default();
    a.unwrap_or(&unbounded) == b.unwrap_or(&unbounded)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_json::json;

    use super::*;
    use crate::pres_request::PresentationRequestPayload;

    fn request(value: serde_json::Value) -> PresentationRequestPayload {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn name_version_and_nonce_are_ignored() {
        let a = request(json!({
            "nonce": "111", "name": "a", "version": "1.0",
            "requested_attributes": { "x": { "name": "age" } },
        }));
        let b = request(json!({
            "nonce": "222", "name": "b", "version": "2.0",
            "requested_attributes": { "x": { "name": "age" } },
        }));

        assert!(are_proof_requests_equal(&a, &b));
    }

    #[test]
    fn referent_keys_are_ignored() {
        let a = request(json!({
            "nonce": "1", "name": "n", "version": "1.0",
            "requested_attributes": {
                "attr1": { "name": "age" },
                "attr2": { "name": "height" }
            },
        }));
        let b = request(json!({
            "nonce": "1", "name": "n", "version": "1.0",
            "requested_attributes": {
                "other1": { "name": "height" },
                "other2": { "name": "age" }
            },
        }));

        assert!(are_proof_requests_equal(&a, &b));
    }

    #[test]
    fn absent_restrictions_equal_empty_restrictions() {
        let a = request(json!({
            "nonce": "1", "name": "n", "version": "1.0",
            "requested_attributes": { "x": { "name": "age" } },
        }));
        let b = request(json!({
            "nonce": "1", "name": "n", "version": "1.0",
            "requested_attributes": { "x": { "name": "age", "restrictions": [] } },
        }));

        assert!(are_proof_requests_equal(&a, &b));
    }

    #[test]
    fn differing_restrictions_are_unequal() {
        let a = request(json!({
            "nonce": "1", "name": "n", "version": "1.0",
            "requested_attributes": {
                "x": { "name": "age", "restrictions": [{ "cred_def_id": "cd:1" }] }
            },
        }));
        let b = request(json!({
            "nonce": "1", "name": "n", "version": "1.0",
            "requested_attributes": {
                "x": { "name": "age", "restrictions": [{ "cred_def_id": "cd:2" }] }
            },
        }));

        assert!(!are_proof_requests_equal(&a, &b));
    }

    #[test]
    fn names_compare_as_unordered_but_duplicates_count() {
        let a = request(json!({
            "nonce": "1", "name": "n", "version": "1.0",
            "requested_attributes": { "x": { "names": ["age", "height"] } },
        }));
        let b = request(json!({
            "nonce": "1", "name": "n", "version": "1.0",
            "requested_attributes": { "x": { "names": ["height", "age"] } },
        }));
        let c = request(json!({
            "nonce": "1", "name": "n", "version": "1.0",
            "requested_attributes": { "x": { "names": ["age", "age", "height"] } },
        }));

        assert!(are_proof_requests_equal(&a, &b));
        assert!(!are_proof_requests_equal(&a, &c));
    }

    #[test]
    fn group_counts_must_match() {
        let a = request(json!({
            "nonce": "1", "name": "n", "version": "1.0",
            "requested_attributes": {
                "x": { "name": "age" },
                "y": { "name": "age" }
            },
        }));
        let b = request(json!({
            "nonce": "1", "name": "n", "version": "1.0",
            "requested_attributes": { "x": { "name": "age" } },
        }));

        assert!(!are_proof_requests_equal(&a, &b));
    }

    #[test]
    fn partially_specified_intervals_are_unequal() {
        let a = request(json!({
            "nonce": "1", "name": "n", "version": "1.0",
            "requested_attributes": { "x": { "name": "age" } },
            "non_revoked": { "to": 5 },
        }));
        let b = request(json!({
            "nonce": "1", "name": "n", "version": "1.0",
            "requested_attributes": { "x": { "name": "age" } },
            "non_revoked": { "from": 5 },
        }));

        assert!(!are_proof_requests_equal(&a, &b));
    }

    #[test]
    fn empty_interval_equals_absent_interval() {
        let a = request(json!({
            "nonce": "1", "name": "n", "version": "1.0",
            "requested_attributes": { "x": { "name": "age" } },
            "non_revoked": {},
        }));
        let b = request(json!({
            "nonce": "1", "name": "n", "version": "1.0",
            "requested_attributes": { "x": { "name": "age" } },
        }));

        assert!(are_proof_requests_equal(&a, &b));
    }

    #[test]
    fn predicates_compare_by_type_and_value() {
        let a = request(json!({
            "nonce": "1", "name": "n", "version": "1.0",
            "requested_predicates": { "p": { "name": "age", "p_type": ">=", "p_value": 18 } },
        }));
        let b = request(json!({
            "nonce": "1", "name": "n", "version": "1.0",
            "requested_predicates": { "p": { "name": "age", "p_type": ">", "p_value": 18 } },
        }));

        assert!(!are_proof_requests_equal(&a, &b));
    }

    #[test]
    fn empty_requests_are_equal() {
        let a = request(json!({ "nonce": "1", "name": "n", "version": "1.0" }));
        let b = request(json!({
            "nonce": "1", "name": "n", "version": "1.0",
            "requested_attributes": {},
            "requested_predicates": {},
        }));

        assert!(are_proof_requests_equal(&a, &b));
        assert!(HashMap::is_empty(&a.requested_attributes));
    }
}
