use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{
    error::{invalid, Error},
    identifiers::{IssuerId, SchemaId},
};

pub const MAX_ATTRIBUTES_COUNT: usize = 125;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    pub id: SchemaId,
    pub name: String,
    pub version: String,
    pub attr_names: AttributeNames,
    pub issuer_id: IssuerId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct AttributeNames(pub Vec<String>);

impl From<&[&str]> for AttributeNames {
    fn from(attrs: &[&str]) -> Self {
        Self(attrs.iter().map(|s| String::from(*s)).collect::<Vec<_>>())
    }
}

impl From<Vec<String>> for AttributeNames {
    fn from(attrs: Vec<String>) -> Self {
        Self(attrs)
    }
}

impl AttributeNames {
    pub fn validate(&self) -> Result<(), Error> {
        let mut unique = HashSet::new();
        if !self.0.iter().all(move |name| unique.insert(name)) {
            return Err(invalid!("Attributes inside the schema must be unique"));
        }
        if self.0.is_empty() {
            return Err(invalid!("Empty list of schema attributes has been passed"));
        }
        if self.0.len() > MAX_ATTRIBUTES_COUNT {
            return Err(invalid!(
                "The number of schema attributes {} cannot be greater than {}",
                self.0.len(),
                MAX_ATTRIBUTES_COUNT
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_schema_valid() {
        let schema_json = json!({
            "id": "mock:uri:schema",
            "name": "gvt",
            "version": "1.0",
            "attrNames": ["aaa", "bbb", "ccc"],
            "issuerId": "mock:uri"
        });

        let schema: Schema = serde_json::from_value(schema_json).unwrap();
        assert_eq!(schema.name, "gvt");
        assert_eq!(schema.version, "1.0");
        schema.attr_names.validate().unwrap();
    }

    #[test]
    fn test_schema_invalid_attr_names() {
        AttributeNames::default().validate().unwrap_err();

        let duplicated: AttributeNames = (["a", "a"].as_slice()).into();
        duplicated.validate().unwrap_err();
    }
}
