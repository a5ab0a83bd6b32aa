//! Newtype identifiers for anoncreds objects. Identifiers are treated as
//! opaque: both URI-style and legacy unqualified forms pass through
//! unchanged.

macro_rules! impl_object_identifier {
    ($i:ident) => {
        #[derive(
            Debug, Clone, PartialEq, Eq, Hash, serde::Deserialize, serde::Serialize, Default,
        )]
        pub struct $i(pub String);

        impl $i {
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }
        }

        impl From<$i> for String {
            fn from(i: $i) -> Self {
                i.0
            }
        }

        impl From<&str> for $i {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl std::ops::Deref for $i {
            type Target = str;

            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $i {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

impl_object_identifier!(IssuerId);
impl_object_identifier!(SchemaId);
impl_object_identifier!(CredentialDefinitionId);
impl_object_identifier!(RevocationRegistryDefinitionId);
