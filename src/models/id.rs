use std::fmt;
use std::str::FromStr;

use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// Store-issued document identifier, carried on the wire as 24 hex characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentId(ObjectId);

impl DocumentId {
    pub fn generate() -> Self {
        Self(ObjectId::new())
    }

    pub fn object_id(&self) -> ObjectId {
        self.0
    }

    pub fn to_hex(&self) -> String {
        self.0.to_hex()
    }
}

impl From<ObjectId> for DocumentId {
    fn from(oid: ObjectId) -> Self {
        Self(oid)
    }
}

impl FromStr for DocumentId {
    type Err = bson::oid::Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        ObjectId::parse_str(raw).map(Self)
    }
}

impl TryFrom<String> for DocumentId {
    type Error = bson::oid::Error;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        raw.parse()
    }
}

impl From<DocumentId> for String {
    fn from(id: DocumentId) -> Self {
        id.to_hex()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_and_prints_it_back() {
        let raw = "65a1f0c2b3d4e5f607182930";
        let id: DocumentId = raw.parse().unwrap();
        assert_eq!(id.to_string(), raw);
        assert_eq!(serde_json::to_value(id).unwrap(), serde_json::json!(raw));
    }

    #[test]
    fn rejects_malformed_identifiers() {
        assert!("not-an-id".parse::<DocumentId>().is_err());
        assert!("65a1f0c2b3d4e5f6071829".parse::<DocumentId>().is_err());
        assert!(serde_json::from_value::<DocumentId>(serde_json::json!("zzz")).is_err());
    }

    #[test]
    fn generated_ids_are_distinct() {
        assert_ne!(DocumentId::generate(), DocumentId::generate());
    }
}
