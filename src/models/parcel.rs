use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::models::id::DocumentId;

/// Keys the server owns; client copies of them are discarded on submission.
pub const RESERVED_FIELDS: [&str; 3] = ["_id", "createdAt", "paymentStatus"];

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Paid => "paid",
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Parcel {
    #[serde(rename = "_id")]
    pub id: DocumentId,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_status: Option<PaymentStatus>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Parcel {
    pub fn owner_email(&self) -> Option<&str> {
        self.fields.get("userEmail").and_then(Value::as_str)
    }

    pub fn is_paid(&self) -> bool {
        self.payment_status == Some(PaymentStatus::Paid)
    }
}

/// A parcel submission that has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewParcel {
    pub created_at: DateTime<Utc>,
    pub fields: Map<String, Value>,
}

impl NewParcel {
    pub fn from_submission(mut fields: Map<String, Value>, now: DateTime<Utc>) -> Self {
        for key in RESERVED_FIELDS {
            fields.remove(key);
        }

        Self {
            created_at: now,
            fields,
        }
    }

    pub fn into_parcel(self, id: DocumentId) -> Parcel {
        Parcel {
            id,
            created_at: self.created_at,
            payment_status: None,
            fields: self.fields,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    fn submission(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn submission_drops_server_owned_fields() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let draft = NewParcel::from_submission(
            submission(json!({
                "_id": "65a1f0c2b3d4e5f607182930",
                "userEmail": "a@x.com",
                "weight": 2,
                "createdAt": "1999-01-01T00:00:00Z",
                "paymentStatus": "paid"
            })),
            now,
        );

        assert_eq!(draft.created_at, now);
        assert_eq!(draft.fields.len(), 2);
        assert_eq!(draft.fields["userEmail"], "a@x.com");
        assert_eq!(draft.fields["weight"], 2);
    }

    #[test]
    fn parcel_serializes_flat_with_server_fields() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let id: DocumentId = "65a1f0c2b3d4e5f607182930".parse().unwrap();
        let mut parcel = NewParcel::from_submission(
            submission(json!({ "userEmail": "a@x.com", "weight": 2 })),
            now,
        )
        .into_parcel(id);

        let body = serde_json::to_value(&parcel).unwrap();
        assert_eq!(body["_id"], "65a1f0c2b3d4e5f607182930");
        assert_eq!(body["userEmail"], "a@x.com");
        assert_eq!(body["createdAt"], "2025-03-01T12:00:00Z");
        assert!(body.get("paymentStatus").is_none());
        assert_eq!(parcel.owner_email(), Some("a@x.com"));

        parcel.payment_status = Some(PaymentStatus::Paid);
        let body = serde_json::to_value(&parcel).unwrap();
        assert_eq!(body["paymentStatus"], "paid");
        assert!(parcel.is_paid());
    }
}
