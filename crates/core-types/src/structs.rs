use crate::lenient;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ==============================================================================
// Table rows
// ==============================================================================

/// A row of the `Charities` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Charity {
    #[serde(rename = "CharityID")]
    pub charity_id: i32,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Address")]
    pub address: String,
}

/// A row of the `Recipients` table. Also the body of `POST /insert-recipient`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Recipient {
    #[serde(rename = "SinNum", deserialize_with = "lenient::int")]
    pub sin_num: i32,
    #[serde(rename = "EventID", deserialize_with = "lenient::int")]
    pub event_id: i32,
    #[serde(rename = "Age", deserialize_with = "lenient::int")]
    pub age: i32,
    #[serde(rename = "ContactNum")]
    pub contact_num: String,
    #[serde(rename = "Gender", default)]
    pub gender: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct DonationEvent {
    #[serde(rename = "EventID")]
    pub event_id: i32,
    #[serde(rename = "EventName")]
    pub event_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct FoodDonor {
    #[serde(rename = "DonorID")]
    pub donor_id: i32,
    #[serde(rename = "Name")]
    pub name: Option<String>,
    #[serde(rename = "Type")]
    pub donor_type: Option<String>,
    #[serde(rename = "ReceiptNum")]
    pub receipt_num: Option<i32>,
}

/// Associates a food item handed out to a recipient with the donor who gave it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct FoodReceived {
    #[serde(rename = "FoodID")]
    pub food_id: i32,
    #[serde(rename = "SinNum")]
    pub sin_num: i32,
    #[serde(rename = "DonorID")]
    pub donor_id: i32,
}

// ==============================================================================
// Query results
// ==============================================================================

/// One recipient of a given food item (food → recipients join).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct FoodRecipient {
    #[serde(rename = "SinNum")]
    pub sin_num: i32,
    #[serde(rename = "ContactNum")]
    pub contact_num: String,
}

/// Per-event recipient statistics, only for events with at least two recipients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct EventAgeSummary {
    #[serde(rename = "EVENTID")]
    pub event_id: i32,
    #[serde(rename = "AVG_AGE", with = "rust_decimal::serde::float")]
    pub avg_age: Decimal,
    #[serde(rename = "RECIPIENT_COUNT")]
    pub recipient_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct AgeCount {
    #[serde(rename = "AGE")]
    pub age: i32,
    #[serde(rename = "AGE_COUNT")]
    pub age_count: i64,
}

/// An event whose average recipient age is the lowest (ties are all reported).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct EventAverageAge {
    #[serde(rename = "EVENTID")]
    pub event_id: i32,
    #[serde(rename = "EVENTNAME")]
    pub event_name: String,
    #[serde(rename = "AVG_EVENT_AGE", with = "rust_decimal::serde::float")]
    pub avg_event_age: Decimal,
}

/// A contact number that appears under every event present in `Recipients`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct EveryEventContact {
    #[serde(rename = "CONTACTNUM")]
    pub contact_num: String,
}

// ==============================================================================
// Request bodies
// ==============================================================================

/// Body of `POST /insert-demotable`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewCharity {
    #[serde(deserialize_with = "lenient::int")]
    pub id: i32,
    pub name: String,
    pub address: String,
}

impl From<NewCharity> for Charity {
    fn from(new: NewCharity) -> Self {
        Charity {
            charity_id: new.id,
            name: new.name,
            address: new.address,
        }
    }
}

/// Body of `POST /update-charity`. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CharityPatch {
    #[serde(default, deserialize_with = "lenient::opt_int")]
    pub id: Option<i32>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

impl CharityPatch {
    pub fn has_changes(&self) -> bool {
        self.name.is_some() || self.address.is_some()
    }
}

/// Body of `POST /update-recipients`. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RecipientPatch {
    #[serde(rename = "SinNum", default, deserialize_with = "lenient::opt_int")]
    pub sin_num: Option<i32>,
    #[serde(rename = "EventID", default, deserialize_with = "lenient::opt_int")]
    pub event_id: Option<i32>,
    #[serde(rename = "Age", default, deserialize_with = "lenient::opt_int")]
    pub age: Option<i32>,
    #[serde(rename = "ContactNum", default)]
    pub contact_num: Option<String>,
    #[serde(rename = "Gender", default)]
    pub gender: Option<String>,
}

impl RecipientPatch {
    pub fn has_changes(&self) -> bool {
        self.event_id.is_some()
            || self.age.is_some()
            || self.contact_num.is_some()
            || self.gender.is_some()
    }

    /// Applies the supplied fields to `recipient` in place.
    pub fn apply_to(&self, recipient: &mut Recipient) {
        if let Some(event_id) = self.event_id {
            recipient.event_id = event_id;
        }
        if let Some(age) = self.age {
            recipient.age = age;
        }
        if let Some(contact_num) = &self.contact_num {
            recipient.contact_num = contact_num.clone();
        }
        if let Some(gender) = &self.gender {
            recipient.gender = Some(gender.clone());
        }
    }
}

/// Body of `POST /delete-charity`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CharityKey {
    #[serde(deserialize_with = "lenient::int")]
    pub id: i32,
}

/// Body of `POST /delete-donor`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DonorKey {
    #[serde(rename = "donorId", deserialize_with = "lenient::int")]
    pub donor_id: i32,
}

/// Body of `POST /projection`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProjectionRequest {
    #[serde(default)]
    pub attributes: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn recipient_accepts_form_style_ids() {
        let recipient: Recipient = serde_json::from_str(
            r#"{"SinNum": "123456789", "EventID": 2, "Age": "30", "ContactNum": "604-555-0100"}"#,
        )
        .unwrap();
        assert_eq!(recipient.sin_num, 123_456_789);
        assert_eq!(recipient.age, 30);
        assert_eq!(recipient.gender, None);
    }

    #[test]
    fn recipient_without_required_key_is_rejected() {
        let result = serde_json::from_str::<Recipient>(r#"{"SinNum": 1, "Age": 3, "ContactNum": "x"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn partial_update_only_touches_supplied_fields() {
        let mut recipient = Recipient {
            sin_num: 1,
            event_id: 10,
            age: 40,
            contact_num: "555".to_string(),
            gender: Some("F".to_string()),
        };
        let patch = RecipientPatch {
            sin_num: Some(1),
            age: Some(41),
            ..RecipientPatch::default()
        };
        assert!(patch.has_changes());
        patch.apply_to(&mut recipient);
        assert_eq!(recipient.age, 41);
        assert_eq!(recipient.event_id, 10);
        assert_eq!(recipient.contact_num, "555");
        assert_eq!(recipient.gender.as_deref(), Some("F"));
    }

    #[test]
    fn patch_with_only_a_key_has_no_changes() {
        let patch: RecipientPatch =
            serde_json::from_str(r#"{"SinNum": 5, "EventID": null, "Age": null}"#).unwrap();
        assert_eq!(patch.sin_num, Some(5));
        assert!(!patch.has_changes());
    }

    #[test]
    fn aggregate_rows_serialize_with_frontend_keys() {
        let row = EventAgeSummary {
            event_id: 3,
            avg_age: dec!(27.50),
            recipient_count: 4,
        };
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["EVENTID"], 3);
        assert_eq!(json["AVG_AGE"], 27.5);
        assert_eq!(json["RECIPIENT_COUNT"], 4);
    }
}
